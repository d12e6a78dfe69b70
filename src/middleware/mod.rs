//! Request middleware and extractors.
//!
//! - [`auth`]: the bearer token gate and the `AuthUser` extractor
//! - [`recover`]: converts handler panics into 500 responses

pub mod auth;
pub mod recover;
