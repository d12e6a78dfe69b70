//! # Bookshelf Core
//!
//! Core types, errors, and utilities for the Bookshelf API.
//!
//! - [`errors`]: HTTP boundary error type with response conversion
//! - [`password`]: bcrypt password hashing and verification
//! - [`clock`]: wall-clock abstraction used by expiring records
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_core::errors::AppError;
//! use bookshelf_core::password::{hash_password, verify_password};
//!
//! let error = AppError::unauthorized(anyhow::anyhow!("invalid authentication credentials"));
//! let hash = hash_password("secure_password")?;
//! ```

pub mod clock;
pub mod errors;
pub mod password;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::AppError;
pub use password::{hash_password, verify_password};
