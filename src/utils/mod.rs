//! Utility modules for the Bookshelf API.
//!
//! - [`background`]: tracked fire-and-forget tasks drained on shutdown
//! - [`email`]: the mail dispatcher interface and its SMTP implementation

pub mod background;
pub mod email;
