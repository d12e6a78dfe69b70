//! # Bookshelf Config
//!
//! Configuration types for the Bookshelf API, loaded from environment variables:
//!
//! - [`token`]: token and verification-code lifetimes
//! - [`email`]: SMTP settings and delivery retry policy
//! - [`cors`]: allowed origins
//! - [`server`]: listen ports and shutdown behaviour
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_config::{CorsConfig, EmailConfig, ServerConfig, TokenConfig};
//!
//! let token_config = TokenConfig::from_env();
//! let email_config = EmailConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod server;
pub mod token;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use server::ServerConfig;
pub use token::TokenConfig;

/// Reads an environment variable and parses it, falling back to `default`
/// when it is unset or malformed.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
