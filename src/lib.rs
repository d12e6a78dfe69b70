//! # Bookshelf API
//!
//! HTTP front end for the Bookshelf authentication subsystem: account
//! registration, email verification with one-time codes, and opaque bearer
//! tokens resolved from Redis on every authenticated request.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── middleware/       # Bearer token gate and AuthUser extractor
//! ├── modules/          # Feature modules
//! │   ├── auth/        # register, login, refresh, verification, logout
//! │   └── users/       # current user profile
//! └── utils/           # background tasks, email delivery
//! ```
//!
//! Domain logic lives in the workspace crates:
//!
//! - `bookshelf-auth`: secret generation, token and verification services
//! - `bookshelf-cache`: record store over Redis (or memory)
//! - `bookshelf-db`: user persistence
//! - `bookshelf-config`: environment configuration
//! - `bookshelf-core`: error type, password hashing, clock
//!
//! ## Authentication
//!
//! - **Access Token**: 26-character opaque secret, valid 2 hours
//! - **Refresh Token**: 26-character opaque secret, valid 7 days, rotated when
//!   less than 72 hours remain
//! - **Verification Code**: 6 digits, valid 5 minutes, one live code per email
//!
//! Protected routes expect `Authorization: Bearer <access_token>`.

pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;

// Re-export workspace crates for convenience
pub use bookshelf_auth;
pub use bookshelf_cache;
pub use bookshelf_config;
pub use bookshelf_core;
pub use bookshelf_db;
