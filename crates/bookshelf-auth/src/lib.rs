//! # Bookshelf Auth
//!
//! Opaque bearer tokens and one-time email verification codes.
//!
//! Tokens carry no structure: the client holds a random secret and all
//! metadata (owner, scope, expiry) lives in the record store under
//! `<scope>:<secret>`. Verification codes live under
//! `<email>:verification_code`, one per address.
//!
//! - [`secret`]: CSPRNG-backed opaque tokens and 6-digit codes
//! - [`token`]: [`TokenService`] issuing, resolving and revoking tokens
//! - [`verification`]: [`VerificationService`] for email confirmation codes
//! - [`keys`]: record key construction
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_auth::{TokenScope, TokenService};
//!
//! let tokens = TokenService::new(store, clock);
//! let token = tokens.issue_token(user_id, Duration::hours(2), TokenScope::Access).await?;
//! let resolved = tokens.resolve_token(TokenScope::Access, &token.plaintext).await?;
//! ```

pub mod error;
pub mod keys;
pub mod secret;
pub mod token;
pub mod verification;

pub use error::AuthError;
pub use secret::{generate_numeric_code, generate_opaque_token};
pub use token::{Token, TokenScope, TokenService};
pub use verification::{VerificationData, VerificationService};
