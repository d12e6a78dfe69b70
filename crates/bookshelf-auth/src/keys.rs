//! Record key construction.
//!
//! Scope is part of every token key, so access and refresh tokens with the
//! same secret text never collide.

use crate::token::TokenScope;

/// Key for a bearer token: `<scope>:<secret>`.
pub fn token(scope: TokenScope, plaintext: &str) -> String {
    format!("{}:{}", scope.as_str(), plaintext)
}

/// Key for an email's verification record: `<email>:verification_code`.
pub fn verification_code(email: &str) -> String {
    format!("{}:verification_code", email)
}
