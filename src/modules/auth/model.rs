use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// bcrypt ignores everything past 72 bytes.
const PASSWORD_MIN_BYTES: usize = 8;
const PASSWORD_MAX_BYTES: usize = 72;
const REFRESH_TOKEN_BYTES: usize = 26;

fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.len();
    if len < PASSWORD_MIN_BYTES {
        return Err(ValidationError::new("password_too_short")
            .with_message(Cow::from("password must be at least 8 bytes long")));
    }
    if len > PASSWORD_MAX_BYTES {
        return Err(ValidationError::new("password_too_long")
            .with_message(Cow::from("password must not be more than 72 bytes long")));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name_required").with_message(Cow::from("must be provided")));
    }
    if name.len() > 500 {
        return Err(ValidationError::new("name_too_long")
            .with_message(Cow::from("must not be more than 500 bytes long")));
    }
    Ok(())
}

fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new("verification_code")
            .with_message(Cow::from("verification code must be exactly 6 digits")));
    }
    Ok(())
}

fn validate_refresh_token(token: &str) -> Result<(), ValidationError> {
    if token.len() != REFRESH_TOKEN_BYTES {
        return Err(ValidationError::new("refresh_token_length")
            .with_message(Cow::from("refresh token must be 26 bytes long")));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_name"))]
    pub first_name: String,
    #[validate(custom(function = "validate_name"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(custom(function = "validate_refresh_token"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyEmailRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_code"))]
    pub verification_code: String,
}

/// Logout body. Omitting the refresh token revokes only the access token.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry as unix seconds.
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_password_bounds_are_bytes() {
        assert!(register("1234567").validate().is_err());
        assert!(register("12345678").validate().is_ok());
        assert!(register(&"a".repeat(72)).validate().is_ok());
        assert!(register(&"a".repeat(73)).validate().is_err());
        // 24 three-byte characters: 24 chars, 72 bytes.
        assert!(register(&"€".repeat(24)).validate().is_ok());
        assert!(register(&"€".repeat(25)).validate().is_err());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut dto = register("password123");
        dto.first_name = "  ".to_string();
        assert!(dto.validate().is_err());

        dto.first_name = "x".repeat(501);
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_verification_code_digits() {
        let dto = |code: &str| VerifyEmailRequest {
            email: "ada@example.com".to_string(),
            verification_code: code.to_string(),
        };

        assert!(dto("012345").validate().is_ok());
        assert!(dto("12345").validate().is_err());
        assert!(dto("12345a").validate().is_err());
        assert!(dto("1234567").validate().is_err());
    }

    #[test]
    fn test_refresh_token_length() {
        let ok = RefreshTokenRequest {
            refresh_token: "A".repeat(26),
        };
        let short = RefreshTokenRequest {
            refresh_token: "A".repeat(25),
        };
        // 25 characters but 26 bytes
        let multibyte = RefreshTokenRequest {
            refresh_token: format!("{}é", "A".repeat(24)),
        };

        assert!(ok.validate().is_ok());
        assert!(short.validate().is_err());
        assert!(multibyte.validate().is_ok());
    }
}
