use anyhow::anyhow;
use bookshelf_auth::{AuthError, TokenScope};
use bookshelf_core::{AppError, hash_password, verify_password};
use bookshelf_db::{DbError, NewUser, User};
use chrono::Datelike;
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::metrics::{
    track_user_login_failure, track_user_login_success, track_user_registered,
    track_verification_attempt,
};
use crate::state::AppState;
use crate::utils::email::{USER_WELCOME_TEMPLATE, send_with_retry};

use super::model::{
    LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest,
    ResendVerificationRequest, TokenResponse, VerifyEmailRequest,
};

const TOKEN_TYPE: &str = "bearer";

fn invalid_credentials() -> AppError {
    AppError::unauthorized(anyhow!("invalid authentication credentials"))
}

fn invalid_verification_code() -> AppError {
    AppError::unauthorized(anyhow!("invalid or expired verification code"))
}

pub struct AuthService;

impl AuthService {
    /// Creates the account and mails a verification code in the background.
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn register_user(state: &AppState, dto: RegisterRequest) -> Result<User, AppError> {
        let password_hash = hash_password(&dto.password)?;

        let user = state
            .users
            .create_user(NewUser {
                first_name: dto.first_name,
                last_name: dto.last_name,
                email: dto.email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                DbError::DuplicateEmail => {
                    AppError::conflict(anyhow!("a user with this email address already exists"))
                }
                other => AppError::internal(other),
            })?;

        track_user_registered();
        info!(user_id = %user.id, "User registered");

        Self::dispatch_verification_code(state, user.id, &user.email);

        Ok(user)
    }

    /// Issues a fresh verification code and emails it from a background task.
    ///
    /// Failures are logged; the caller's response does not depend on them.
    pub fn dispatch_verification_code(state: &AppState, user_id: Uuid, email: &str) {
        let verifications = state.verifications.clone();
        let mailer = state.mailer.clone();
        let clock = state.clock.clone();
        let ttl = state.token_config.verification_code_ttl;
        let max_attempts = state.email_config.max_attempts;
        let backoff = std::time::Duration::from_secs(state.email_config.retry_backoff_secs);
        let email = email.to_string();

        state.background.spawn("send_verification_code", async move {
            let data = match verifications.issue_verification(user_id, &email, ttl).await {
                Ok(data) => data,
                Err(e) => {
                    error!(%user_id, error = %e, "Failed to issue verification code");
                    return;
                }
            };

            let template_data = json!({
                "code": data.code,
                "year": clock.now().year(),
            });

            if let Err(e) = send_with_retry(
                mailer.as_ref(),
                &email,
                USER_WELCOME_TEMPLATE,
                &template_data,
                max_attempts,
                backoff,
            )
            .await
            {
                error!(%user_id, error = %e, "Giving up on verification email");
            }
        });
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn login_user(state: &AppState, dto: LoginRequest) -> Result<TokenResponse, AppError> {
        let Some(user) = state.users.find_user_by_email(&dto.email).await? else {
            track_user_login_failure("unknown_email");
            return Err(invalid_credentials());
        };

        if !verify_password(&dto.password, &user.password_hash)? {
            track_user_login_failure("wrong_password");
            return Err(invalid_credentials());
        }

        let access = state
            .tokens
            .issue_token(user.id, state.token_config.access_token_ttl, TokenScope::Access)
            .await?;
        let refresh = state
            .tokens
            .issue_token(user.id, state.token_config.refresh_token_ttl, TokenScope::Refresh)
            .await?;

        track_user_login_success();

        Ok(TokenResponse {
            access_token: access.plaintext,
            refresh_token: refresh.plaintext,
            expires_in: access.expires_at.timestamp(),
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// A refresh token inside its renewal window is rotated: a new one is
    /// issued and the presented one revoked.
    #[instrument(skip_all)]
    pub async fn refresh_token(
        state: &AppState,
        dto: RefreshTokenRequest,
    ) -> Result<TokenResponse, AppError> {
        let current = state
            .tokens
            .resolve_token(TokenScope::Refresh, &dto.refresh_token)
            .await
            .map_err(|e| match e {
                AuthError::NotFound => {
                    AppError::unauthorized(anyhow!("invalid or expired refresh token"))
                }
                other => AppError::internal(other),
            })?;

        let access = state
            .tokens
            .issue_token(
                current.user_id,
                state.token_config.access_token_ttl,
                TokenScope::Access,
            )
            .await?;

        let refresh_token = if current
            .needs_renewal(state.clock.now(), state.token_config.refresh_renewal_threshold)
        {
            let renewed = state
                .tokens
                .issue_token(
                    current.user_id,
                    state.token_config.refresh_token_ttl,
                    TokenScope::Refresh,
                )
                .await?;
            state
                .tokens
                .revoke_token(TokenScope::Refresh, &current.plaintext)
                .await?;
            info!(user_id = %current.user_id, "Refresh token rotated");
            renewed.plaintext
        } else {
            current.plaintext
        };

        Ok(TokenResponse {
            access_token: access.plaintext,
            refresh_token,
            expires_in: access.expires_at.timestamp(),
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn resend_verification_code(
        state: &AppState,
        dto: ResendVerificationRequest,
    ) -> Result<MessageResponse, AppError> {
        let user = state
            .users
            .find_user_by_email(&dto.email)
            .await?
            .ok_or_else(|| {
                AppError::not_found(anyhow!("no account is associated with this email address"))
            })?;

        if user.email_verified {
            return Err(AppError::conflict(anyhow!("email is already verified")));
        }

        Self::dispatch_verification_code(state, user.id, &user.email);

        Ok(MessageResponse {
            message: "email has been sent successfully".to_string(),
        })
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn verify_email(
        state: &AppState,
        dto: VerifyEmailRequest,
    ) -> Result<MessageResponse, AppError> {
        let data = match state.verifications.resolve_verification(&dto.email).await {
            Ok(data) => data,
            Err(AuthError::NotFound) => {
                track_verification_attempt("expired");
                return Err(invalid_verification_code());
            }
            Err(other) => return Err(AppError::internal(other)),
        };

        if !data.matches(&dto.verification_code) {
            track_verification_attempt("mismatch");
            return Err(invalid_verification_code());
        }

        state.users.verify_user_email(data.user_id).await?;

        // The email is already verified at this point; a leftover record
        // only lives until its expiry.
        if let Err(e) = state.verifications.consume_verification(&dto.email).await {
            warn!(error = %e, "Failed to delete consumed verification code");
        }

        track_verification_attempt("verified");
        info!(user_id = %data.user_id, "Email verified");

        Ok(MessageResponse {
            message: "email verified successfully".to_string(),
        })
    }

    /// Revokes the presented access token and, when it belongs to the same
    /// user, the given refresh token.
    #[instrument(skip_all, fields(%user_id))]
    pub async fn logout(
        state: &AppState,
        user_id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        state
            .tokens
            .revoke_token(TokenScope::Access, access_token)
            .await?;

        if let Some(plaintext) = refresh_token {
            match state.tokens.resolve_token(TokenScope::Refresh, plaintext).await {
                Ok(token) if token.user_id == user_id => {
                    state
                        .tokens
                        .revoke_token(TokenScope::Refresh, plaintext)
                        .await?;
                }
                Ok(_) => warn!("Refresh token presented at logout belongs to another user"),
                Err(AuthError::NotFound) => {}
                Err(other) => return Err(AppError::internal(other)),
            }
        }

        info!("User logged out");
        Ok(())
    }
}
