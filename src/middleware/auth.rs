//! Bearer token authentication gate.
//!
//! Routers declare a [`RouteSecurity`] per route group and wrap protected
//! groups with [`authenticate`]. The gate resolves the presented access token
//! and stores an [`AuthenticatedUser`] in the request extensions; handlers
//! read it back with the [`AuthUser`] extractor.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bookshelf_auth::{AuthError, TokenScope, TokenService};
use bookshelf_core::errors::INTERNAL_ERROR_MESSAGE;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::metrics::track_gate_rejection;

const BEARER_PREFIX: &str = "Bearer ";
const UNAUTHENTICATED_MESSAGE: &str = "invalid or missing authentication token";

/// Authentication requirement of a route group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSecurity {
    Public,
    BearerAuth,
}

/// Identity established by the gate for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("authorization header is missing")]
    MissingCredentials,

    #[error("authorization header is not a bearer token")]
    MalformedCredentials,

    #[error("access token is invalid or expired")]
    InvalidOrExpiredCredentials,

    #[error("token lookup failed: {0}")]
    Internal(#[source] AuthError),
}

impl GateError {
    fn reason(&self) -> &'static str {
        match self {
            GateError::MissingCredentials => "missing",
            GateError::MalformedCredentials => "malformed",
            GateError::InvalidOrExpiredCredentials => "invalid",
            GateError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        if let GateError::Internal(ref source) = self {
            error!(error = ?source, "Authentication gate failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": INTERNAL_ERROR_MESSAGE })),
            )
                .into_response();
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": UNAUTHENTICATED_MESSAGE })),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GateError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(GateError::MissingCredentials)?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .ok_or(GateError::MalformedCredentials)
}

#[derive(Clone, Debug)]
pub struct AuthGate {
    tokens: TokenService,
    security: RouteSecurity,
}

impl AuthGate {
    pub fn new(tokens: TokenService, security: RouteSecurity) -> Self {
        Self { tokens, security }
    }

    /// Resolves the caller's identity. `Ok(None)` means the route is public.
    pub async fn check(&self, headers: &HeaderMap) -> Result<Option<AuthenticatedUser>, GateError> {
        if self.security == RouteSecurity::Public {
            return Ok(None);
        }

        let plaintext = bearer_token(headers)?;

        let token = self
            .tokens
            .resolve_token(TokenScope::Access, plaintext)
            .await
            .map_err(|e| match e {
                AuthError::NotFound => GateError::InvalidOrExpiredCredentials,
                other => GateError::Internal(other),
            })?;

        Ok(Some(AuthenticatedUser {
            user_id: token.user_id,
        }))
    }
}

/// Middleware entry point, installed with `from_fn_with_state`.
pub async fn authenticate(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    match gate.check(req.headers()).await {
        Ok(Some(user)) => {
            debug!(user_id = %user.user_id, "Request authenticated");
            req.extensions_mut().insert(user);
        }
        Ok(None) => {}
        Err(e) => {
            track_gate_rejection(e.reason());
            return Err(e);
        }
    }

    Ok(next.run(req).await)
}

/// Extractor for the identity set by [`authenticate`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub AuthenticatedUser);

impl AuthUser {
    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .map(AuthUser)
            .ok_or(GateError::MissingCredentials)
    }
}
