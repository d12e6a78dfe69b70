use axum::Json;
use bookshelf_db::User;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::model::{
    ErrorResponse, LoginRequest, LogoutRequest, MessageResponse, RefreshTokenRequest,
    RegisterRequest, ResendVerificationRequest, TokenResponse, VerifyEmailRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register_user,
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::refresh_token,
        crate::modules::auth::controller::resend_verification_code,
        crate::modules::auth::controller::verify_email,
        crate::modules::auth::controller::logout,
        crate::modules::users::controller::get_current_user,
    ),
    components(
        schemas(
            User,
            RegisterRequest,
            LoginRequest,
            RefreshTokenRequest,
            ResendVerificationRequest,
            VerifyEmailRequest,
            LogoutRequest,
            TokenResponse,
            MessageResponse,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login, tokens and email verification"),
        (name = "Users", description = "Authenticated user endpoints")
    ),
    info(
        title = "Bookshelf API",
        version = "0.1.0",
        description = "Book tracking API with opaque bearer token authentication.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "BearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Opaque access token issued by /v1/auth/login"))
                        .build(),
                ),
            )
        }
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
