use axum::{Router, middleware::from_fn_with_state, routing::post};

use crate::middleware::auth::{AuthGate, RouteSecurity, authenticate};
use crate::state::AppState;

use super::controller::{
    login_user, logout, refresh_token, register_user, resend_verification_code, verify_email,
};

pub fn init_auth_router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route_layer(from_fn_with_state(
            AuthGate::new(state.tokens.clone(), RouteSecurity::BearerAuth),
            authenticate,
        ));

    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/refresh", post(refresh_token))
        .route("/verification-code", post(resend_verification_code))
        .route("/verify-email", post(verify_email))
        .merge(protected)
}
