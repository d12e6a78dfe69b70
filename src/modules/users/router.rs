use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::middleware::auth::{AuthGate, RouteSecurity, authenticate};
use crate::modules::users::controller::get_current_user;
use crate::state::AppState;

pub fn init_users_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route_layer(from_fn_with_state(
            AuthGate::new(state.tokens.clone(), RouteSecurity::BearerAuth),
            authenticate,
        ))
}
