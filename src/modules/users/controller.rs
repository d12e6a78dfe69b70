use axum::{Json, extract::State};
use bookshelf_core::AppError;
use bookshelf_db::User;
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::model::ErrorResponse;
use crate::modules::users::service::UserService;
use crate::state::AppState;

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized - missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("BearerAuth" = [])
    ),
    tag = "Users"
)]
#[instrument(skip_all, fields(user_id = %auth_user.user_id()))]
pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = UserService::get_user(&state, auth_user.user_id()).await?;
    Ok(Json(user))
}
