use anyhow::anyhow;
use bookshelf_core::AppError;
use bookshelf_db::User;
use tracing::instrument;
use uuid::Uuid;

use crate::state::AppState;

pub struct UserService;

impl UserService {
    #[instrument(skip(state))]
    pub async fn get_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
        state
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("user not found")))
    }
}
