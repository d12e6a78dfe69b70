//! In-process [`UserStore`] for tests and local runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::users::{DbError, NewUser, User, UserStore};

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> MutexGuard<'_, HashMap<Uuid, User>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        Ok(self.users().values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DbError> {
        Ok(self.users().get(&id).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, DbError> {
        let mut users = self.users();

        if users.values().any(|u| u.email == new_user.email) {
            return Err(DbError::DuplicateEmail);
        }

        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            email_verified: false,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn verify_user_email(&self, id: Uuid) -> Result<(), DbError> {
        if let Some(user) = self.users().get_mut(&id) {
            user.email_verified = true;
        }
        Ok(())
    }
}
