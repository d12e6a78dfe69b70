use std::sync::Arc;

use anyhow::Context;
use bookshelf_auth::{TokenService, VerificationService};
use bookshelf_cache::{CacheConfig, RecordStore, RedisStore};
use bookshelf_config::{CorsConfig, EmailConfig, TokenConfig};
use bookshelf_core::clock::{Clock, SystemClock};
use bookshelf_db::{PgUserStore, UserStore, init_db_pool};

use crate::utils::background::BackgroundTasks;
use crate::utils::email::{Mailer, SmtpMailer};

#[derive(Clone, Debug)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub verifications: VerificationService,
    pub mailer: Arc<dyn Mailer>,
    pub background: BackgroundTasks,
    pub clock: Arc<dyn Clock>,
    pub token_config: TokenConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
}

impl AppState {
    /// Wires the services around an already-open user store and record store.
    pub fn new(
        users: Arc<dyn UserStore>,
        store: Arc<dyn RecordStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        token_config: TokenConfig,
        email_config: EmailConfig,
        cors_config: CorsConfig,
    ) -> Self {
        Self {
            users,
            tokens: TokenService::new(store.clone(), clock.clone()),
            verifications: VerificationService::new(store, clock.clone()),
            mailer,
            background: BackgroundTasks::new(),
            clock,
            token_config,
            email_config,
            cors_config,
        }
    }
}

/// Connects to PostgreSQL and Redis using environment configuration.
pub async fn init_app_state() -> anyhow::Result<AppState> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = init_db_pool(&database_url)
        .await
        .context("Failed to initialize database")?;

    let store = RedisStore::from_config(&CacheConfig::from_env())
        .await
        .context("Failed to connect to Redis")?;

    let email_config = EmailConfig::from_env();

    Ok(AppState::new(
        Arc::new(PgUserStore::new(pool)),
        Arc::new(store),
        Arc::new(SmtpMailer::new(email_config.clone())),
        Arc::new(SystemClock),
        TokenConfig::from_env(),
        email_config,
        CorsConfig::from_env(),
    ))
}
