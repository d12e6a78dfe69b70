use std::env;

use crate::env_or;

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    /// Delivery attempts per message before giving up.
    pub max_attempts: u32,
    /// Fixed pause between delivery attempts, in seconds.
    pub retry_backoff_secs: u64,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("SMTP_ENABLED")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: env_or("SMTP_PORT", 1025),
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@bookshelf.dev".to_string()),
            from_name: env::var("FROM_NAME").unwrap_or_else(|_| "Bookshelf".to_string()),
            max_attempts: env_or("EMAIL_MAX_ATTEMPTS", 5),
            retry_backoff_secs: env_or("EMAIL_RETRY_BACKOFF_SECONDS", 5),
        }
    }
}
