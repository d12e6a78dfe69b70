//! Redis connection configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Redis store configuration.
///
/// # Environment Variables
///
/// - `REDIS_URL`: Redis connection URL (default: `redis://127.0.0.1:6379`)
/// - `REDIS_OPERATION_TIMEOUT_SECONDS`: deadline for a single store call (default: `5`)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Redis connection URL.
    pub redis_url: String,

    /// Deadline applied to every individual backend call.
    pub operation_timeout: Duration,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            operation_timeout: Duration::from_secs(
                env::var("REDIS_OPERATION_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            operation_timeout: Duration::from_secs(5),
        }
    }
}
