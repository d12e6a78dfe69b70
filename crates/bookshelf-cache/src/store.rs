//! The storage interface shared by every backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Field layout of a stored record.
pub type Fields = HashMap<String, String>;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Connection(#[from] ::redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Expiry was not applied to key {0}")]
    ExpiryNotSet(String),

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Keyed record storage with absolute per-key expiry.
///
/// Implementations must be safe to share across tasks; correctness relies on
/// the backend's per-key atomicity only.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Writes `fields` at `key`, then sets the key to expire at `expires_at`.
    ///
    /// An error from either step means the record must not be relied upon.
    async fn put(
        &self,
        key: &str,
        fields: Fields,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CacheError>;

    /// Returns the stored fields, or `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Fields>, CacheError>;

    /// Removes the record. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
