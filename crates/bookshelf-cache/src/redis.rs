//! Redis-backed record store.
//!
//! Records are Redis hashes. `put` is `HSET` followed by `EXPIREAT`; if the
//! expiry cannot be set the hash is deleted again. Every call runs under the
//! configured operation deadline and a missed deadline is reported as
//! [`CacheError::Timeout`] without retrying.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use ::redis::{AsyncCommands, Client, RedisResult, aio::ConnectionManager};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::config::CacheConfig;
use crate::store::{CacheError, Fields, RecordStore};

/// Redis store sharing one multiplexed connection across all requests.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    operation_timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the URL is invalid or the server is
    /// unreachable.
    pub async fn new(redis_url: &str, operation_timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            operation_timeout,
        })
    }

    pub async fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::new(&config.redis_url, config.operation_timeout).await
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        with_deadline(self.operation_timeout, call).await
    }

    /// Best-effort removal of a record whose expiry could not be set.
    async fn discard(&self, key: &str) {
        let mut conn = self.conn.clone();

        if let Err(e) = self.bounded(conn.del::<_, ()>(key)).await {
            warn!(cache.key = %key, error = %e, "Failed to remove record without expiry");
        }
    }
}

/// Runs one Redis call, failing with `CacheError::Timeout` once `limit` passes.
async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, CacheError>
where
    F: Future<Output = RedisResult<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| CacheError::Timeout(limit))?
        .map_err(CacheError::from)
}

#[async_trait]
impl RecordStore for RedisStore {
    #[instrument(skip(self, fields), fields(cache.operation = "HSET+EXPIREAT"))]
    async fn put(
        &self,
        key: &str,
        fields: Fields,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let items: Vec<(String, String)> = fields.into_iter().collect();

        let _: () = self.bounded(conn.hset_multiple(key, items.as_slice())).await?;

        let expiry: Result<bool, CacheError> = self
            .bounded(
                ::redis::cmd("EXPIREAT")
                    .arg(key)
                    .arg(expires_at.timestamp())
                    .query_async(&mut conn),
            )
            .await;

        let applied = match expiry {
            Ok(applied) => applied,
            Err(e) => {
                // The hash is already written and would otherwise never expire.
                self.discard(key).await;
                return Err(e);
            }
        };

        // EXPIREAT with a past instant deletes the key and still returns 1;
        // 0 means the key vanished between the two calls.
        if !applied {
            return Err(CacheError::ExpiryNotSet(key.to_string()));
        }

        debug!(cache.key = %key, cache.expires_at = %expires_at, "Record stored");

        Ok(())
    }

    #[instrument(skip(self), fields(cache.operation = "HGETALL"))]
    async fn get(&self, key: &str) -> Result<Option<Fields>, CacheError> {
        let mut conn = self.conn.clone();

        let fields: HashMap<String, String> = self.bounded(conn.hgetall(key)).await?;

        if fields.is_empty() {
            debug!(cache.key = %key, "Record not found");
            return Ok(None);
        }

        Ok(Some(fields))
    }

    #[instrument(skip(self), fields(cache.operation = "DEL"))]
    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        let _: () = self.bounded(conn.del(key)).await?;

        debug!(cache.key = %key, "Record deleted");

        Ok(())
    }
}
