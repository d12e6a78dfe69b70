//! In-process record store with clock-driven expiry.
//!
//! Behaves like the Redis store from a caller's point of view: expired keys
//! read as absent and setting an expiry in the past removes the key. Used by
//! tests and for running the API without a Redis server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bookshelf_core::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};

use crate::store::{CacheError, Fields, RecordStore};

#[derive(Debug)]
struct Entry {
    fields: Fields,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live (unexpired) records.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries()
            .values()
            .filter(|entry| !is_expired(entry, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expiry currently attached to `key`, if any.
    pub fn expiry_of(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries().get(key).and_then(|entry| entry.expires_at)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

fn is_expired(entry: &Entry, now: DateTime<Utc>) -> bool {
    entry.expires_at.is_some_and(|at| at <= now)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        fields: Fields,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries();

        entries.insert(
            key.to_string(),
            Entry {
                fields,
                expires_at: None,
            },
        );

        if expires_at <= self.clock.now() {
            entries.remove(key);
        } else if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(expires_at);
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Fields>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries();

        match entries.get(key) {
            Some(entry) if is_expired(entry, now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.fields.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries().remove(key);
        Ok(())
    }
}
