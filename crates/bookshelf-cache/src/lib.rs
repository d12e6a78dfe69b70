//! # Bookshelf Cache
//!
//! Record storage on top of an external key/value backend.
//!
//! Records are flat maps of string fields stored under caller-supplied keys,
//! each with an absolute expiry instant. This crate provides:
//!
//! - [`RecordStore`]: the narrow storage interface services depend on
//! - [`RedisStore`]: Redis hashes with `EXPIREAT`, every call bounded by a deadline
//! - [`MemoryStore`]: an in-process store with clock-driven expiry
//! - [`encode_record`] / [`decode_record`]: serde structs to and from field maps
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_cache::{CacheConfig, RecordStore, RedisStore};
//!
//! let config = CacheConfig::from_env();
//! let store = RedisStore::from_config(&config).await?;
//!
//! store.put("access_token:ABC", fields, expires_at).await?;
//! let fields = store.get("access_token:ABC").await?;
//! ```

pub mod config;
pub mod memory;
pub mod record;
pub mod redis;
pub mod store;

pub use config::CacheConfig;
pub use memory::MemoryStore;
pub use record::{decode_record, encode_record};
pub use self::redis::RedisStore;
pub use store::{CacheError, Fields, RecordStore};
