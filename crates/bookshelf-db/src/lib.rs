//! # Bookshelf DB
//!
//! User persistence for the Bookshelf API.
//!
//! The authentication flows only need three things from the relational
//! store (find a user, create a user, mark an email verified), captured by
//! the [`UserStore`] trait. [`PgUserStore`] implements it on PostgreSQL and
//! [`MemoryUserStore`] in process.
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_db::{PgUserStore, init_db_pool};
//!
//! let pool = init_db_pool(&database_url).await?;
//! let users = PgUserStore::new(pool);
//! let user = users.find_user_by_email("reader@example.com").await?;
//! ```

pub mod memory;
pub mod users;

pub use memory::MemoryUserStore;
pub use users::{DbError, NewUser, PgUserStore, User, UserStore};

// Re-export PgPool for convenience
pub use sqlx::PgPool;

use sqlx::postgres::PgPoolOptions;

/// Opens a PostgreSQL connection pool and applies pending migrations.
///
/// The returned pool is cheaply cloneable and meant to be created once at
/// startup.
pub async fn init_db_pool(database_url: &str) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(25)
        .idle_timeout(std::time::Duration::from_secs(15 * 60))
        .connect(database_url)
        .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;

    Ok(pool)
}
