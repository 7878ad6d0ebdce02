//! SQLite-backed seen store using sqlx.

use {
    async_trait::async_trait,
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
};

use crate::{Result, store::SeenStore};

/// Persistent seen-set: one row per delivered post id, keyed by account
/// and id. Created if absent at startup; never pruned.
pub struct SqliteSeenStore {
    pool: SqlitePool,
}

impl SqliteSeenStore {
    /// Connect and create the table if it does not exist yet.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS seen_posts (
                 account TEXT NOT NULL,
                 post_id TEXT NOT NULL,
                 PRIMARY KEY (account, post_id)
             )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Use an existing pool (the table must already exist).
    #[must_use]
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeenStore for SqliteSeenStore {
    async fn is_seen(&self, handle: &str, post_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM seen_posts WHERE account = ? AND post_id = ?")
            .bind(handle)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn mark_seen(&self, handle: &str, post_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO seen_posts (account, post_id) VALUES (?, ?)")
            .bind(handle)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
