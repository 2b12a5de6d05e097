//! Connection pool and schema bootstrap.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::error::{StoreError, StoreResult};

pub type DbPool = SqlitePool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS footage_assets (
    id               TEXT PRIMARY KEY,
    origin_filename  TEXT NOT NULL,
    location         TEXT NOT NULL UNIQUE,
    duration_seconds REAL NOT NULL,
    content_hash     TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_footage_assets_content_hash
    ON footage_assets (content_hash);

DROP INDEX IF EXISTS idx_footage_assets_content_hash;

CREATE TABLE IF NOT EXISTS forensic_segments (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id     TEXT NOT NULL REFERENCES footage_assets (id) ON DELETE CASCADE,
    start_time   REAL NOT NULL,
    end_time     REAL NOT NULL,
    description  TEXT NOT NULL,
    emotion_tags TEXT NOT NULL DEFAULT '[]',
    object_tags  TEXT NOT NULL DEFAULT '[]',
    audio_tags   TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_forensic_segments_video_id
    ON forensic_segments (video_id);

CREATE TABLE IF NOT EXISTS trend_snapshots (
    category     TEXT PRIMARY KEY,
    payload      TEXT NOT NULL,
    last_updated TEXT NOT NULL
);
"#;

/// Open (creating if needed) the database at `database_url` and apply the schema.
pub async fn connect(database_url: &str) -> StoreResult<DbPool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StoreError::InvalidUrl(format!("{database_url}: {e}")))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    bootstrap(&pool).await?;
    info!("Connected to footage database at {}", database_url);
    Ok(pool)
}

/// A private in-memory database. All handles share one connection.
pub async fn connect_in_memory() -> StoreResult<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| StoreError::InvalidUrl(e.to_string()))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    bootstrap(&pool).await?;
    Ok(pool)
}

async fn bootstrap(pool: &DbPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_database_is_created_and_reopened() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("footage.db").display());

        let pool = connect(&url).await.unwrap();
        sqlx::query("INSERT INTO trend_snapshots (category, payload, last_updated) VALUES ('x', '{}', '2024-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        // Bootstrap is idempotent and keeps existing rows.
        let pool = connect(&url).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trend_snapshots")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
