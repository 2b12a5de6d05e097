//! Repository for `trend_snapshots`.

use chrono::{DateTime, Utc};
use reel_models::TrendSnapshot;
use sqlx::FromRow;

use crate::db::DbPool;
use crate::error::StoreResult;

#[derive(Debug, FromRow)]
struct TrendRow {
    category: String,
    payload: String,
    last_updated: DateTime<Utc>,
}

pub struct TrendRepo;

impl TrendRepo {
    /// Insert or replace the snapshot for `category`.
    pub async fn upsert(
        pool: &DbPool,
        category: &str,
        payload: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> StoreResult<TrendSnapshot> {
        let encoded = serde_json::to_string(payload)?;
        sqlx::query(
            "INSERT INTO trend_snapshots (category, payload, last_updated)
             VALUES (?, ?, ?)
             ON CONFLICT (category) DO UPDATE
                SET payload = excluded.payload,
                    last_updated = excluded.last_updated",
        )
        .bind(category)
        .bind(&encoded)
        .bind(at)
        .execute(pool)
        .await?;

        Ok(TrendSnapshot {
            category: category.to_string(),
            payload: payload.clone(),
            last_updated: at,
        })
    }

    pub async fn get(pool: &DbPool, category: &str) -> StoreResult<Option<TrendSnapshot>> {
        let row = sqlx::query_as::<_, TrendRow>(
            "SELECT category, payload, last_updated FROM trend_snapshots WHERE category = ?",
        )
        .bind(category)
        .fetch_optional(pool)
        .await?;

        row.map(|r| {
            Ok(TrendSnapshot {
                category: r.category,
                payload: serde_json::from_str(&r.payload)?,
                last_updated: r.last_updated,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_replaces_by_category() {
        let pool = connect_in_memory().await.unwrap();
        let first = Utc::now() - chrono::Duration::hours(30);
        TrendRepo::upsert(&pool, "fitness", &json!({"topics": ["a"]}), first)
            .await
            .unwrap();

        let later = Utc::now();
        TrendRepo::upsert(&pool, "fitness", &json!({"topics": ["b"]}), later)
            .await
            .unwrap();

        let snapshot = TrendRepo::get(&pool, "fitness").await.unwrap().unwrap();
        assert_eq!(snapshot.payload, json!({"topics": ["b"]}));
        assert_eq!(snapshot.last_updated.timestamp(), later.timestamp());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trend_snapshots")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(TrendRepo::get(&pool, "cooking").await.unwrap().is_none());
    }
}
