//! Trend snapshot cache.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use reel_ml_client::{TaskContract, TextGenerator};
use reel_models::TrendSnapshot;
use reel_store::{DbPool, TrendRepo};

use crate::error::{PipelineError, PipelineResult};
use crate::retry::run_with_contract;

/// Snapshots are served from the store while younger than `ttl`.
pub struct TrendCache {
    pool: DbPool,
    ttl: chrono::Duration,
}

impl TrendCache {
    pub fn new(pool: DbPool, ttl: std::time::Duration) -> Self {
        Self {
            pool,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24)),
        }
    }

    pub async fn get_or_refresh<F, Fut>(&self, category: &str, refresher: F) -> PipelineResult<TrendSnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PipelineResult<Value>>,
    {
        self.get_or_refresh_at(category, Utc::now(), refresher).await
    }

    /// Same as [`get_or_refresh`](Self::get_or_refresh) with an explicit clock.
    pub async fn get_or_refresh_at<F, Fut>(
        &self,
        category: &str,
        now: DateTime<Utc>,
        refresher: F,
    ) -> PipelineResult<TrendSnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PipelineResult<Value>>,
    {
        let category = category.trim().to_lowercase();
        if category.is_empty() {
            return Err(PipelineError::invalid_input("trend category is empty"));
        }

        if let Some(snapshot) = TrendRepo::get(&self.pool, &category).await? {
            if !snapshot.is_stale(now, self.ttl) {
                debug!(category = %category, "Serving cached trend snapshot");
                return Ok(snapshot);
            }
        }

        let payload = refresher().await?;
        let snapshot = TrendRepo::upsert(&self.pool, &category, &payload, now).await?;
        info!(category = %category, "Trend snapshot refreshed");
        Ok(snapshot)
    }
}

/// Ask the generative service for a trend summary of `category`.
pub async fn research_trends(generator: &dyn TextGenerator, category: &str) -> PipelineResult<Value> {
    let prompt = format!(
        "Summarize what currently performs well in short vertical videos about \"{category}\". \
         Respond with ONE JSON object: {{\"category\": \"{category}\", \"hooks\": [\"opening lines\"], \
         \"formats\": [\"video formats\"], \"visualStyles\": [\"looks\"], \"hashtags\": [\"tags\"]}}. \
         Start with '{{'."
    );
    run_with_contract(generator, TaskContract::TrendResearch, &prompt).await
}
