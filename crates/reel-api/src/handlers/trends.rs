//! Trend research handler.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use reel_models::TrendSnapshot;
use reel_pipeline::research_trends;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct TrendRequest {
    #[validate(length(min = 1, max = 200))]
    pub category: String,
}

/// Trend snapshot for a category, refreshed when older than the TTL.
pub async fn research_trend(
    State(state): State<AppState>,
    Json(request): Json<TrendRequest>,
) -> ApiResult<Json<TrendSnapshot>> {
    request.validate()?;

    let generator = state.generator.clone();
    let category = request.category.clone();
    let snapshot = state
        .trends
        .get_or_refresh(&request.category, move || async move {
            research_trends(generator.as_ref(), &category).await
        })
        .await?;
    Ok(Json(snapshot))
}
