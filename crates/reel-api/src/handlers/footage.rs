//! Footage library handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use reel_models::{AssetId, FootageAsset, ForensicSegment, SegmentHit};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::upload::save_file_field;

#[derive(Serialize)]
pub struct AssetListResponse {
    pub assets: Vec<FootageAsset>,
}

/// List ingested footage, newest first.
pub async fn list_footage(State(state): State<AppState>) -> ApiResult<Json<AssetListResponse>> {
    let assets = state.index.list_assets().await?;
    Ok(Json(AssetListResponse { assets }))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SegmentHit>,
}

pub async fn search_footage(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::bad_request("q must not be empty"));
    }
    let results = state.index.search(q).await?;
    Ok(Json(SearchResponse {
        query: q.to_string(),
        results,
    }))
}

#[derive(Serialize)]
pub struct AssetDetailResponse {
    pub asset: FootageAsset,
    pub segments: Vec<ForensicSegment>,
}

pub async fn get_footage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AssetDetailResponse>> {
    let id = AssetId::from(id);
    let asset = state.index.get_asset(&id).await?;
    let segments = state.index.segments_for_asset(&id).await?;
    Ok(Json(AssetDetailResponse { asset, segments }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub asset: FootageAsset,
}

/// Delete an asset, its segments and its file.
pub async fn delete_footage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let asset = state.index.delete_asset(&AssetId::from(id)).await?;
    info!(asset_id = %asset.id, "Footage deleted");
    Ok(Json(DeleteResponse {
        success: true,
        asset,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub asset: FootageAsset,
    pub segments_added: usize,
    pub intervals_skipped: usize,
    pub already_indexed: bool,
}

/// Upload a video (`file` field) into the library and index it.
pub async fn upload_footage(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<IngestResponse>> {
    let saved = save_file_field(&mut multipart, "file", &state.pipeline.raw_dir()).await?;
    let report = state.index.ingest(&saved.path).await?;
    Ok(Json(IngestResponse {
        asset: report.asset,
        segments_added: report.segments_added,
        intervals_skipped: report.intervals_skipped,
        already_indexed: report.already_indexed,
    }))
}

#[derive(Serialize)]
pub struct ScanFailure {
    pub file: String,
    pub error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub ingested: Vec<FootageAsset>,
    pub already_indexed: usize,
    pub failed: Vec<ScanFailure>,
}

/// Index every video in the library directory not indexed yet.
pub async fn scan_footage(State(state): State<AppState>) -> ApiResult<Json<ScanResponse>> {
    let report = state.index.ingest_directory(&state.pipeline.raw_dir()).await?;
    Ok(Json(ScanResponse {
        ingested: report.ingested,
        already_indexed: report.already_indexed,
        failed: report
            .failed
            .into_iter()
            .map(|(file, error)| ScanFailure { file, error })
            .collect(),
    }))
}
