//! Render trigger, status and frame preview handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use reel_compositor::{evaluate_frame, FrameState};
use reel_models::{RenderId, RenderSchedule, RenderState, RenderStatus};

use crate::error::ApiResult;
use crate::handlers::director::project_for;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub schedule: RenderSchedule,
    /// Workspace holding the schedule's trimmed clips
    #[serde(default)]
    pub project_id: Option<RenderId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderAccepted {
    pub success: bool,
    pub render_id: RenderId,
    pub state: RenderState,
    pub message: String,
    /// Library file name the render will be stored under
    pub filename: String,
}

/// Start a render in the background. Progress and the outcome arrive on the
/// log stream; the response only acknowledges the request.
pub async fn trigger_render(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> ApiResult<(StatusCode, Json<RenderAccepted>)> {
    let project = project_for(&state, request.project_id.as_ref()).await?;
    let ticket = state.renders.trigger(request.schedule, project).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RenderAccepted {
            success: true,
            filename: format!("video-{}.mp4", ticket.render_id),
            render_id: ticket.render_id,
            state: RenderState::Queued,
            message: "Rendering started in background".to_string(),
        }),
    ))
}

pub async fn render_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RenderStatus>> {
    let status = state.renders.status(&RenderId::from(id)).await?;
    Ok(Json(status))
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub schedule: RenderSchedule,
    pub frame: u64,
}

/// Evaluate one frame of a schedule for the editor preview.
pub async fn preview_frame(Json(request): Json<PreviewRequest>) -> ApiResult<Json<FrameState>> {
    let frame = evaluate_frame(&request.schedule, request.frame)?;
    Ok(Json(frame))
}
