//! Script-to-schedule handlers: transcription, planning and compilation.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use reel_models::{AudioAnalysis, RenderId, RenderProject, RenderSchedule, ShotPlan};
use reel_pipeline::compiler::file_name_of;
use reel_pipeline::{CompileRequest, PipelineError, VoiceTrack};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::upload::save_file_field;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeResponse {
    pub success: bool,
    pub script: String,
    pub audio_analysis: AudioAnalysis,
    /// Sanitized name the voice track was stored under
    pub filename: String,
}

/// Store an uploaded voice track (`audioFile` field) and transcribe it.
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<TranscribeResponse>> {
    let saved = save_file_field(&mut multipart, "audioFile", &state.pipeline.raw_dir()).await?;
    info!(filename = %saved.filename, bytes = saved.bytes, "Transcribing voice track");
    state
        .log
        .log(format!("[transcribe] analyzing {}", saved.filename));

    let analysis = state
        .transcriber
        .transcribe(&saved.path)
        .await
        .map_err(PipelineError::from)?;

    Ok(Json(TranscribeResponse {
        success: true,
        script: analysis.text.clone(),
        audio_analysis: analysis,
        filename: saved.filename,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    #[validate(length(min = 1, max = 20000))]
    pub script: String,
    #[serde(default)]
    pub audio_analysis: Option<AudioAnalysis>,
    /// Measured voice duration; overrides the analysis' own value
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub audio_duration: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub success: bool,
    pub plan: ShotPlan,
    /// Library files the footage search matched
    pub matched_footage: Vec<String>,
}

pub async fn generate_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<Json<PlanResponse>> {
    request.validate()?;

    let mut audio = request.audio_analysis;
    if let Some(duration) = request.audio_duration.filter(|d| *d > 0.0) {
        audio.get_or_insert_with(AudioAnalysis::default).duration_seconds = Some(duration);
    }

    let insights = state.index.insights_for_script(&request.script).await?;
    let plan = state
        .planner
        .generate_plan(&request.script, audio.as_ref(), &insights)
        .await?;

    Ok(Json(PlanResponse {
        success: true,
        plan,
        matched_footage: insights.matches.keys().cloned().collect(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompileBody {
    #[validate(length(min = 1, max = 20000))]
    pub script: String,
    pub plan: ShotPlan,
    /// Voice track previously stored by the transcription endpoint
    #[serde(default)]
    pub audio_filename: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub audio_duration: Option<f64>,
    /// Reuse an existing render workspace
    #[serde(default)]
    pub project_id: Option<RenderId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    pub success: bool,
    pub project_id: RenderId,
    pub schedule: RenderSchedule,
}

/// Open the named workspace or create a fresh one.
pub(crate) async fn project_for(state: &AppState, id: Option<&RenderId>) -> ApiResult<RenderProject> {
    Ok(match id {
        Some(id) => state.workspaces.open(id).await?,
        None => state.workspaces.create().await?,
    })
}

pub async fn compile_schedule(
    State(state): State<AppState>,
    Json(body): Json<CompileBody>,
) -> ApiResult<Json<CompileResponse>> {
    body.validate()?;

    let voice = match body.audio_filename.as_deref() {
        Some(name) => {
            let file = file_name_of(name)
                .ok_or_else(|| ApiError::bad_request("audioFilename is not a file name"))?;
            let path = state.pipeline.raw_dir().join(file);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ApiError::not_found(format!("voice track {file} is not in the library")));
            }
            Some(VoiceTrack {
                source_uri: tokio::fs::canonicalize(&path)
                    .await?
                    .to_string_lossy()
                    .to_string(),
                duration_seconds: body.audio_duration.filter(|d| *d > 0.0),
            })
        }
        None => None,
    };

    let project = project_for(&state, body.project_id.as_ref()).await?;
    let request = CompileRequest {
        script: body.script,
        plan: body.plan,
        voice,
    };
    let schedule = state.compiler.compile(&request, &project).await?;

    Ok(Json(CompileResponse {
        success: true,
        project_id: project.id,
        schedule,
    }))
}
