//! Router-level tests against in-process fakes for every external service.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use reel_api::{create_router, ApiConfig, AppState, StateParts};
use reel_media::{MediaError, MediaResult, MediaToolkit};
use reel_ml_client::{MlError, MlResult, TextGenerator, Transcriber, VisionTagger};
use reel_models::{AudioAnalysis, RenderSchedule, VideoClip, PLACEHOLDER_SOURCE};
use reel_pipeline::{JobLogger, PipelineConfig, PipelineError, PipelineResult, RenderExecutor};

struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl ScriptedGenerator {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> MlResult<String> {
        *self.calls.lock().unwrap() += 1;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MlError::invalid_response("no scripted response left"))
    }
}

struct StaticTagger;

#[async_trait]
impl VisionTagger for StaticTagger {
    async fn describe_image(&self, _image: &Path, _instruction: &str) -> MlResult<String> {
        Ok(r#"{"description": "Rendered title card", "emotions": ["bold"], "objects": ["text"], "audioTags": []}"#.into())
    }
}

struct StaticTranscriber;

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, audio: &Path) -> MlResult<AudioAnalysis> {
        assert!(audio.is_file());
        Ok(AudioAnalysis {
            text: "Start now and win".into(),
            duration_seconds: Some(4.2),
            ..AudioAnalysis::default()
        })
    }
}

struct FakeMedia;

#[async_trait]
impl MediaToolkit for FakeMedia {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        Ok(2.0)
    }

    async fn extract_frame(
        &self,
        _video: &Path,
        at_seconds: f64,
        output: &Path,
        _width: u32,
        _height: u32,
    ) -> MediaResult<()> {
        tokio::fs::write(output, format!("frame@{at_seconds}")).await?;
        Ok(())
    }

    async fn trim_range(&self, _input: &Path, output: &Path, _start: f64, duration: f64) -> MediaResult<()> {
        tokio::fs::write(output, format!("trimmed:{duration}")).await?;
        Ok(())
    }
}

struct WritingExecutor;

#[async_trait]
impl RenderExecutor for WritingExecutor {
    async fn render(
        &self,
        props: &Path,
        output: &Path,
        _schedule: &RenderSchedule,
        logger: &JobLogger,
    ) -> PipelineResult<()> {
        if !props.is_file() {
            return Err(PipelineError::render_failed("props file missing"));
        }
        logger.relay("Rendered 60/60 frames");
        tokio::fs::write(output, b"rendered video").await?;
        Ok(())
    }
}

struct TestApp {
    _tmp: tempfile::TempDir,
    router: Router,
    generator: Arc<ScriptedGenerator>,
    raw_dir: std::path::PathBuf,
}

async fn app(responses: &[&str]) -> TestApp {
    let tmp = tempfile::tempdir().unwrap();
    let mut pipeline = PipelineConfig::with_root(tmp.path());
    pipeline.release_poll_interval = Duration::from_millis(5);
    pipeline.release_max_wait = Duration::from_millis(500);
    pipeline.ensure_dirs().await.unwrap();

    let generator = Arc::new(ScriptedGenerator::new(responses));
    let state = AppState::from_parts(StateParts {
        config: ApiConfig::default(),
        pipeline: pipeline.clone(),
        pool: reel_store::connect_in_memory().await.unwrap(),
        generator: generator.clone(),
        tagger: Arc::new(StaticTagger),
        transcriber: Arc::new(StaticTranscriber),
        media: Arc::new(FakeMedia),
        executor: Arc::new(WritingExecutor),
    });

    TestApp {
        raw_dir: pipeline.raw_dir(),
        router: create_router(state),
        generator,
        _tmp: tmp,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const PLAN: &str = r#"{"script_analysis": {"tone": "urgent"},
 "segments": [
   {"time_range": "0-3s", "script_text": "Start now", "visual_intent": "city at night", "suggested_footage": "null", "effect": "ken_burns", "transition": "fade", "text_overlay": "NOW", "text_animation": "shake"}
 ]}"#;

const SCHEDULE: &str = r#"{"width": 1080, "height": 1920, "fps": 30, "durationInFrames": 90,
  "tracks": [
    {"type": "video", "clips": [{"src": "missing.mp4", "startAt": 0, "duration": 3, "effect": "glitch"}]},
    {"type": "text", "clips": [{"content": "NOW", "startAt": 0, "duration": 2}]}
  ]}"#;

fn plan_json() -> Value {
    json!({
        "segments": [{
            "timeRange": "0-3s",
            "scriptText": "Start now",
            "visualIntent": "city at night"
        }]
    })
}

fn render_schedule() -> RenderSchedule {
    let mut schedule = RenderSchedule::vertical(60);
    schedule.tracks.video.push(VideoClip {
        source_uri: PLACEHOLDER_SOURCE.into(),
        source_offset_seconds: 0.0,
        clip_duration_seconds: 2.0,
        timeline_start_seconds: 0.0,
        effect: Default::default(),
        transition: Default::default(),
        physical_trim_range: None,
        use_external_trim: false,
    });
    schedule
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app(&[]).await;

    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app.router, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_empty_library() {
    let app = app(&[]).await;
    let (status, body) = send(&app.router, get("/api/footage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assets"], json!([]));
}

#[tokio::test]
async fn test_plan_requires_script() {
    let app = app(&[]).await;
    let (status, body) = send(&app.router, post_json("/api/director/plan", json!({"script": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert_eq!(app.generator.calls(), 0);
}

#[tokio::test]
async fn test_plan_generation() {
    let app = app(&[PLAN]).await;
    let (status, body) = send(
        &app.router,
        post_json(
            "/api/director/plan",
            json!({"script": "Start now and win", "audioDuration": 3.0}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["plan"]["segments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_compile_substitutes_placeholder() {
    let app = app(&[SCHEDULE]).await;
    let (status, body) = send(
        &app.router,
        post_json(
            "/api/director/compile",
            json!({"script": "Start now and win", "plan": plan_json()}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["projectId"].as_str().is_some());
    let video = &body["schedule"]["tracks"][0];
    assert_eq!(video["kind"], "video");
    assert_eq!(video["clips"][0]["sourceUri"], PLACEHOLDER_SOURCE);
}

#[tokio::test]
async fn test_compile_unknown_voice_track() {
    let app = app(&[SCHEDULE]).await;
    let (status, body) = send(
        &app.router,
        post_json(
            "/api/director/compile",
            json!({"script": "Start now", "plan": plan_json(), "audioFilename": "voice.mp3"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
    assert_eq!(app.generator.calls(), 0);
}

#[tokio::test]
async fn test_compile_exhausted_is_upstream_error() {
    let app = app(&["Sure, one moment.", "Here you go: nothing"]).await;
    let (status, body) = send(
        &app.router,
        post_json(
            "/api/director/compile",
            json!({"script": "Start now", "plan": plan_json()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream_error");
}

#[tokio::test]
async fn test_render_runs_in_background_and_is_ingested() {
    let app = app(&[]).await;
    let (status, body) = send(
        &app.router,
        post_json("/api/render", json!({"schedule": render_schedule()})),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Rendering started in background");
    let render_id = body["renderId"].as_str().unwrap().to_string();
    assert_eq!(body["filename"], format!("video-{render_id}.mp4"));

    let mut state = Value::Null;
    for _ in 0..200 {
        let (_, status) = send(&app.router, get(&format!("/api/render/{render_id}"))).await;
        state = status["state"].clone();
        if state == "SUCCEEDED" || state == "FAILED" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state, "SUCCEEDED");

    let (_, body) = send(&app.router, get("/api/footage")).await;
    let assets = body["assets"].as_array().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0]["originFilename"], format!("video-{render_id}.mp4"));
}

#[tokio::test]
async fn test_unknown_render_and_asset() {
    let app = app(&[]).await;

    let (status, body) = send(&app.router, get("/api/render/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/footage/does-not-exist")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preview_frame() {
    let app = app(&[]).await;

    let (status, body) = send(
        &app.router,
        post_json("/api/preview", json!({"schedule": render_schedule(), "frame": 15})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.is_object());

    let (status, body) = send(
        &app.router,
        post_json("/api/preview", json!({"schedule": render_schedule(), "frame": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_transcribe_stores_sanitized_upload() {
    let app = app(&[]).await;
    let boundary = "reelforge-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"audioFile\"; filename=\"my voice (take 2).mp3\"\r\n\
         Content-Type: audio/mpeg\r\n\r\n\
         ID3fakeaudio\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/director/transcribe")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["script"], "Start now and win");
    assert_eq!(body["filename"], "my_voice__take_2_.mp3");
    assert_eq!(body["audioAnalysis"]["durationSeconds"], 4.2);
    assert!(app.raw_dir.join("my_voice__take_2_.mp3").is_file());
}

#[tokio::test]
async fn test_transcribe_without_file_field() {
    let app = app(&[]).await;
    let boundary = "b";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/director/transcribe")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_trend_snapshot_is_cached() {
    let app = app(&[r#"{"category": "travel", "hooks": ["POV: you missed the flight"]}"#]).await;

    let (status, first) = send(&app.router, post_json("/api/trends", json!({"category": "travel"}))).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["category"], "travel");

    let (status, second) = send(&app.router, post_json("/api/trends", json!({"category": "travel"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["payload"], second["payload"]);
    assert_eq!(app.generator.calls(), 1);
}
