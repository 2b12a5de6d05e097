//! In-process fakes for the inference and transcode seams.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use reel_media::{MediaError, MediaResult, MediaToolkit};
use reel_ml_client::{MlError, MlResult, TextGenerator, VisionTagger};

/// Replays queued responses in order; errors once the queue is empty.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<MlResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<MlResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> MlResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MlError::invalid_response("script exhausted")))
    }
}

/// Tags every frame, optionally failing on chosen calls (0-based).
#[derive(Default)]
pub struct FakeTagger {
    fail_calls: Vec<usize>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeTagger {
    pub fn failing_on(fail_calls: Vec<usize>) -> Self {
        Self {
            fail_calls,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn frames_seen(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionTagger for FakeTagger {
    async fn describe_image(&self, image: &Path, _instruction: &str) -> MlResult<String> {
        assert!(image.exists(), "frame must exist while tagging");
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(image.to_path_buf());
            calls.len() - 1
        };
        if self.fail_calls.contains(&index) {
            return Err(MlError::RequestFailed {
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok(format!(
            r#"{{"description": "Sunset over a city skyline, frame {index}", "emotions": ["calm"], "objects": ["skyline", "sun"], "audioTags": ["wind"]}}"#
        ))
    }
}

/// Media toolkit that writes small placeholder files instead of running ffmpeg.
pub struct FakeToolkit {
    default_duration: f64,
    durations: HashMap<PathBuf, f64>,
    fail_trim: bool,
    trims: Mutex<Vec<(PathBuf, PathBuf, f64, f64)>>,
}

impl FakeToolkit {
    pub fn with_duration(default_duration: f64) -> Self {
        Self {
            default_duration,
            durations: HashMap::new(),
            fail_trim: false,
            trims: Mutex::new(Vec::new()),
        }
    }

    pub fn duration_for(mut self, path: impl Into<PathBuf>, seconds: f64) -> Self {
        self.durations.insert(path.into(), seconds);
        self
    }

    pub fn failing_trims(mut self) -> Self {
        self.fail_trim = true;
        self
    }

    pub fn trims(&self) -> Vec<(PathBuf, PathBuf, f64, f64)> {
        self.trims.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        if let Some(d) = self.durations.get(path) {
            return Ok(*d);
        }
        // Derivatives written by `trim_range` record their own duration.
        if let Ok(text) = tokio::fs::read_to_string(path).await {
            if let Some(d) = text.strip_prefix("trimmed:").and_then(|s| s.trim().parse().ok()) {
                return Ok(d);
            }
        }
        Ok(self.default_duration)
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

    async fn trim_range(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: f64,
    ) -> MediaResult<()> {
        self.trims.lock().unwrap().push((
            input.to_path_buf(),
            output.to_path_buf(),
            start,
            duration,
        ));
        if self.fail_trim {
            return Err(MediaError::ffmpeg_failed("trim refused", None, Some(1)));
        }
        tokio::fs::write(output, format!("trimmed:{duration}")).await?;
        Ok(())
    }
}
