//! The transcoding seam used by ingestion and schedule compilation.

use async_trait::async_trait;
use std::path::Path;

use crate::error::MediaResult;
use crate::{frames, probe, trim};

/// Out-of-process media operations.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;

    /// Write one still frame taken at `at_seconds`.
    async fn extract_frame(
        &self,
        video: &Path,
        at_seconds: f64,
        output: &Path,
        width: u32,
        height: u32,
    ) -> MediaResult<()>;

    /// Cut `[start, start + duration)` into a new file without re-encoding.
    async fn trim_range(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: f64,
    ) -> MediaResult<()>;
}

/// [`MediaToolkit`] backed by the ffmpeg/ffprobe binaries on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegToolkit;

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        probe::probe_duration(path).await
    }

    async fn extract_frame(
        &self,
        video: &Path,
        at_seconds: f64,
        output: &Path,
        width: u32,
        height: u32,
    ) -> MediaResult<()> {
        frames::extract_frame(video, at_seconds, output, width, height).await
    }

    async fn trim_range(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: f64,
    ) -> MediaResult<()> {
        trim::trim_range(input, output, start, duration).await
    }
}
