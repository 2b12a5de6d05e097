//! Still-frame extraction.

use std::path::Path;
use tokio::fs;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Grab one JPEG frame at `at_seconds`, scaled to `width`x`height`.
pub async fn extract_frame(
    video: impl AsRef<Path>,
    at_seconds: f64,
    output: impl AsRef<Path>,
    width: u32,
    height: u32,
) -> MediaResult<()> {
    let video = video.as_ref();
    let output = output.as_ref();

    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await?;
    }

    let cmd = FfmpegCommand::new(video, output)
        .seek(at_seconds.max(0.0))
        .scale(width, height)
        .single_frame()
        .jpeg_quality(4);

    FfmpegRunner::new().with_timeout(60).run(&cmd).await?;

    // Seeking past the last keyframe exits cleanly without writing anything.
    if !output.exists() {
        return Err(MediaError::ffmpeg_failed(
            format!("no frame produced at {:.3}s", at_seconds),
            None,
            None,
        ));
    }
    Ok(())
}
