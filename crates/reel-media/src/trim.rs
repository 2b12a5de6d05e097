//! Lossless range cuts.

use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Copy `[start, start + duration)` of `input` into `output` without re-encoding.
///
/// Cuts land on the nearest preceding keyframe, so the derivative can run a
/// few frames longer than requested.
pub async fn trim_range(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start: f64,
    duration: f64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    if !(start.is_finite() && duration.is_finite()) || start < 0.0 || duration <= 0.0 {
        return Err(MediaError::invalid_range(format!(
            "start={start:.3} duration={duration:.3}"
        )));
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await?;
    }

    info!(
        "Trimming {} [{:.3}s +{:.3}s] -> {}",
        input.display(),
        start,
        duration,
        output.display()
    );

    let cmd = FfmpegCommand::new(input, output)
        .seek(start)
        .read_duration(duration)
        .stream_copy();

    FfmpegRunner::new().with_timeout(300).run(&cmd).await?;

    let written = fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
    if written == 0 {
        return Err(MediaError::ffmpeg_failed("trim produced an empty file", None, None));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_trim_rejects_bad_range() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.mp4");
        fs::write(&input, b"not really video").await.unwrap();

        let err = trim_range(&input, dir.path().join("out.mp4"), 2.0, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidRange(_)));

        let err = trim_range(&input, dir.path().join("out.mp4"), -1.0, 3.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidRange(_)));
    }

    #[tokio::test]
    async fn test_trim_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = trim_range(dir.path().join("nope.mp4"), dir.path().join("o.mp4"), 0.0, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
