//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Number of stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for a single-input, single-output FFmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed before `-i`
    pre_input: Vec<String>,
    /// Arguments placed between `-i` and the output path
    post_input: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            pre_input: Vec::new(),
            post_input: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    pub fn pre_input<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_input.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn post_input<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_input.extend(args.into_iter().map(Into::into));
        self
    }

    /// Input-side seek (fast, keyframe aligned when stream copying).
    pub fn seek(self, seconds: f64) -> Self {
        self.pre_input(["-ss".to_string(), format!("{:.3}", seconds)])
    }

    /// Limit how much of the input is read.
    pub fn read_duration(self, seconds: f64) -> Self {
        self.pre_input(["-t".to_string(), format!("{:.3}", seconds)])
    }

    /// Scale to an exact frame size.
    pub fn scale(self, width: u32, height: u32) -> Self {
        self.post_input(["-vf".to_string(), format!("scale={width}:{height}")])
    }

    /// Emit exactly one frame.
    pub fn single_frame(self) -> Self {
        self.post_input(["-frames:v", "1"])
    }

    /// JPEG quality (2 = best, 31 = worst).
    pub fn jpeg_quality(self, q: u8) -> Self {
        self.post_input(["-q:v".to_string(), q.clamp(2, 31).to_string()])
    }

    /// Copy every stream without re-encoding.
    pub fn stream_copy(self) -> Self {
        self.post_input(["-c", "copy", "-avoid_negative_ts", "make_zero"])
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument list, always overwriting the output.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.clone()];
        args.extend(self.pre_input.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.post_input.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Runs [`FfmpegCommand`]s with an optional timeout.
#[derive(Debug, Default, Clone)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("stderr was not captured", None, None))?;
        let reader_task = tokio::spawn(stderr_tail(stderr));

        let outcome = self.wait_for_exit(&mut child).await;
        let stderr_tail = reader_task.await.unwrap_or_default();

        match outcome {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr_tail.is_empty()).then_some(stderr_tail),
                status.code(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn wait_for_exit(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        let Some(secs) = self.timeout_secs else {
            return Ok(child.wait().await?);
        };
        match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!("FFmpeg timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(secs))
            }
        }
    }
}

/// Last [`STDERR_TAIL_LINES`] non-empty lines of `stream`, newline joined.
async fn stderr_tail<R>(stream: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into_iter().collect::<Vec<_>>().join("\n")
}

pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossless_cut_args() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .seek(4.5)
            .read_duration(5.0)
            .stream_copy();
        let args = cmd.build_args();

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input, "seek must precede the input");
        assert_eq!(args[ss + 1], "4.500");
        assert!(args.contains(&"copy".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
        assert_eq!(args[0], "-y");
    }

    #[test]
    fn test_frame_grab_args() {
        let args = FfmpegCommand::new("in.mp4", "frame.jpg")
            .seek(2.0)
            .scale(640, 360)
            .single_frame()
            .jpeg_quality(1)
            .build_args();
        assert!(args.contains(&"scale=640:360".to_string()));
        assert!(args.contains(&"-frames:v".to_string()));
        // clamped to the valid JPEG range
        assert!(args.contains(&"2".to_string()));
    }

    #[test]
    fn test_args_start_with_overwrite_and_log_level() {
        let args = FfmpegCommand::new("in.mp4", "out.mp4").log_level("warning").build_args();
        assert_eq!(&args[..4], &["-y", "-v", "warning", "-i"]);
        assert!(!args.iter().any(|a| a == "-progress"));
    }

    #[tokio::test]
    async fn test_stderr_tail_keeps_last_lines() {
        let text: String = (0..25).map(|i| format!("line {i}\n\n")).collect();
        let tail = stderr_tail(text.as_bytes()).await;
        let lines: Vec<&str> = tail.lines().collect();
        assert_eq!(lines.len(), STDERR_TAIL_LINES);
        assert_eq!(lines[0], "line 5");
        assert_eq!(lines[STDERR_TAIL_LINES - 1], "line 24");
    }
}
