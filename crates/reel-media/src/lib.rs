//! FFmpeg CLI wrapper for footage sampling and trimming.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner with a timeout and a stderr tail for diagnostics
//! - Duration probing via ffprobe
//! - Still-frame extraction and lossless range cuts
//! - Cross-device moves, content hashing and handle-release polling
//! - The [`MediaToolkit`] seam used by the pipeline

pub mod command;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod probe;
pub mod toolkit;
pub mod trim;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::extract_frame;
pub use fs_utils::{hash_file, move_file, wait_for_release};
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
pub use trim::trim_range;
