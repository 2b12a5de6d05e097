//! Shared data models for the Reelforge backend.
//!
//! This crate provides Serde-serializable types for:
//! - Footage assets and their forensic segments
//! - Shot plans produced by the planning stage
//! - Render schedules consumed by the compositor and render executor
//! - Render lifecycle and log-stream message schemas

pub mod footage;
pub mod plan;
pub mod render;
pub mod schedule;
pub mod ws;

pub use footage::{AssetId, FootageAsset, ForensicSegment, FrameTags, SegmentHit, TrendSnapshot};
pub use plan::{
    estimate_duration_seconds, AudioAnalysis, CueWord, EmotionMark, GlobalStyle, PlanSegment,
    ScriptAnalysis, ShotPlan, TimeRange, TimeRangeError, WORDS_PER_SECOND,
};
pub use render::{RenderId, RenderProject, RenderState, RenderStatus};
pub use schedule::{
    AudioClip, ClipEffect, GlobalStyleFlags, RenderSchedule, ScheduleViolation, TextAnimation,
    TextClip, TextStyle, Tracks, TransitionKind, VideoClip, DEFAULT_CANVAS_HEIGHT,
    DEFAULT_CANVAS_WIDTH, DEFAULT_FRAME_RATE, PLACEHOLDER_SOURCE,
};
pub use ws::{WsMessage, WsMessageType};
