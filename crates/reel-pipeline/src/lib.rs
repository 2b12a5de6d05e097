//! Reelforge orchestration.
//!
//! This crate provides:
//! - The footage forensics index (ingest, search, library scan)
//! - Trend snapshot caching
//! - Shot plan generation and schedule compilation
//! - Render workspaces, their sweeper, and the render orchestrator
//! - The log channel every stage reports progress on

pub mod compiler;
pub mod config;
pub mod error;
pub mod index;
pub mod insights;
pub mod log_channel;
pub mod logging;
pub mod planner;
pub mod render;
pub mod retry;
pub mod trends;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use compiler::{CompileRequest, ScheduleCompiler, VoiceTrack};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use index::{ForensicsIndex, IngestReport, ScanReport};
pub use insights::FootageInsights;
pub use log_channel::LogChannel;
pub use logging::JobLogger;
pub use planner::PlanGenerator;
pub use render::{CommandRenderExecutor, RenderExecutor, RenderOrchestrator, RenderTicket};
pub use trends::{research_trends, TrendCache};
pub use workspace::{WorkspaceManager, WorkspaceSweeper};
