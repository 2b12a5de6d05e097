//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Library sub-directory holding raw footage.
pub const RAW_DIR: &str = "raw";
/// Per-render workspaces.
pub const WORKSPACES_DIR: &str = "workspaces";
/// Relocated render outputs.
pub const RENDERS_DIR: &str = "renders";
/// Ephemeral sampled frames.
pub const FRAMES_DIR: &str = "frames";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the footage tree (`raw/`, `workspaces/`, `renders/`)
    pub footage_root: PathBuf,
    /// SQLite connection string
    pub database_url: String,
    /// Seconds between sampled frames
    pub frame_interval_seconds: f64,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Maximum hits returned by a footage search
    pub search_limit: i64,
    /// Files ingested concurrently by a library scan
    pub max_ingest_parallel: usize,
    /// Workspaces older than this are deleted by the sweeper
    pub workspace_max_age: Duration,
    /// How often the sweeper runs
    pub sweep_interval: Duration,
    /// Trend snapshots older than this are refreshed
    pub trend_ttl: Duration,
    /// External render command template, `None` disables rendering
    pub render_command: Option<String>,
    pub render_timeout: Duration,
    /// Poll interval while waiting for the render output to be released
    pub release_poll_interval: Duration,
    pub release_max_wait: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            footage_root: PathBuf::from("./footage"),
            database_url: "sqlite://reelforge.db".to_string(),
            frame_interval_seconds: 2.0,
            frame_width: 640,
            frame_height: 360,
            search_limit: 20,
            max_ingest_parallel: 2,
            workspace_max_age: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(6 * 3600),
            trend_ttl: Duration::from_secs(24 * 3600),
            render_command: None,
            render_timeout: Duration::from_secs(1800),
            release_poll_interval: Duration::from_millis(100),
            release_max_wait: Duration::from_secs(10),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            footage_root: std::env::var("REEL_FOOTAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.footage_root),
            database_url: std::env::var("REEL_DATABASE_URL").unwrap_or(defaults.database_url),
            frame_interval_seconds: std::env::var("REEL_FRAME_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|v: &f64| *v > 0.0)
                .unwrap_or(defaults.frame_interval_seconds),
            frame_width: std::env::var("REEL_FRAME_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_width),
            frame_height: std::env::var("REEL_FRAME_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_height),
            search_limit: std::env::var("REEL_SEARCH_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.search_limit),
            max_ingest_parallel: std::env::var("REEL_MAX_INGEST_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.max_ingest_parallel),
            workspace_max_age: Duration::from_secs(
                std::env::var("REEL_WORKSPACE_MAX_AGE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(24 * 3600),
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("REEL_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(6 * 3600),
            ),
            trend_ttl: Duration::from_secs(
                std::env::var("REEL_TREND_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(24 * 3600),
            ),
            render_command: std::env::var("RENDER_COMMAND")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            render_timeout: Duration::from_secs(
                std::env::var("RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            release_poll_interval: defaults.release_poll_interval,
            release_max_wait: Duration::from_millis(
                std::env::var("RENDER_RELEASE_MAX_WAIT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10_000),
            ),
        }
    }

    /// Config rooted at `root`, everything else default.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            footage_root: root.into(),
            ..Self::default()
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.footage_root.join(RAW_DIR)
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.footage_root.join(WORKSPACES_DIR)
    }

    pub fn renders_dir(&self) -> PathBuf {
        self.footage_root.join(RENDERS_DIR)
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.footage_root.join(FRAMES_DIR)
    }

    /// Create the footage tree if missing.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.raw_dir(),
            self.workspaces_dir(),
            self.renders_dir(),
            self.frames_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Whether `path` lies inside the footage tree.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.footage_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.frame_interval_seconds, 2.0);
        assert_eq!((config.frame_width, config.frame_height), (640, 360));
        assert_eq!(config.search_limit, 20);
        assert_eq!(config.workspace_max_age, Duration::from_secs(86_400));
        assert_eq!(config.sweep_interval, Duration::from_secs(21_600));
    }

    #[tokio::test]
    async fn test_ensure_dirs_creates_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::with_root(tmp.path());
        config.ensure_dirs().await.unwrap();
        assert!(config.raw_dir().is_dir());
        assert!(config.workspaces_dir().is_dir());
        assert!(config.renders_dir().is_dir());
        assert!(config.frames_dir().is_dir());
        assert!(config.contains(&config.raw_dir().join("a.mp4")));
    }
}
