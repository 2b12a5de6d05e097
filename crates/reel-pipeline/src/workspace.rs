//! Per-render workspaces and their periodic cleanup.
//!
//! Each project gets `workspaces/<projectId>/` with an `assets/` directory for
//! trimmed derivatives and a `project.json` recording when it was created.
//! The sweeper deletes every workspace older than the configured age,
//! whether or not its render finished.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use reel_models::{RenderId, RenderProject};

use crate::error::{PipelineError, PipelineResult};
use crate::render::RenderOrchestrator;

const PROJECT_FILE: &str = "project.json";
const ASSETS_DIR: &str = "assets";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectFile {
    id: RenderId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn create(&self) -> PipelineResult<RenderProject> {
        self.create_at(Utc::now()).await
    }

    pub async fn create_at(&self, now: DateTime<Utc>) -> PipelineResult<RenderProject> {
        let id = RenderId::new();
        let root = self.root.join(id.as_str());
        let assets_dir = root.join(ASSETS_DIR);
        tokio::fs::create_dir_all(&assets_dir).await?;

        let file = ProjectFile {
            id: id.clone(),
            created_at: now,
        };
        tokio::fs::write(root.join(PROJECT_FILE), serde_json::to_vec_pretty(&file)?).await?;

        debug!(render_id = %id, "Created render workspace");
        Ok(RenderProject {
            id,
            created_at: now,
            root,
            assets_dir,
        })
    }

    /// Reopen an existing workspace.
    pub async fn open(&self, id: &RenderId) -> PipelineResult<RenderProject> {
        if !id.is_path_safe() {
            return Err(PipelineError::invalid_input(format!("invalid project id: {id}")));
        }
        let root = self.root.join(id.as_str());
        let bytes = match tokio::fs::read(root.join(PROJECT_FILE)).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::RenderNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let file: ProjectFile = serde_json::from_slice(&bytes)?;
        let assets_dir = root.join(ASSETS_DIR);
        tokio::fs::create_dir_all(&assets_dir).await?;
        Ok(RenderProject {
            id: file.id,
            created_at: file.created_at,
            root,
            assets_dir,
        })
    }

    async fn created_at(&self, dir: &Path) -> Option<DateTime<Utc>> {
        if let Ok(bytes) = tokio::fs::read(dir.join(PROJECT_FILE)).await {
            if let Ok(file) = serde_json::from_slice::<ProjectFile>(&bytes) {
                return Some(file.created_at);
            }
        }
        let modified = tokio::fs::metadata(dir).await.ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Delete every workspace created more than `max_age` before `now`.
    pub async fn sweep_older_than(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> PipelineResult<Vec<String>> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| PipelineError::config_error(format!("workspace age: {e}")))?;

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut removed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let dir = entry.path();
            let Some(created) = self.created_at(&dir).await else {
                continue;
            };
            if now - created > max_age {
                match tokio::fs::remove_dir_all(&dir).await {
                    Ok(()) => removed.push(entry.file_name().to_string_lossy().to_string()),
                    Err(e) => warn!(dir = %dir.display(), "Failed to remove workspace: {}", e),
                }
            }
        }
        Ok(removed)
    }
}

async fn sweep(
    manager: &WorkspaceManager,
    renders: Option<&RenderOrchestrator>,
    now: DateTime<Utc>,
    max_age: Duration,
) -> PipelineResult<usize> {
    let removed = manager.sweep_older_than(now, max_age).await?;
    if removed.is_empty() {
        return Ok(0);
    }
    info!(count = removed.len(), "Swept expired render workspaces");
    if let Some(renders) = renders {
        let ids: Vec<RenderId> = removed.iter().map(|name| RenderId::from(name.as_str())).collect();
        let forgotten = renders.forget_projects(&ids).await;
        let tracked = renders.tracked().await;
        debug!(
            count = forgotten,
            tracked = tracked,
            "Forgot finished renders of swept workspaces"
        );
    }
    Ok(removed.len())
}

/// Background task deleting expired workspaces.
pub struct WorkspaceSweeper {
    manager: Arc<WorkspaceManager>,
    renders: Option<RenderOrchestrator>,
    every: Duration,
    max_age: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkspaceSweeper {
    pub fn new(manager: Arc<WorkspaceManager>, every: Duration, max_age: Duration) -> Self {
        Self {
            manager,
            renders: None,
            every,
            max_age,
            handle: Mutex::new(None),
        }
    }

    /// Also forget finished render statuses of swept workspaces.
    pub fn with_renders(mut self, renders: RenderOrchestrator) -> Self {
        self.renders = Some(renders);
        self
    }

    /// One sweep at `now`; returns the number of workspaces deleted.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> PipelineResult<usize> {
        sweep(&self.manager, self.renders.as_ref(), now, self.max_age).await
    }

    /// Spawn the periodic loop. Calling `start` twice keeps the first loop.
    pub fn start(&self) {
        let mut handle = match self.handle.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        if handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return;
        }

        let manager = self.manager.clone();
        let renders = self.renders.clone();
        let every = self.every;
        let max_age = self.max_age;
        info!("Starting workspace sweeper (interval: {:?}, max age: {:?})", every, max_age);

        *handle = Some(tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = sweep(&manager, renders.as_ref(), Utc::now(), max_age).await {
                    error!("Workspace sweep failed: {}", e);
                }
            }
        }));
    }

    pub fn stop(&self) {
        let mut handle = match self.handle.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(h) = handle.take() {
            h.abort();
            info!("Workspace sweeper stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        match self.handle.lock() {
            Ok(h) => h.as_ref().map(|h| !h.is_finished()).unwrap_or(false),
            Err(_) => false,
        }
    }
}

impl Drop for WorkspaceSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
