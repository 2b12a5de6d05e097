//! Render orchestration.
//!
//! A trigger records the request as QUEUED and returns at once; a background
//! task drives it through the external render command, waits for the output
//! to be released, moves it into `renders/` and re-ingests it as footage.
//! Outcomes are only reported through the log channel and [`RenderStatus`].
//!
//! Every trigger gets its own [`RenderId`]. A project workspace holds at most
//! one unfinished render, since the renderer writes to a fixed file inside it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

use reel_compositor::Timeline;
use reel_media::{move_file, wait_for_release};
use reel_models::{AssetId, RenderId, RenderProject, RenderSchedule, RenderState, RenderStatus, WsMessage};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::index::ForensicsIndex;
use crate::log_channel::LogChannel;
use crate::logging::JobLogger;

pub const PROPS_FILE: &str = "render-props.json";
const WORKSPACE_OUTPUT: &str = "output.mp4";

/// Runs the external renderer for one schedule.
#[async_trait]
pub trait RenderExecutor: Send + Sync {
    async fn render(
        &self,
        props: &Path,
        output: &Path,
        schedule: &RenderSchedule,
        logger: &JobLogger,
    ) -> PipelineResult<()>;
}

/// Substitute `{props}`, `{output}`, `{width}`, `{height}` and `{fps}` in
/// each whitespace-separated word of `template`.
pub fn expand_command(template: &str, props: &Path, output: &Path, schedule: &RenderSchedule) -> Vec<String> {
    let props = props.to_string_lossy();
    let output = output.to_string_lossy();
    template
        .split_whitespace()
        .map(|word| {
            word.replace("{props}", &props)
                .replace("{output}", &output)
                .replace("{width}", &schedule.canvas_width.to_string())
                .replace("{height}", &schedule.canvas_height.to_string())
                .replace("{fps}", &schedule.frame_rate.to_string())
        })
        .collect()
}

/// Executor spawning the configured `RENDER_COMMAND`.
///
/// stdout and stderr are forwarded line by line to the render's observers.
#[derive(Debug, Clone)]
pub struct CommandRenderExecutor {
    template: Option<String>,
    timeout: Duration,
}

impl CommandRenderExecutor {
    pub fn new(template: Option<String>, timeout: Duration) -> Self {
        Self { template, timeout }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.render_command.clone(), config.render_timeout)
    }
}

fn forward_lines<R>(stream: R, logger: JobLogger) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !line.trim().is_empty() {
                logger.relay(&line);
            }
        }
    })
}

#[async_trait]
impl RenderExecutor for CommandRenderExecutor {
    async fn render(
        &self,
        props: &Path,
        output: &Path,
        schedule: &RenderSchedule,
        logger: &JobLogger,
    ) -> PipelineResult<()> {
        let template = self
            .template
            .as_deref()
            .ok_or_else(|| PipelineError::config_error("RENDER_COMMAND is not set"))?;
        let args = expand_command(template, props, output, schedule);
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| PipelineError::config_error("RENDER_COMMAND is empty"))?;

        debug!("Running render command: {}", args.join(" "));
        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::render_failed(format!("could not start {program}: {e}")))?;

        let readers: Vec<JoinHandle<()>> = [
            child.stdout.take().map(|s| forward_lines(s, logger.clone())),
            child.stderr.take().map(|s| forward_lines(s, logger.clone())),
        ]
        .into_iter()
        .flatten()
        .collect();

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(PipelineError::render_failed(format!(
                    "render timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };
        for reader in readers {
            let _ = reader.await;
        }

        if status.success() {
            Ok(())
        } else {
            Err(PipelineError::render_failed(match status.code() {
                Some(code) => format!("render command exited with status {code}"),
                None => "render command was terminated by a signal".to_string(),
            }))
        }
    }
}

#[derive(Serialize)]
struct RenderProps<'a> {
    schedule: &'a RenderSchedule,
}

/// A triggered render.
pub struct RenderTicket {
    pub render_id: RenderId,
    /// Background task driving the render; dropping it detaches the task
    pub task: JoinHandle<()>,
}

/// Status of one render and the workspace it runs in.
#[derive(Debug, Clone)]
struct TrackedRender {
    project_id: RenderId,
    status: RenderStatus,
}

#[derive(Clone)]
pub struct RenderOrchestrator {
    renders: Arc<RwLock<HashMap<RenderId, TrackedRender>>>,
    index: Arc<ForensicsIndex>,
    executor: Arc<dyn RenderExecutor>,
    log: LogChannel,
    config: PipelineConfig,
}

impl RenderOrchestrator {
    pub fn new(
        index: Arc<ForensicsIndex>,
        executor: Arc<dyn RenderExecutor>,
        log: LogChannel,
        config: PipelineConfig,
    ) -> Self {
        Self {
            renders: Arc::new(RwLock::new(HashMap::new())),
            index,
            executor,
            log,
            config,
        }
    }

    pub async fn status(&self, id: &RenderId) -> PipelineResult<RenderStatus> {
        self.renders
            .read()
            .await
            .get(id)
            .map(|r| r.status.clone())
            .ok_or_else(|| PipelineError::RenderNotFound(id.to_string()))
    }

    /// Number of renders whose status is still held.
    pub async fn tracked(&self) -> usize {
        self.renders.read().await.len()
    }

    /// Queue a render of `schedule` in `project`'s workspace.
    ///
    /// Fails with [`PipelineError::RenderInProgress`] while an earlier render
    /// of the same project is queued or running.
    pub async fn trigger(
        &self,
        schedule: RenderSchedule,
        project: RenderProject,
    ) -> PipelineResult<RenderTicket> {
        let id = RenderId::new();
        {
            let mut renders = self.renders.write().await;
            if let Some((active, _)) = renders
                .iter()
                .find(|(_, r)| r.project_id == project.id && !r.status.state.is_terminal())
            {
                return Err(PipelineError::RenderInProgress {
                    project: project.id.to_string(),
                    render: active.to_string(),
                });
            }
            renders.insert(
                id.clone(),
                TrackedRender {
                    project_id: project.id.clone(),
                    status: RenderStatus::queued(id.clone()),
                },
            );
        }
        self.log.publish(WsMessage::render_state(id.clone(), RenderState::Queued));
        info!(render_id = %id, project_id = %project.id, "Render queued");

        let this = self.clone();
        let render_id = id.clone();
        let span = tracing::info_span!("render", render_id = %id);
        let task = tokio::spawn(
            async move {
                this.run(render_id, schedule, project).await;
            }
            .instrument(span),
        );

        Ok(RenderTicket { render_id: id, task })
    }

    /// Drop finished renders of workspaces that no longer exist.
    ///
    /// Queued or running renders are kept. Returns the number dropped.
    pub async fn forget_projects(&self, projects: &[RenderId]) -> usize {
        let mut renders = self.renders.write().await;
        let before = renders.len();
        renders.retain(|_, r| !(r.status.state.is_terminal() && projects.contains(&r.project_id)));
        before - renders.len()
    }

    async fn run(&self, id: RenderId, schedule: RenderSchedule, project: RenderProject) {
        let logger = JobLogger::new(id.to_string(), "render").with_channel(self.log.clone());

        if let Err(e) = self.transition(&id, RenderState::Running, None, None).await {
            warn!(render_id = %id, "Render could not start: {}", e);
            return;
        }
        logger.log_start(&format!(
            "rendering {} frames at {}x{}",
            schedule.total_duration_frames, schedule.canvas_width, schedule.canvas_height
        ));

        match self.execute(&id, &schedule, &project, &logger).await {
            Ok(asset_id) => {
                logger.log_completion(&format!("render ingested as asset {}", asset_id));
                if let Err(e) = self
                    .transition(&id, RenderState::Succeeded, Some(asset_id.clone()), None)
                    .await
                {
                    error!(render_id = %id, "Could not record render success: {}", e);
                }
                self.log.publish(WsMessage::done(id, asset_id));
            }
            Err(e) => {
                logger.log_error(&format!("render failed: {}", e));
                if let Err(te) = self
                    .transition(&id, RenderState::Failed, None, Some(e.to_string()))
                    .await
                {
                    error!(render_id = %id, "Could not record render failure: {}", te);
                }
            }
        }
    }

    async fn execute(
        &self,
        id: &RenderId,
        schedule: &RenderSchedule,
        project: &RenderProject,
        logger: &JobLogger,
    ) -> PipelineResult<AssetId> {
        Timeline::new(schedule.clone())?;

        let props = project.root.join(PROPS_FILE);
        tokio::fs::write(&props, serde_json::to_vec_pretty(&RenderProps { schedule })?).await?;

        let output = project.root.join(WORKSPACE_OUTPUT);
        self.executor.render(&props, &output, schedule, logger).await?;

        wait_for_release(
            &output,
            self.config.release_poll_interval,
            self.config.release_max_wait,
        )
        .await?;

        let destination = self.output_path(id);
        move_file(&output, &destination).await?;
        logger.log_progress(&format!("output moved to {}", destination.display()));

        let report = self.index.ingest(&destination).await?;
        Ok(report.asset.id)
    }

    /// Library location of a finished render.
    pub fn output_path(&self, id: &RenderId) -> PathBuf {
        self.config.renders_dir().join(format!("video-{}.mp4", id))
    }

    async fn transition(
        &self,
        id: &RenderId,
        next: RenderState,
        asset: Option<AssetId>,
        error: Option<String>,
    ) -> PipelineResult<()> {
        {
            let mut renders = self.renders.write().await;
            let status = &mut renders
                .get_mut(id)
                .ok_or_else(|| PipelineError::RenderNotFound(id.to_string()))?
                .status;
            if !status.state.can_transition_to(next) {
                return Err(PipelineError::invalid_input(format!(
                    "illegal render transition {} -> {}",
                    status.state, next
                )));
            }
            status.state = next;
            status.output_asset_id = asset;
            status.error = error;
            status.updated_at = Utc::now();
        }
        self.log.publish(WsMessage::render_state(id.clone(), next));
        Ok(())
    }
}
