//! Application state.

use std::sync::Arc;

use reel_media::{FfmpegToolkit, MediaToolkit};
use reel_ml_client::{
    GeminiClient, MlClientConfig, TextGenerator, Transcriber, TranscriptionClient, VisionTagger,
};
use reel_pipeline::{
    CommandRenderExecutor, ForensicsIndex, LogChannel, PipelineConfig, PlanGenerator,
    RenderExecutor, RenderOrchestrator, ScheduleCompiler, TrendCache, WorkspaceManager,
    WorkspaceSweeper,
};
use reel_store::DbPool;

use crate::config::ApiConfig;

/// External seams the state is assembled from.
pub struct StateParts {
    pub config: ApiConfig,
    pub pipeline: PipelineConfig,
    pub pool: DbPool,
    pub generator: Arc<dyn TextGenerator>,
    pub tagger: Arc<dyn VisionTagger>,
    pub transcriber: Arc<dyn Transcriber>,
    pub media: Arc<dyn MediaToolkit>,
    pub executor: Arc<dyn RenderExecutor>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: PipelineConfig,
    pub log: LogChannel,
    pub index: Arc<ForensicsIndex>,
    pub planner: Arc<PlanGenerator>,
    pub compiler: Arc<ScheduleCompiler>,
    pub workspaces: Arc<WorkspaceManager>,
    pub renders: RenderOrchestrator,
    pub trends: Arc<TrendCache>,
    pub generator: Arc<dyn TextGenerator>,
    pub transcriber: Arc<dyn Transcriber>,
}

impl AppState {
    /// Create state backed by the real services.
    pub async fn new(config: ApiConfig, pipeline: PipelineConfig) -> anyhow::Result<Self> {
        pipeline.ensure_dirs().await?;
        let pool = reel_store::connect(&pipeline.database_url).await?;

        let ml = MlClientConfig::from_env();
        let gemini = Arc::new(GeminiClient::new(&ml)?);
        let transcriber = Arc::new(TranscriptionClient::new(&ml)?);
        let executor = Arc::new(CommandRenderExecutor::from_config(&pipeline));

        Ok(Self::from_parts(StateParts {
            config,
            pipeline,
            pool,
            generator: gemini.clone(),
            tagger: gemini,
            transcriber,
            media: Arc::new(FfmpegToolkit::new()),
            executor,
        }))
    }

    pub fn from_parts(parts: StateParts) -> Self {
        let log = LogChannel::default();
        let index = Arc::new(ForensicsIndex::new(
            parts.pool.clone(),
            parts.media.clone(),
            parts.tagger,
            log.clone(),
            parts.pipeline.clone(),
        ));
        let compiler = ScheduleCompiler::new(
            parts.generator.clone(),
            parts.media,
            parts.pipeline.clone(),
            log.clone(),
        );
        let renders = RenderOrchestrator::new(
            index.clone(),
            parts.executor,
            log.clone(),
            parts.pipeline.clone(),
        );

        Self {
            workspaces: Arc::new(WorkspaceManager::new(parts.pipeline.workspaces_dir())),
            trends: Arc::new(TrendCache::new(parts.pool, parts.pipeline.trend_ttl)),
            planner: Arc::new(PlanGenerator::new(parts.generator.clone())),
            compiler: Arc::new(compiler),
            generator: parts.generator,
            transcriber: parts.transcriber,
            config: parts.config,
            pipeline: parts.pipeline,
            log,
            index,
            renders,
        }
    }

    /// Sweeper over this state's render workspaces; the caller starts it.
    pub fn workspace_sweeper(&self) -> WorkspaceSweeper {
        WorkspaceSweeper::new(
            self.workspaces.clone(),
            self.pipeline.sweep_interval,
            self.pipeline.workspace_max_age,
        )
        .with_renders(self.renders.clone())
    }
}
