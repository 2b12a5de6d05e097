//! Footage forensics index.
//!
//! Ingestion samples one low-resolution frame per interval, asks the vision
//! service for tags and stores each answer as a time-windowed segment.
//! Segments of one file are produced strictly in order; distinct files may be
//! ingested concurrently up to the configured limit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use reel_media::{hash_file, MediaError, MediaToolkit};
use reel_ml_client::{extract_validated_json, TaskContract, VisionTagger};
use reel_models::{AssetId, FootageAsset, ForensicSegment, FrameTags, SegmentHit};
use reel_store::{DbPool, FootageRepo, NewAsset, NewSegment};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::log_channel::LogChannel;
use crate::logging::JobLogger;

/// Container extensions picked up by a library scan.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

const FRAME_TAG_PROMPT: &str = "You are a footage logger. Describe this video frame for an editor \
searching a stock library. Respond with ONE JSON object and nothing else, exactly this shape: \
{\"description\": \"one factual sentence\", \"emotions\": [\"mood words\"], \
\"objects\": [\"visible things\"], \"audioTags\": [\"likely sounds\"]}. \
No markdown, no commentary. Start with '{'.";

/// Outcome of ingesting one file.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub asset: FootageAsset,
    pub segments_added: usize,
    /// Intervals whose frame could not be extracted or tagged
    pub intervals_skipped: usize,
    /// The file was already indexed; nothing was re-tagged
    pub already_indexed: bool,
}

impl IngestReport {
    fn existing(asset: FootageAsset) -> Self {
        Self {
            asset,
            segments_added: 0,
            intervals_skipped: 0,
            already_indexed: true,
        }
    }
}

/// Outcome of a directory scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub ingested: Vec<FootageAsset>,
    pub already_indexed: usize,
    /// `(file name, error)` for files that could not be ingested
    pub failed: Vec<(String, String)>,
}

/// Start times of the sampling windows of a file of `duration` seconds.
pub fn sample_times(duration: f64, interval: f64) -> impl Iterator<Item = (f64, f64)> {
    let count = if duration > 0.0 && interval > 0.0 {
        (duration / interval).ceil() as usize
    } else {
        0
    };
    (0..count)
        .map(move |i| i as f64 * interval)
        .filter(move |start| *start < duration)
        .map(move |start| (start, (start + interval).min(duration)))
}

pub struct ForensicsIndex {
    pool: DbPool,
    media: Arc<dyn MediaToolkit>,
    tagger: Arc<dyn VisionTagger>,
    log: LogChannel,
    config: PipelineConfig,
    ingest_slots: Semaphore,
}

impl ForensicsIndex {
    pub fn new(
        pool: DbPool,
        media: Arc<dyn MediaToolkit>,
        tagger: Arc<dyn VisionTagger>,
        log: LogChannel,
        config: PipelineConfig,
    ) -> Self {
        let slots = config.max_ingest_parallel.max(1);
        Self {
            pool,
            media,
            tagger,
            log,
            config,
            ingest_slots: Semaphore::new(slots),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    async fn find_existing(
        &self,
        content_hash: &str,
        location: &str,
    ) -> PipelineResult<Option<FootageAsset>> {
        if let Some(asset) = FootageRepo::find_by_hash(&self.pool, content_hash).await? {
            return Ok(Some(asset));
        }
        Ok(FootageRepo::find_by_location(&self.pool, location).await?)
    }

    /// Index one video file.
    ///
    /// A file whose content hash or location is already recorded returns the
    /// existing asset untouched.
    pub async fn ingest(&self, path: &Path) -> PipelineResult<IngestReport> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(path.to_path_buf()).into());
        }
        let path = tokio::fs::canonicalize(path).await?;
        let location = path.to_string_lossy().to_string();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| location.clone());

        let _permit = self
            .ingest_slots
            .acquire()
            .await
            .map_err(|_| PipelineError::config_error("ingest semaphore closed"))?;

        let logger = JobLogger::new(filename.clone(), "ingest").with_channel(self.log.clone());

        let content_hash = hash_file(&path).await?;
        if let Some(asset) = self.find_existing(&content_hash, &location).await? {
            logger.log_progress(&format!("{} already ingested, skipping", filename));
            return Ok(IngestReport::existing(asset));
        }

        logger.log_start(&format!("ingesting {}", filename));
        let duration = self.media.probe_duration(&path).await?;
        let inserted = FootageRepo::insert_asset(
            &self.pool,
            &NewAsset {
                origin_filename: filename.clone(),
                location: location.clone(),
                duration_seconds: duration,
                content_hash: content_hash.clone(),
            },
        )
        .await;
        let asset = match inserted {
            Ok(asset) => asset,
            // Another ingest of the same content won the insert.
            Err(e) if e.is_duplicate() => {
                let asset = self
                    .find_existing(&content_hash, &location)
                    .await?
                    .ok_or_else(|| PipelineError::from(e))?;
                logger.log_progress(&format!("{} already ingested, skipping", filename));
                return Ok(IngestReport::existing(asset));
            }
            Err(e) => return Err(e.into()),
        };

        tokio::fs::create_dir_all(self.config.frames_dir()).await?;

        let interval = self.config.frame_interval_seconds;
        let windows: Vec<(f64, f64)> = sample_times(duration, interval).collect();
        let total = windows.len();
        let mut added = 0;
        let mut skipped = 0;

        for (i, (start, end)) in windows.into_iter().enumerate() {
            let frame = self
                .config
                .frames_dir()
                .join(format!("{}_{}.jpg", asset.id, i));

            let tagged = self.tag_frame(&path, start, &frame).await;
            if let Err(e) = tokio::fs::remove_file(&frame).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(frame = %frame.display(), "Could not remove sampled frame: {}", e);
                }
            }

            match tagged {
                Ok(tags) => {
                    FootageRepo::insert_segment(
                        &self.pool,
                        &asset.id,
                        &NewSegment {
                            start_time: start,
                            end_time: end,
                            description: tags.description,
                            emotion_tags: tags.emotions,
                            object_tags: tags.objects,
                            audio_tags: tags.audio_tags,
                        },
                    )
                    .await?;
                    added += 1;
                    logger.log_progress(&format!(
                        "{} {}/{} tagged at {:.1}s",
                        filename,
                        i + 1,
                        total,
                        start
                    ));
                }
                Err(reason) => {
                    skipped += 1;
                    logger.log_warning(&format!(
                        "{} interval {:.1}-{:.1}s skipped: {}",
                        filename, start, end, reason
                    ));
                }
            }
        }

        logger.log_completion(&format!(
            "{} indexed: {} segments, {} skipped",
            filename, added, skipped
        ));
        info!(asset_id = %asset.id, segments = added, skipped, "Footage ingested");

        Ok(IngestReport {
            asset,
            segments_added: added,
            intervals_skipped: skipped,
            already_indexed: false,
        })
    }

    async fn tag_frame(&self, video: &Path, at: f64, frame: &Path) -> Result<FrameTags, String> {
        self.media
            .extract_frame(
                video,
                at,
                frame,
                self.config.frame_width,
                self.config.frame_height,
            )
            .await
            .map_err(|e| format!("frame extraction failed: {e}"))?;

        let raw = self
            .tagger
            .describe_image(frame, FRAME_TAG_PROMPT)
            .await
            .map_err(|e| format!("vision service failed: {e}"))?;

        let value = extract_validated_json(&raw, TaskContract::ForensicTags).map_err(|e| e.to_string())?;
        let tags: FrameTags =
            serde_json::from_value(value).map_err(|e| format!("unexpected tag shape: {e}"))?;
        if tags.description.trim().is_empty() {
            return Err("empty description".to_string());
        }
        Ok(tags)
    }

    /// Ingest every video in `dir` that is not indexed yet.
    pub async fn ingest_directory(&self, dir: &Path) -> PipelineResult<ScanReport> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_video = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_video && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();

        info!(dir = %dir.display(), files = files.len(), "Scanning footage directory");

        let results: Vec<(PathBuf, PipelineResult<IngestReport>)> = stream::iter(files)
            .map(|path| async move {
                let result = self.ingest(&path).await;
                (path, result)
            })
            .buffer_unordered(self.config.max_ingest_parallel.max(1))
            .collect()
            .await;

        let mut report = ScanReport::default();
        for (path, result) in results {
            match result {
                Ok(r) if r.already_indexed => report.already_indexed += 1,
                Ok(r) => report.ingested.push(r.asset),
                Err(e) => {
                    warn!(file = %path.display(), "Ingestion failed: {}", e);
                    self.log
                        .error(format!("Ingestion failed for {}: {}", path.display(), e));
                    report.failed.push((path.display().to_string(), e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Case-insensitive substring search over segment tags.
    pub async fn search(&self, query: &str) -> PipelineResult<Vec<SegmentHit>> {
        Ok(FootageRepo::search(&self.pool, query, self.config.search_limit).await?)
    }

    pub async fn list_assets(&self) -> PipelineResult<Vec<FootageAsset>> {
        Ok(FootageRepo::list(&self.pool).await?)
    }

    pub async fn get_asset(&self, id: &AssetId) -> PipelineResult<FootageAsset> {
        FootageRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| PipelineError::AssetNotFound(id.to_string()))
    }

    pub async fn segments_for_asset(&self, id: &AssetId) -> PipelineResult<Vec<ForensicSegment>> {
        self.get_asset(id).await?;
        Ok(FootageRepo::segments_for_asset(&self.pool, id).await?)
    }

    /// Delete the asset, its segments and the backing file.
    pub async fn delete_asset(&self, id: &AssetId) -> PipelineResult<FootageAsset> {
        let asset = FootageRepo::delete(&self.pool, id)
            .await?
            .ok_or_else(|| PipelineError::AssetNotFound(id.to_string()))?;

        match tokio::fs::remove_file(&asset.location).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(asset_id = %asset.id, "Backing file already gone: {}", asset.location);
            }
            Err(e) => return Err(e.into()),
        }

        info!(asset_id = %asset.id, file = %asset.origin_filename, "Footage deleted");
        self.log.log(format!("Deleted {}", asset.origin_filename));
        Ok(asset)
    }
}
