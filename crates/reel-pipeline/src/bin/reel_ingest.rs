//! Batch footage ingestion.
//!
//! ```text
//! reel-ingest ingest <file>   index one video
//! reel-ingest scan [dir]      index every new video in dir (default: raw/)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_media::{check_ffmpeg, check_ffprobe, FfmpegToolkit};
use reel_ml_client::{GeminiClient, MlClientConfig};
use reel_pipeline::{ForensicsIndex, LogChannel, PipelineConfig};

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reel=info,info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(false))
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("scan");

    let config = PipelineConfig::from_env();
    config
        .ensure_dirs()
        .await
        .with_context(|| format!("creating footage tree under {}", config.footage_root.display()))?;
    check_ffmpeg().context("ffmpeg is required")?;
    check_ffprobe().context("ffprobe is required")?;

    let pool = reel_store::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;
    let gemini = GeminiClient::new(&MlClientConfig::from_env()).context("vision service")?;
    let index = ForensicsIndex::new(
        pool,
        Arc::new(FfmpegToolkit::new()),
        Arc::new(gemini),
        LogChannel::default(),
        config.clone(),
    );

    match command {
        "ingest" => {
            let Some(file) = args.get(1) else {
                bail!("usage: reel-ingest ingest <file>");
            };
            let report = index.ingest(&PathBuf::from(file)).await?;
            if report.already_indexed {
                info!(asset_id = %report.asset.id, "Already indexed");
            } else {
                info!(
                    asset_id = %report.asset.id,
                    segments = report.segments_added,
                    skipped = report.intervals_skipped,
                    "Indexed {}",
                    report.asset.origin_filename
                );
            }
        }
        "scan" => {
            let dir = args.get(1).map(PathBuf::from).unwrap_or_else(|| config.raw_dir());
            let report = index.ingest_directory(&dir).await?;
            info!(
                ingested = report.ingested.len(),
                already_indexed = report.already_indexed,
                failed = report.failed.len(),
                "Scan of {} complete",
                dir.display()
            );
            for (file, reason) in &report.failed {
                tracing::warn!("{}: {}", file, reason);
            }
        }
        other => bail!("unknown command {other:?}; expected ingest or scan"),
    }

    Ok(())
}
