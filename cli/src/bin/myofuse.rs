use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use cli::queue::{run_batch, JobQueue};
use color_eyre::eyre::{eyre, Result};
use segmentation::{ChannelColor, Pipeline, PipelineConfig};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Count nuclei in muscle culture images, classify them as in- or out-of-fiber and compute the fusion index", long_about = None)]
struct Cli {
    /// Images to process.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// TOML or JSON pipeline configuration; individual flags below
    /// override values from the file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving one `<stem>.json` result per image.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Channel holding the nucleus marker (red, green or blue).
    #[arg(long, value_parser = parse_channel)]
    nuclei_channel: Option<ChannelColor>,

    /// Channel holding the fiber marker (red, green or blue).
    #[arg(long, value_parser = parse_channel)]
    fiber_channel: Option<ChannelColor>,

    /// Smoothed intensity above which a pixel can be fiber.
    #[arg(long)]
    min_fiber_intensity: Option<u8>,

    /// Smoothed intensity at and above which a pixel is not fiber.
    #[arg(long)]
    max_fiber_intensity: Option<u8>,

    /// Nuclei dimmer than this on average are discarded.
    #[arg(long)]
    min_nucleus_intensity: Option<u8>,

    /// Nuclei brighter than this on average are discarded.
    #[arg(long)]
    max_nucleus_intensity: Option<u8>,

    /// Minimum nucleus diameter in pixels.
    #[arg(long)]
    min_nucleus_diameter: Option<u32>,

    /// Fibers with fewer positive nuclei than this lose them all.
    #[arg(long)]
    min_nuclei_per_fiber: Option<u32>,

    /// Fraction of a nucleus that must overlap a fiber to count as
    /// fiber-resident.
    #[arg(long)]
    overlap_threshold: Option<f64>,
}

fn parse_channel(value: &str) -> Result<ChannelColor, String> {
    ChannelColor::from_str(value)
        .map_err(|_| format!("unknown channel color '{value}', expected red, green or blue"))
}

fn apply_overrides(mut config: PipelineConfig, cli: &Cli) -> PipelineConfig {
    if let Some(channel) = cli.nuclei_channel {
        config.nuclei_channel = channel;
    }
    if let Some(channel) = cli.fiber_channel {
        config.fiber_channel = channel;
    }
    if let Some(v) = cli.min_fiber_intensity {
        config.min_fiber_intensity = v;
    }
    if let Some(v) = cli.max_fiber_intensity {
        config.max_fiber_intensity = v;
    }
    if let Some(v) = cli.min_nucleus_intensity {
        config.min_nucleus_intensity = v;
    }
    if let Some(v) = cli.max_nucleus_intensity {
        config.max_nucleus_intensity = v;
    }
    if let Some(v) = cli.min_nucleus_diameter {
        config.min_nucleus_diameter = v;
    }
    if let Some(v) = cli.min_nuclei_per_fiber {
        config.min_nuclei_per_fiber = v;
    }
    if let Some(v) = cli.overlap_threshold {
        config.overlap_threshold = v;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => cli::load_config(path)?,
        None => PipelineConfig::default(),
    };
    let config = apply_overrides(config, &cli);

    let pipeline = Arc::new(Pipeline::builder().config(config).build()?);

    if let Some(dir) = &cli.output {
        std::fs::create_dir_all(dir)?;
    }

    info!(images = cli.images.len(), jobs = cli.jobs, "starting batch");
    let queue = Arc::new(JobQueue::new(cli.images.clone()));

    {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("cancellation requested, finishing in-flight images");
                queue.cancel();
            }
        });
    }

    let jobs = cli.jobs.max(1);
    let output = cli.output.clone();
    let report = tokio::task::spawn_blocking({
        let queue = Arc::clone(&queue);
        move || run_batch(&queue, &pipeline, jobs, output.as_deref())
    })
    .await?;

    info!(
        processed = report.processed,
        failed = report.failed,
        skipped = report.skipped,
        "batch finished"
    );

    if report.failed > 0 {
        return Err(eyre!("{} image(s) failed", report.failed));
    }
    Ok(())
}
