use anyhow::Result;
use clap::Parser;
use dialogue_seams::batch::{process_files_parallel, write_run_stats, BatchConfig};
use dialogue_seams::discovery::{collect_discovered_files, DiscoveryConfig};
use dialogue_seams::{DedupMode, SegmentationConfig, Segmenter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "dialogue-seams")]
#[command(about = "Reconcile scene dialogue maps with prose and write narrator/dialogue segments")]
#[command(version)]
struct Args {
    /// Root directory to scan for *.scene.json files
    root_dir: PathBuf,

    /// TOML file with segmentation thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Narrator de-duplication policy
    #[arg(long, value_enum)]
    dedup_mode: Option<DedupMode>,

    /// Maximum tolerated ratio of dropped spans per scene (0.0 - 1.0)
    #[arg(long)]
    failure_threshold: Option<f64>,

    /// Drop unlocatable spans instead of keeping them as synthetic dialogue
    #[arg(long)]
    strict: bool,

    /// Overwrite existing segments files
    #[arg(long)]
    overwrite_all: bool,

    /// Abort on first error
    #[arg(long)]
    fail_fast: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,
}

impl Args {
    fn segmentation_config(&self) -> Result<SegmentationConfig> {
        let mut config = match &self.config {
            Some(path) => SegmentationConfig::load(path)?,
            None => SegmentationConfig::default(),
        };
        if let Some(mode) = self.dedup_mode {
            config.dedup_mode = mode;
        }
        if let Some(threshold) = self.failure_threshold {
            config.failure_rate_threshold = threshold;
        }
        if self.strict {
            config.synthetic_fallback = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .json()
        .init();

    let args = Args::parse();

    info!("Starting dialogue-seams");
    info!(?args, "Parsed CLI arguments");

    if !args.root_dir.exists() {
        anyhow::bail!("Root directory does not exist: {}", args.root_dir.display());
    }
    if !args.root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", args.root_dir.display());
    }

    let segmenter = Arc::new(Segmenter::new(args.segmentation_config()?)?);
    info!(config = ?segmenter.config(), "Segmentation config loaded");

    let discovered = collect_discovered_files(
        &args.root_dir,
        DiscoveryConfig {
            fail_fast: args.fail_fast,
        },
    )
    .await?;

    let (valid, invalid): (Vec<_>, Vec<_>) = discovered.into_iter().partition(|f| f.error.is_none());
    for file in &invalid {
        if let Some(ref error) = file.error {
            warn!("Issue with {}: {}", file.path.display(), error);
        }
    }

    let batch_config = BatchConfig {
        fail_fast: args.fail_fast,
        overwrite_all: args.overwrite_all,
        show_progress: !args.no_progress,
        ..BatchConfig::default()
    };
    let paths = valid.into_iter().map(|f| f.path).collect();
    let stats = process_files_parallel(paths, &args.root_dir, segmenter, &batch_config).await?;

    write_run_stats(&stats, &args.stats_out).await?;

    println!("dialogue-seams v{} - run complete", env!("CARGO_PKG_VERSION"));
    println!(
        "Processed: {}, skipped: {}, failed: {}, paths with issues: {}",
        stats.files_processed,
        stats.files_skipped,
        stats.files_failed,
        invalid.len()
    );
    println!("Stats written to {}", args.stats_out.display());

    Ok(())
}
