// WHY: Segments many scene files concurrently; the pure core runs on the blocking pool
// Extracted from main.rs so integration tests and benchmarks can drive it directly

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

use crate::incremental::{segments_file_exists, segments_path_for};
use crate::scene::{SceneDocument, SceneSegments};
use crate::segmentation::Segmenter;
use crate::validation::validate_dialogue_map;

/// Batch run behaviour
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Abort the whole run on the first failed scene
    pub fail_fast: bool,
    /// Re-segment scenes whose segments file already exists
    pub overwrite_all: bool,
    pub show_progress: bool,
    /// Scenes in flight at once
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            overwrite_all: false,
            show_progress: false,
            max_concurrency: num_cpus::get(),
        }
    }
}

/// Per-file processing statistics
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileStats {
    /// File path relative to root directory
    pub path: String,
    pub chars_processed: u64,
    pub segments_emitted: u64,
    pub spans_total: u64,
    pub spans_verified: u64,
    pub spans_relocated: u64,
    pub spans_synthetic: u64,
    pub spans_failed: u64,
    pub warnings: u64,
    pub processing_time_ms: u64,
    /// Throughput in characters per second
    pub chars_per_sec: f64,
    /// Processing status (success, skipped, failed)
    pub status: String,
    /// Error message if processing failed
    pub error: Option<String>,
}

impl FileStats {
    fn empty(path: String, status: &str) -> Self {
        Self {
            path,
            chars_processed: 0,
            segments_emitted: 0,
            spans_total: 0,
            spans_verified: 0,
            spans_relocated: 0,
            spans_synthetic: 0,
            spans_failed: 0,
            warnings: 0,
            processing_time_ms: 0,
            chars_per_sec: 0.0,
            status: status.to_string(),
            error: None,
        }
    }

    fn failed(path: String, error: &anyhow::Error) -> Self {
        let mut stats = Self::empty(path, "failed");
        stats.error = Some(format!("{error:#}"));
        stats
    }
}

/// Aggregate statistics written by `--stats-out`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunStats {
    /// Seconds since the Unix epoch
    pub run_start: u64,
    pub total_processing_time_ms: u64,
    pub total_chars_processed: u64,
    pub total_segments_emitted: u64,
    pub overall_chars_per_sec: f64,
    pub files_processed: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub file_stats: Vec<FileStats>,
}

fn relative_display(path: &Path, root_dir: &Path) -> String {
    path.strip_prefix(root_dir).unwrap_or(path).display().to_string()
}

/// Segment one scene file and write its `<stem>_segments.json`
///
/// Integrity errors come back as `Err`; the caller decides whether they abort the run.
pub async fn process_scene_file(
    path: &Path,
    root_dir: &Path,
    segmenter: Arc<Segmenter>,
    config: &BatchConfig,
) -> Result<FileStats> {
    let display_path = relative_display(path, root_dir);

    if !config.overwrite_all && segments_file_exists(path) {
        info!(path = %display_path, "Skipping scene with existing segments file");
        return Ok(FileStats::empty(display_path, "skipped"));
    }

    let start = Instant::now();
    let scene = SceneDocument::load(path).await?;

    if let (Some(map), Some(speakers)) = (&scene.dialogue_map, &scene.known_speakers) {
        let check = validate_dialogue_map(map, speakers);
        for error in &check.errors {
            warn!(path = %display_path, "Dialogue map check: {}", error);
        }
    }

    let chars = scene.prose.chars().count() as u64;
    let SceneDocument { id, prose, dialogue_map, .. } = scene;
    let report = tokio::task::spawn_blocking(move || segmenter.segment(&prose, dialogue_map.as_deref()))
        .await
        .context("Segmentation task panicked")?
        .with_context(|| format!("Segmentation failed for {display_path}"))?;

    let counts = report.counts;
    let output = SceneSegments::from_report(id, report);
    output.write(&segments_path_for(path)).await?;

    let elapsed = start.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;
    let chars_per_sec = if elapsed.as_secs_f64() > 0.0 { chars as f64 / elapsed.as_secs_f64() } else { 0.0 };

    info!(
        path = %display_path,
        segments = output.segments.len(),
        failed_spans = counts.failed,
        elapsed_ms,
        "Scene processed"
    );

    Ok(FileStats {
        path: display_path,
        chars_processed: chars,
        segments_emitted: output.segments.len() as u64,
        spans_total: counts.total as u64,
        spans_verified: counts.verified as u64,
        spans_relocated: counts.relocated as u64,
        spans_synthetic: counts.synthetic as u64,
        spans_failed: counts.failed as u64,
        warnings: output.warnings.len() as u64,
        processing_time_ms: elapsed_ms,
        chars_per_sec,
        status: "success".to_string(),
        error: None,
    })
}

fn progress_bar(total: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} scenes {msg}")
        .map_err(|e| anyhow::anyhow!("Invalid progress template: {e}"))?;
    Ok(ProgressBar::new(total as u64).with_style(style))
}

/// Segment all scenes with bounded concurrency and aggregate their stats
pub async fn process_files_parallel(
    paths: Vec<PathBuf>,
    root_dir: &Path,
    segmenter: Arc<Segmenter>,
    config: &BatchConfig,
) -> Result<RunStats> {
    let run_start = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let started = Instant::now();
    let progress = progress_bar(paths.len(), config.show_progress)?;

    let mut results = stream::iter(paths.into_iter().map(|path| {
        let segmenter = Arc::clone(&segmenter);
        async move {
            let outcome = process_scene_file(&path, root_dir, segmenter, config).await;
            (path, outcome)
        }
    }))
    .buffer_unordered(config.max_concurrency.max(1));

    let mut file_stats = Vec::new();
    while let Some((path, outcome)) = results.next().await {
        let stats = match outcome {
            Ok(stats) => stats,
            Err(e) if config.fail_fast => {
                progress.abandon_with_message("aborted");
                return Err(e.context(format!("Aborting run at {}", path.display())));
            }
            Err(e) => {
                warn!(path = %path.display(), "Scene failed: {:#}", e);
                FileStats::failed(relative_display(&path, root_dir), &e)
            }
        };
        progress.inc(1);
        file_stats.push(stats);
    }
    progress.finish_with_message("done");

    // buffer_unordered yields in completion order
    file_stats.sort_by(|a, b| a.path.cmp(&b.path));

    let count_status = |status: &str| file_stats.iter().filter(|s| s.status == status).count() as u64;
    let total_chars: u64 = file_stats.iter().map(|s| s.chars_processed).sum();
    let elapsed = started.elapsed();
    let stats = RunStats {
        run_start,
        total_processing_time_ms: elapsed.as_millis() as u64,
        total_chars_processed: total_chars,
        total_segments_emitted: file_stats.iter().map(|s| s.segments_emitted).sum(),
        overall_chars_per_sec: if elapsed.as_secs_f64() > 0.0 { total_chars as f64 / elapsed.as_secs_f64() } else { 0.0 },
        files_processed: count_status("success"),
        files_skipped: count_status("skipped"),
        files_failed: count_status("failed"),
        file_stats,
    };

    info!(
        processed = stats.files_processed,
        skipped = stats.files_skipped,
        failed = stats.files_failed,
        "Batch run complete"
    );
    Ok(stats)
}

/// Write run statistics as pretty JSON
pub async fn write_run_stats(stats: &RunStats, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(stats).context("Failed to serialize run stats")?;
    let file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create stats file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
