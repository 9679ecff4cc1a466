// WHY: On-disk shapes for batch runs: one scene in, one segments document out

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::segmentation::{ClaimedSpan, OutcomeCounts, Segment, SegmentationReport, SegmentationWarning};

/// A `*.scene.json` input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub prose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_map: Option<Vec<ClaimedSpan>>,
    /// Enables the pre-flight speaker check when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_speakers: Option<Vec<String>>,
}

impl SceneDocument {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse scene document")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read scene file: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid scene file: {}", path.display()))
    }
}

/// The `<stem>_segments.json` output written next to each scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSegments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    pub segments: Vec<Segment>,
    pub counts: OutcomeCounts,
    pub warnings: Vec<SegmentationWarning>,
    pub duplication_detected: bool,
}

impl SceneSegments {
    pub fn from_report(scene_id: Option<String>, report: SegmentationReport) -> Self {
        Self {
            scene_id,
            segments: report.segments,
            counts: report.counts,
            warnings: report.warnings,
            duplication_detected: report.duplication_detected,
        }
    }

    /// Write as pretty JSON with a trailing newline
    pub async fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize segments")?;
        let file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create segments file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&json).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}
