// WHY: Every heuristic threshold lives in one serde struct so it can be tuned from TOML
// Defaults reproduce the production behaviour of the segmentation engine

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Narrator de-duplication policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Strip only exact or dominant duplicates, keep narrative echoes
    #[default]
    Conservative,
    /// Legacy behaviour: also cut every echoed quote out of narration
    Aggressive,
}

/// Tunables for verification, relocation and segment building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Abort when failed / total spans exceeds this ratio
    pub failure_rate_threshold: f64,
    pub dedup_mode: DedupMode,
    /// Keep unlocatable but substantial quotes as synthetic segments
    pub synthetic_fallback: bool,
    /// Prefix length compared when verifying a claimed position
    pub verify_prefix_chars: usize,
    /// Prefix length used by fuzzy-prefix relocation
    pub fuzzy_prefix_chars: usize,
    /// Leading/trailing characters compared by the fuzzy content match
    pub fuzzy_edge_chars: usize,
    /// Minimum fraction of claimed words found in the extracted dialogue
    pub min_word_overlap: f64,
    /// Share of the compared text the shorter side must cover before containment counts
    pub min_overlap_coverage: f64,
    /// A quote covering more than this share of narrator text removes it
    pub dominant_duplicate_ratio: f64,
    /// Minimum length of a distinctive word for word-set relocation
    pub distinctive_word_min_chars: usize,
    /// How many distinctive words to collect
    pub distinctive_word_count: usize,
    /// Distinctive words a quoted span must contain to be accepted
    pub min_distinctive_matches: usize,
    /// Minimum normalised quote length eligible for synthetic fallback
    pub synthetic_min_chars: usize,
    /// Longest leading word treated as an orphaned fragment
    pub fragment_max_chars: usize,
    /// Pure punctuation narrator residue up to this length is discarded
    pub punctuation_residue_max_chars: usize,
    /// Allowed excess of emitted text over prose length before warning
    pub duplication_tolerance: f64,
    /// Quotes shorter than this are ignored by duplicate suppression
    pub dedup_min_quote_chars: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.15,
            dedup_mode: DedupMode::Conservative,
            synthetic_fallback: true,
            verify_prefix_chars: 20,
            fuzzy_prefix_chars: 30,
            fuzzy_edge_chars: 20,
            min_word_overlap: 0.60,
            min_overlap_coverage: 0.5,
            dominant_duplicate_ratio: 0.70,
            distinctive_word_min_chars: 5,
            distinctive_word_count: 3,
            min_distinctive_matches: 2,
            synthetic_min_chars: 11,
            fragment_max_chars: 6,
            punctuation_residue_max_chars: 4,
            duplication_tolerance: 0.05,
            dedup_min_quote_chars: 4,
        }
    }
}

impl SegmentationConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SegmentationConfig = toml::from_str(content).context("Invalid segmentation config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Reject ratios outside [0, 1] and zero-width character windows
    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("failure_rate_threshold", self.failure_rate_threshold),
            ("min_word_overlap", self.min_word_overlap),
            ("min_overlap_coverage", self.min_overlap_coverage),
            ("dominant_duplicate_ratio", self.dominant_duplicate_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be between 0 and 1, got {value}");
            }
        }

        if self.duplication_tolerance.is_nan() || self.duplication_tolerance < 0.0 {
            bail!("duplication_tolerance must be non-negative, got {}", self.duplication_tolerance);
        }

        let windows = [
            ("verify_prefix_chars", self.verify_prefix_chars),
            ("fuzzy_prefix_chars", self.fuzzy_prefix_chars),
            ("fuzzy_edge_chars", self.fuzzy_edge_chars),
            ("distinctive_word_count", self.distinctive_word_count),
            ("min_distinctive_matches", self.min_distinctive_matches),
        ];
        for (name, value) in windows {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }

        if self.min_distinctive_matches > self.distinctive_word_count {
            bail!(
                "min_distinctive_matches ({}) cannot exceed distinctive_word_count ({})",
                self.min_distinctive_matches,
                self.distinctive_word_count
            );
        }

        Ok(())
    }
}
