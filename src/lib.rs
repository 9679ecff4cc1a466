pub mod batch;
pub mod config;
pub mod discovery;
pub mod error;
pub mod incremental;
pub mod scene;
pub mod segmentation;
pub mod validation;

use std::sync::OnceLock;

// Re-export main types for convenient access
pub use config::{DedupMode, SegmentationConfig};
pub use error::SegmentationIntegrityError;
pub use segmentation::{
    ClaimedSpan, OutcomeCounts, RelocationMethod, Segment, SegmentationReport, SegmentationWarning, Segmenter,
    NARRATOR_SPEAKER,
};
pub use validation::{validate_dialogue_map, DialogueMapValidation};

// Re-export batch processing types and functions for benchmarking
pub use batch::{process_files_parallel, BatchConfig, FileStats, RunStats};
pub use scene::{SceneDocument, SceneSegments};

fn default_segmenter() -> &'static Segmenter {
    static SEGMENTER: OnceLock<Segmenter> = OnceLock::new();
    SEGMENTER.get_or_init(Segmenter::default)
}

/// Convert prose plus an untrusted dialogue map into ordered segments
///
/// Uses the default (lenient, conservative-dedup) configuration. Build a
/// [`Segmenter`] directly for strict mode or custom thresholds.
///
/// # Example
/// ```
/// use dialogue_seams::{convert_dialogue_map_to_segments, ClaimedSpan};
///
/// let prose = "Jensen walked in. \"We need to move,\" she said.";
/// let map = vec![ClaimedSpan::new("Jensen", "\"We need to move,\"", 18, 36)];
/// let segments = convert_dialogue_map_to_segments(prose, Some(&map)).unwrap();
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[1].speaker(), "Jensen");
/// ```
pub fn convert_dialogue_map_to_segments(
    prose: &str,
    dialogue_map: Option<&[ClaimedSpan]>,
) -> Result<Vec<Segment>, SegmentationIntegrityError> {
    default_segmenter()
        .segment(prose, dialogue_map)
        .map(SegmentationReport::into_segments)
}
