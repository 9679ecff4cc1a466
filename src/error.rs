// WHY: Integrity failures are part of the library contract, so they get a typed error
// Orchestration code (CLI, batch) keeps using anyhow and wraps these

use thiserror::Error;

/// Fatal segmentation failure: the dialogue map cannot be trusted for this prose
///
/// The orchestrator decides whether to regenerate, fall back to single-voice
/// narration, or surface the failure. No partial output accompanies these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentationIntegrityError {
    #[error(
        "overlapping dialogue spans: {speaker} \"{quote_preview}\" starts at char {start_char} \
         but the previous span ends at char {previous_end_char}"
    )]
    OverlappingSpans {
        speaker: String,
        quote_preview: String,
        start_char: usize,
        previous_end_char: usize,
    },

    #[error(
        "{failed} of {total} dialogue spans could not be located \
         ({rate:.1}% exceeds the {threshold:.1}% threshold)"
    )]
    FailureRateExceeded {
        failed: usize,
        total: usize,
        rate: f64,
        threshold: f64,
    },

    #[error("all {total} dialogue spans failed to resolve against the prose")]
    AllSpansFailed { total: usize },

    #[error(
        "dialogue text mismatch for {speaker} at char {start_char}: claimed \"{quote_preview}\", \
         found \"{extracted_preview}\" (word overlap {overlap:.2} below {min_overlap:.2})"
    )]
    ContentMismatch {
        speaker: String,
        quote_preview: String,
        extracted_preview: String,
        start_char: usize,
        overlap: f64,
        min_overlap: f64,
    },
}
