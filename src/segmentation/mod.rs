// WHY: Three-stage pipeline (verify -> relocate -> build) over untrusted dialogue spans
// Each stage has its own contract and failure mode so it can be tested on its own

use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::SegmentationConfig;
use crate::error::SegmentationIntegrityError;

pub mod builder;
pub mod dedup;
pub mod positions;
pub mod quotes;
pub mod relocator;
pub mod similarity;
pub mod types;
pub mod verifier;

pub use positions::{BytePos, CharPos, ProseText, TextRange};
pub use types::{
    ClaimedSpan, DuplicateKind, FailureReason, OutcomeCounts, RelocationMethod, Segment, SegmentationReport,
    SegmentationWarning, SpanOutcome, VerifiedSpan, NARRATOR_SPEAKER,
};
pub use verifier::{verify, Verification, VerifyReason};

/// Collapse identical claims and sort by claimed start (stable)
pub fn prepare_claims(spans: &[ClaimedSpan]) -> Vec<ClaimedSpan> {
    let mut seen = HashSet::new();
    let mut claims: Vec<ClaimedSpan> = spans
        .iter()
        .filter(|span| {
            let fresh = seen.insert(*span);
            if !fresh {
                debug!(speaker = %span.speaker, start = span.start_char, "Dropping duplicate dialogue claim");
            }
            fresh
        })
        .cloned()
        .collect();
    claims.sort_by_key(|span| span.start_char);
    claims
}

/// Reject position-sorted claims whose offsets overlap
///
/// Claims with reversed or empty offsets carry no usable position and are
/// left for the verifier to reject.
pub fn ensure_disjoint_claims(claims: &[ClaimedSpan]) -> Result<(), SegmentationIntegrityError> {
    let mut previous: Option<&ClaimedSpan> = None;
    for claim in claims.iter().filter(|c| c.start_char >= 0 && c.end_char > c.start_char) {
        if let Some(prev) = previous.filter(|prev| claim.start_char < prev.end_char) {
            return Err(SegmentationIntegrityError::OverlappingSpans {
                speaker: claim.speaker.clone(),
                quote_preview: claim.quote_preview(),
                start_char: claim.start_char as usize,
                previous_end_char: prev.end_char as usize,
            });
        }
        previous = Some(claim);
    }
    Ok(())
}

/// Dialogue segmentation engine configured with one set of thresholds
///
/// Pure and stateless between calls; one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    /// Create a segmenter after validating the config
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Verify and relocate every claim, then apply the failure-rate policy
    pub fn resolve(&self, prose: &str, spans: &[ClaimedSpan]) -> Result<Vec<VerifiedSpan>, SegmentationIntegrityError> {
        let prose = ProseText::new(prose);
        let claims = prepare_claims(spans);
        ensure_disjoint_claims(&claims)?;
        let resolved = relocator::resolve_spans(&prose, &claims, &self.config)?;
        relocator::enforce_failure_policy(&resolved, &self.config)?;
        Ok(resolved)
    }

    /// Turn prose plus a claimed dialogue map into ordered segments
    ///
    /// An empty or missing map yields the whole prose as one narrator segment.
    pub fn segment(
        &self,
        prose: &str,
        dialogue_map: Option<&[ClaimedSpan]>,
    ) -> Result<SegmentationReport, SegmentationIntegrityError> {
        let spans = dialogue_map.unwrap_or_default();
        info!(prose_chars = prose.chars().count(), spans = spans.len(), "Segmenting scene");

        if spans.is_empty() {
            return Ok(SegmentationReport {
                segments: vec![Segment::Narrator {
                    text: prose.to_string(),
                    start_char: 0,
                    end_char: prose.chars().count(),
                }],
                counts: OutcomeCounts::default(),
                warnings: Vec::new(),
                duplication_detected: false,
            });
        }

        let resolved = self.resolve(prose, spans)?;
        let counts = OutcomeCounts::from_spans(&resolved);

        let mut warnings: Vec<SegmentationWarning> = resolved
            .iter()
            .filter_map(|span| match &span.outcome {
                SpanOutcome::Failed { reason } => Some(SegmentationWarning::DroppedSpan {
                    speaker: span.claim.speaker.clone(),
                    quote_preview: span.claim.quote_preview(),
                    reason: *reason,
                }),
                SpanOutcome::Synthetic { .. } => Some(SegmentationWarning::SyntheticSpan {
                    speaker: span.claim.speaker.clone(),
                    quote_preview: span.claim.quote_preview(),
                }),
                _ => None,
            })
            .collect();

        let text = ProseText::new(prose);
        let output = builder::build(&text, &resolved, &self.config)?;
        warnings.extend(output.warnings);

        info!(
            segments = output.segments.len(),
            verified = counts.verified,
            relocated = counts.relocated,
            synthetic = counts.synthetic,
            failed = counts.failed,
            "Scene segmentation complete"
        );

        Ok(SegmentationReport {
            segments: output.segments,
            counts,
            warnings,
            duplication_detected: output.duplication_detected,
        })
    }
}
