use serde::{Deserialize, Serialize};
use std::fmt;

use super::positions::TextRange;
use super::quotes::{char_prefix, normalize_quote};

/// Speaker name carried by every narrator segment
pub const NARRATOR_SPEAKER: &str = "narrator";

/// Characters of a quote shown in logs and error messages
pub const QUOTE_PREVIEW_CHARS: usize = 40;

/// One putative quotation reported by the upstream extraction step
///
/// Offsets are character offsets into the prose the extractor saw. They are
/// signed so that corrupted negative values survive deserialisation and can be
/// reported by [`crate::validate_dialogue_map`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimedSpan {
    pub speaker: String,
    pub quote: String,
    pub start_char: i64,
    pub end_char: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
}

impl ClaimedSpan {
    pub fn new(speaker: impl Into<String>, quote: impl Into<String>, start_char: i64, end_char: i64) -> Self {
        Self {
            speaker: speaker.into(),
            quote: quote.into(),
            start_char,
            end_char,
            emotion: None,
            delivery: None,
        }
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    pub fn with_delivery(mut self, delivery: impl Into<String>) -> Self {
        self.delivery = Some(delivery.into());
        self
    }

    /// Quote with surrounding glyphs and whitespace removed
    pub fn normalized_quote(&self) -> String {
        normalize_quote(&self.quote)
    }

    /// Short quote excerpt for diagnostics
    pub fn quote_preview(&self) -> String {
        preview(&self.normalized_quote())
    }
}

pub(crate) fn preview(text: &str) -> String {
    char_prefix(text, QUOTE_PREVIEW_CHARS).to_string()
}

/// Strategy that recovered a stale position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationMethod {
    ExactPattern,
    FuzzyPrefix,
    FromStart,
    FuzzyWordMatch,
}

impl fmt::Display for RelocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelocationMethod::ExactPattern => "exact-pattern",
            RelocationMethod::FuzzyPrefix => "fuzzy-prefix",
            RelocationMethod::FromStart => "from-start",
            RelocationMethod::FuzzyWordMatch => "fuzzy-word-match",
        };
        f.write_str(name)
    }
}

/// Why a span could not be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Quote is empty once glyphs are stripped
    EmptyQuote,
    /// No strategy found it and it is too short (or strict mode) for synthetic fallback
    NotFound,
}

/// Resolution outcome for one claimed span
#[derive(Debug, Clone, PartialEq)]
pub enum SpanOutcome {
    /// Claimed position was correct
    Verified { range: TextRange },
    /// Position was stale and has been corrected
    Relocated { range: TextRange, method: RelocationMethod },
    /// Text kept without any position in the prose
    Synthetic { text: String },
    /// Dropped; counts towards the failure rate
    Failed { reason: FailureReason },
}

/// A claimed span annotated with its resolution
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedSpan {
    pub claim: ClaimedSpan,
    pub outcome: SpanOutcome,
}

impl VerifiedSpan {
    /// Resolved range for anchored outcomes
    pub fn range(&self) -> Option<TextRange> {
        match &self.outcome {
            SpanOutcome::Verified { range } | SpanOutcome::Relocated { range, .. } => Some(*range),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SpanOutcome::Failed { .. })
    }
}

/// Final output unit handed to audio generation
///
/// Synthetic dialogue is a distinct variant: it has no position in the prose
/// and consumers must handle that explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Segment {
    Narrator {
        text: String,
        start_char: usize,
        end_char: usize,
    },
    Dialogue {
        speaker: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emotion: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delivery: Option<String>,
        start_char: usize,
        end_char: usize,
    },
    Synthetic {
        speaker: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emotion: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delivery: Option<String>,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Narrator { text, .. } | Segment::Dialogue { text, .. } | Segment::Synthetic { text, .. } => text,
        }
    }

    pub fn speaker(&self) -> &str {
        match self {
            Segment::Narrator { .. } => NARRATOR_SPEAKER,
            Segment::Dialogue { speaker, .. } | Segment::Synthetic { speaker, .. } => speaker,
        }
    }

    pub fn is_narrator(&self) -> bool {
        matches!(self, Segment::Narrator { .. })
    }

    pub fn is_dialogue(&self) -> bool {
        matches!(self, Segment::Dialogue { .. } | Segment::Synthetic { .. })
    }

    /// Character range in the prose, `None` for synthetic segments
    pub fn char_range(&self) -> Option<(usize, usize)> {
        match self {
            Segment::Narrator { start_char, end_char, .. } | Segment::Dialogue { start_char, end_char, .. } => {
                Some((*start_char, *end_char))
            }
            Segment::Synthetic { .. } => None,
        }
    }
}

/// Why narrator text was suppressed or rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    /// Narrator text equals a dialogue quote
    ExactMatch,
    /// A dialogue quote covers most of the narrator text
    Dominant,
    /// A dialogue quote echoed inside longer narration (aggressive mode only)
    Echo,
}

/// Non-fatal conditions surfaced alongside the segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentationWarning {
    DroppedSpan {
        speaker: String,
        quote_preview: String,
        reason: FailureReason,
    },
    SyntheticSpan {
        speaker: String,
        quote_preview: String,
    },
    NarratorSuppressed {
        duplicate: DuplicateKind,
        text_preview: String,
    },
    DuplicationDetected {
        emitted_chars: usize,
        prose_chars: usize,
    },
}

/// Per-outcome counts for one segmentation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub total: usize,
    pub verified: usize,
    pub relocated: usize,
    pub synthetic: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn from_spans(spans: &[VerifiedSpan]) -> Self {
        spans.iter().fold(
            OutcomeCounts { total: spans.len(), ..Default::default() },
            |mut counts, span| {
                match span.outcome {
                    SpanOutcome::Verified { .. } => counts.verified += 1,
                    SpanOutcome::Relocated { .. } => counts.relocated += 1,
                    SpanOutcome::Synthetic { .. } => counts.synthetic += 1,
                    SpanOutcome::Failed { .. } => counts.failed += 1,
                }
                counts
            },
        )
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failed as f64 / self.total as f64
        }
    }
}

/// Segments plus everything the orchestrator may want to log or persist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub segments: Vec<Segment>,
    pub counts: OutcomeCounts,
    pub warnings: Vec<SegmentationWarning>,
    pub duplication_detected: bool,
}

impl SegmentationReport {
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}
