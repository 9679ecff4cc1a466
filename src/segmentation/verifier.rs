// WHY: First pipeline stage - decide whether a claimed position can be trusted as-is
// Validity is relative to the cursor of previously accepted spans, not global

use super::positions::{BytePos, CharPos, ProseText, TextRange};
use super::quotes::strip_quote_edges;
use super::similarity::prefix_overlap;
use super::types::ClaimedSpan;

/// Outcome detail of a position check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyReason {
    Valid,
    /// Nothing left of the quote once glyphs are stripped
    EmptyQuote,
    /// Negative, reversed, or past the end of the prose
    OutOfBounds,
    /// Starts inside a region an earlier span already consumed
    BeforeCursor,
    /// Text at the claimed offsets is not the claimed quote
    TextMismatch,
}

/// Result of verifying one claimed span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub reason: VerifyReason,
    /// Claimed range converted to bytes, when it lies inside the prose
    pub range: Option<TextRange>,
    /// Whether the text at the claimed range matches the quote, regardless of the cursor
    pub text_matches: bool,
}

impl Verification {
    fn rejected(reason: VerifyReason, range: Option<TextRange>, text_matches: bool) -> Self {
        Self { valid: false, reason, range, text_matches }
    }
}

/// Convert claimed char offsets to a byte range; `None` if out of bounds or empty
pub fn claimed_range(prose: &ProseText, span: &ClaimedSpan) -> Option<TextRange> {
    if span.start_char < 0 || span.end_char <= span.start_char {
        return None;
    }
    let start = prose.byte_of(CharPos(usize::try_from(span.start_char).ok()?))?;
    let end = prose.byte_of(CharPos(usize::try_from(span.end_char).ok()?))?;
    Some(TextRange::new(start, end))
}

/// Check a claimed span against the prose and the monotonic cursor
///
/// Valid when the range lies inside the prose, starts at or after `cursor`,
/// and the first `prefix_chars` characters of the normalised text found there
/// and of the normalised quote overlap by at least `min_coverage`. The caller
/// advances the cursor to the range end on success.
pub fn verify(
    prose: &ProseText,
    span: &ClaimedSpan,
    cursor: BytePos,
    prefix_chars: usize,
    min_coverage: f64,
) -> Verification {
    let quote = strip_quote_edges(&span.quote);
    if quote.is_empty() {
        return Verification::rejected(VerifyReason::EmptyQuote, None, false);
    }

    let Some(range) = claimed_range(prose, span) else {
        return Verification::rejected(VerifyReason::OutOfBounds, None, false);
    };

    let actual = strip_quote_edges(prose.slice(range));
    let text_matches = prefix_overlap(actual, quote, prefix_chars, min_coverage);

    if range.start < cursor {
        return Verification::rejected(VerifyReason::BeforeCursor, Some(range), text_matches);
    }
    if !text_matches {
        return Verification::rejected(VerifyReason::TextMismatch, Some(range), false);
    }

    Verification {
        valid: true,
        reason: VerifyReason::Valid,
        range: Some(range),
        text_matches: true,
    }
}
