// WHY: Second pipeline stage - recover positions the extractor got wrong
// Positions go stale whenever the prose is polished after extraction, so several
// search strategies run in a fixed order and the first hit wins

use tracing::{debug, warn};

use super::positions::{BytePos, ProseText, TextRange};
use super::quotes::{char_prefix, find_closing_quote, quoted_spans_from, strip_quote_edges, OPENING_QUOTES, WRAPPING_STYLES};
use super::similarity::{count_word_hits, distinctive_words};
use super::types::{ClaimedSpan, FailureReason, RelocationMethod, SpanOutcome, VerifiedSpan};
use super::verifier::{verify, VerifyReason};
use crate::config::SegmentationConfig;
use crate::error::SegmentationIntegrityError;

/// A corrected position and the strategy that found it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub range: TextRange,
    pub method: RelocationMethod,
}

/// Earliest occurrence at or after `from` of the quote wrapped in any glyph style
fn find_wrapped(text: &str, quote: &str, from: usize) -> Option<TextRange> {
    let tail = text.get(from..)?;
    WRAPPING_STYLES
        .iter()
        .filter_map(|(open, close)| {
            let wrapped = format!("{open}{quote}{close}");
            tail.find(&wrapped).map(|offset| {
                let start = BytePos(from + offset);
                TextRange::new(start, start.advance(wrapped.len()))
            })
        })
        .min_by_key(|range| range.start)
}

/// Strategy 1: exact wrapped quote searched forward from `search_start`
pub fn exact_pattern(prose: &ProseText, quote: &str, search_start: BytePos) -> Option<TextRange> {
    find_wrapped(prose.as_str(), quote, search_start.0)
}

/// Strategy 2: opening glyph followed by the quote prefix, closed by depth scan
pub fn fuzzy_prefix(prose: &ProseText, quote: &str, search_start: BytePos, prefix_chars: usize) -> Option<TextRange> {
    let text = prose.as_str();
    let prefix = char_prefix(quote, prefix_chars);

    OPENING_QUOTES
        .iter()
        .filter_map(|opener| {
            let needle = format!("{opener}{prefix}");
            let mut from = search_start.0;
            while let Some(offset) = text.get(from..).and_then(|tail| tail.find(&needle)) {
                let open = from + offset;
                if let Some(end) = find_closing_quote(text, open) {
                    return Some(TextRange::new(BytePos(open), BytePos(end)));
                }
                from = open + opener.len_utf8();
            }
            None
        })
        .min_by_key(|range| range.start)
}

/// Strategy 3: exact wrapped quote searched from the document start,
/// accepted only at or after the end of the last processed span
pub fn from_start(prose: &ProseText, quote: &str, cursor: BytePos) -> Option<TextRange> {
    let text = prose.as_str();
    WRAPPING_STYLES
        .iter()
        .filter_map(|(open, close)| {
            let wrapped = format!("{open}{quote}{close}");
            text.match_indices(wrapped.as_str())
                .map(|(idx, _)| idx)
                .find(|idx| *idx >= cursor.0)
                .map(|idx| TextRange::new(BytePos(idx), BytePos(idx + wrapped.len())))
        })
        .min_by_key(|range| range.start)
}

/// Strategy 4: first paired-quote span containing enough distinctive words
pub fn fuzzy_word_match(prose: &ProseText, quote: &str, cursor: BytePos, config: &SegmentationConfig) -> Option<TextRange> {
    let targets = distinctive_words(quote, config.distinctive_word_min_chars, config.distinctive_word_count);
    if targets.len() < config.min_distinctive_matches {
        return None;
    }

    let text = prose.as_str();
    quoted_spans_from(text, cursor.0)
        .into_iter()
        .find(|(start, end)| count_word_hits(&text[*start..*end], &targets) >= config.min_distinctive_matches)
        .map(|(start, end)| TextRange::new(BytePos(start), BytePos(end)))
}

/// Try every positional strategy in order
///
/// `search_start` is the claimed start clamped to at least `cursor`; `cursor`
/// is the end of the last successfully processed span. Every returned range
/// starts at or after `cursor`.
pub fn relocate(
    prose: &ProseText,
    span: &ClaimedSpan,
    search_start: BytePos,
    cursor: BytePos,
    config: &SegmentationConfig,
) -> Option<Relocation> {
    let quote = strip_quote_edges(&span.quote);
    if quote.is_empty() {
        return None;
    }
    let search_start = search_start.max(cursor);

    let found = exact_pattern(prose, quote, search_start)
        .map(|range| (range, RelocationMethod::ExactPattern))
        .or_else(|| {
            fuzzy_prefix(prose, quote, search_start, config.fuzzy_prefix_chars)
                .map(|range| (range, RelocationMethod::FuzzyPrefix))
        })
        .or_else(|| from_start(prose, quote, cursor).map(|range| (range, RelocationMethod::FromStart)))
        .or_else(|| {
            fuzzy_word_match(prose, quote, cursor, config).map(|range| (range, RelocationMethod::FuzzyWordMatch))
        });

    found.map(|(range, method)| Relocation { range, method })
}

/// Outcome for a span no positional strategy could place
///
/// Substantial quotes become synthetic in lenient mode since dropping real
/// dialogue is worse than mis-ordering it; everything else fails.
pub fn fallback(span: &ClaimedSpan, config: &SegmentationConfig) -> SpanOutcome {
    let quote = strip_quote_edges(&span.quote);
    if quote.is_empty() {
        return SpanOutcome::Failed { reason: FailureReason::EmptyQuote };
    }
    if config.synthetic_fallback && quote.chars().count() >= config.synthetic_min_chars {
        return SpanOutcome::Synthetic { text: quote.to_string() };
    }
    SpanOutcome::Failed { reason: FailureReason::NotFound }
}

/// Accumulator threaded through the resolution fold
#[derive(Debug, Default)]
struct ResolutionState {
    /// End of the last accepted span; never moves backwards
    cursor: BytePos,
    spans: Vec<VerifiedSpan>,
}

impl ResolutionState {
    fn accept(mut self, claim: &ClaimedSpan, outcome: SpanOutcome) -> Self {
        if let SpanOutcome::Verified { range } | SpanOutcome::Relocated { range, .. } = &outcome {
            self.cursor = range.end;
        }
        self.spans.push(VerifiedSpan { claim: claim.clone(), outcome });
        self
    }
}

fn resolve_one(
    prose: &ProseText,
    state: ResolutionState,
    claim: &ClaimedSpan,
    config: &SegmentationConfig,
) -> Result<ResolutionState, SegmentationIntegrityError> {
    let check = verify(prose, claim, state.cursor, config.verify_prefix_chars, config.min_overlap_coverage);

    if check.valid {
        let range = check.range.unwrap_or(TextRange::new(state.cursor, state.cursor));
        debug!(speaker = %claim.speaker, start = claim.start_char, "Claimed position verified");
        return Ok(state.accept(claim, SpanOutcome::Verified { range }));
    }

    match check.reason {
        VerifyReason::BeforeCursor if check.text_matches => {
            return Err(SegmentationIntegrityError::OverlappingSpans {
                speaker: claim.speaker.clone(),
                quote_preview: claim.quote_preview(),
                start_char: claim.start_char.max(0) as usize,
                previous_end_char: prose.char_of(state.cursor).0,
            });
        }
        VerifyReason::EmptyQuote => {
            warn!(speaker = %claim.speaker, "Dialogue span has an empty quote");
            return Ok(state.accept(claim, SpanOutcome::Failed { reason: FailureReason::EmptyQuote }));
        }
        _ => {}
    }

    let search_start = prose.clamp_signed(claim.start_char).max(state.cursor);
    match relocate(prose, claim, search_start, state.cursor, config) {
        Some(relocation) => {
            debug!(
                speaker = %claim.speaker,
                claimed_start = claim.start_char,
                new_start = prose.char_of(relocation.range.start).0,
                method = %relocation.method,
                "Dialogue span relocated"
            );
            Ok(state.accept(
                claim,
                SpanOutcome::Relocated { range: relocation.range, method: relocation.method },
            ))
        }
        None => {
            let outcome = fallback(claim, config);
            match &outcome {
                SpanOutcome::Synthetic { .. } => {
                    warn!(speaker = %claim.speaker, quote = %claim.quote_preview(), "Dialogue span kept as synthetic");
                }
                _ => {
                    warn!(speaker = %claim.speaker, quote = %claim.quote_preview(), "Dialogue span could not be located");
                }
            }
            Ok(state.accept(claim, outcome))
        }
    }
}

/// Verify and relocate position-sorted claims in one fold
///
/// The cursor only advances on accepted spans, so every anchored range
/// starts at or after the end of the previous one.
pub fn resolve_spans(
    prose: &ProseText,
    claims: &[ClaimedSpan],
    config: &SegmentationConfig,
) -> Result<Vec<VerifiedSpan>, SegmentationIntegrityError> {
    let state = claims
        .iter()
        .try_fold(ResolutionState::default(), |state, claim| resolve_one(prose, state, claim, config))?;
    Ok(state.spans)
}

/// Abort when every span failed or the failure rate exceeds the threshold
pub fn enforce_failure_policy(spans: &[VerifiedSpan], config: &SegmentationConfig) -> Result<(), SegmentationIntegrityError> {
    let total = spans.len();
    let failed = spans.iter().filter(|s| s.is_failed()).count();

    if total > 0 && failed == total {
        return Err(SegmentationIntegrityError::AllSpansFailed { total });
    }

    let rate = if total == 0 { 0.0 } else { failed as f64 / total as f64 };
    if rate > config.failure_rate_threshold {
        return Err(SegmentationIntegrityError::FailureRateExceeded {
            failed,
            total,
            rate: rate * 100.0,
            threshold: config.failure_rate_threshold * 100.0,
        });
    }

    Ok(())
}
