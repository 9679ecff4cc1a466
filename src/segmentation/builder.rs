// WHY: Final pipeline stage - one ordered walk over anchored spans emitting narrator and dialogue
// The current prose is the source of truth for all emitted text, never the stale claimed quote

use tracing::{debug, warn};

use super::dedup::{is_punctuation_residue, suppress_duplicates, trim_leading_fragment, KnownQuote, Suppression};
use super::positions::{BytePos, ProseText, TextRange};
use super::quotes::{find_closing_quote, is_opening_glyph, strip_quote_edges};
use super::similarity::{classify_content, ContentMatch};
use super::types::{preview, Segment, SegmentationWarning, SpanOutcome, VerifiedSpan};
use crate::config::SegmentationConfig;
use crate::error::SegmentationIntegrityError;

/// Segments and diagnostics produced by one build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub segments: Vec<Segment>,
    pub warnings: Vec<SegmentationWarning>,
    pub duplication_detected: bool,
}

/// An anchored span and the synthetic spans that followed it in resolution order
#[derive(Debug)]
struct Anchor<'a> {
    span: &'a VerifiedSpan,
    range: TextRange,
    synthetic_after: Vec<&'a VerifiedSpan>,
}

/// Split resolved spans into position-sorted anchors with attached synthetic spans
///
/// Synthetic spans have no position; each one is placed right after the
/// anchored span that preceded it in the input. Ones with no predecessor are
/// returned separately.
fn plan(spans: &[VerifiedSpan]) -> (Vec<Anchor<'_>>, Vec<&VerifiedSpan>) {
    let mut anchors: Vec<Anchor<'_>> = Vec::new();
    let mut leading = Vec::new();

    for span in spans {
        match (&span.outcome, span.range()) {
            (_, Some(range)) => anchors.push(Anchor { span, range, synthetic_after: Vec::new() }),
            (SpanOutcome::Synthetic { .. }, None) => match anchors.last_mut() {
                Some(anchor) => anchor.synthetic_after.push(span),
                None => leading.push(span),
            },
            _ => {}
        }
    }

    anchors.sort_by_key(|a| a.range.start);
    (anchors, leading)
}

/// Re-derive where the dialogue really starts and ends
///
/// Skips whitespace at the start of the claim, steps back onto an opening
/// glyph immediately before it, and when the start is an opening glyph scans
/// to its matching closer. Falls back to the claimed end when no closer
/// exists before `limit`.
fn dialogue_bounds(prose: &ProseText, range: TextRange, last: BytePos, limit: BytePos) -> TextRange {
    let mut start = range.start;
    while start < range.end {
        match prose.char_at(start) {
            Some(ch) if ch.is_whitespace() => start = start.advance(ch.len_utf8()),
            _ => break,
        }
    }

    if !prose.char_at(start).is_some_and(is_opening_glyph) {
        if let Some(prev) = prose.char_before(start) {
            let back = BytePos(start.0 - prev.len_utf8());
            if is_opening_glyph(prev) && back >= last {
                start = back;
            }
        }
    }

    let end = if prose.char_at(start).is_some_and(is_opening_glyph) {
        match find_closing_quote(prose.as_str(), start.0) {
            Some(close) if close <= limit.0 => BytePos(close),
            _ => range.end,
        }
    } else {
        range.end
    };

    TextRange::new(start, end.max(start))
}

struct SegmentBuilder<'p, 'c> {
    prose: &'p ProseText<'p>,
    config: &'c SegmentationConfig,
    known_quotes: Vec<KnownQuote>,
    segments: Vec<Segment>,
    warnings: Vec<SegmentationWarning>,
    last: BytePos,
}

impl<'p, 'c> SegmentBuilder<'p, 'c> {
    fn new(prose: &'p ProseText<'p>, spans: &[VerifiedSpan], config: &'c SegmentationConfig) -> Self {
        let known_quotes = spans
            .iter()
            .filter_map(|span| match &span.outcome {
                SpanOutcome::Failed { .. } => None,
                SpanOutcome::Synthetic { text } => KnownQuote::new(text, config.dedup_min_quote_chars),
                _ => KnownQuote::new(&span.claim.quote, config.dedup_min_quote_chars),
            })
            .collect();

        Self {
            prose,
            config,
            known_quotes,
            segments: Vec::new(),
            warnings: Vec::new(),
            last: BytePos(0),
        }
    }

    /// Clean and emit the narrator text in `region`, if anything survives
    fn emit_narrator(&mut self, region: TextRange) {
        let raw = self.prose.slice(region);
        if raw.trim().is_empty() {
            return;
        }

        let text = match suppress_duplicates(
            raw,
            &self.known_quotes,
            self.config.dedup_mode,
            self.config.dominant_duplicate_ratio,
        ) {
            Suppression::Keep(text) => text,
            Suppression::Rewritten { text, kind } => {
                debug!(?kind, "Narrator text rewritten to drop echoed dialogue");
                text
            }
            Suppression::Removed(kind) => {
                debug!(?kind, text = %preview(raw.trim()), "Narrator text suppressed as duplicate dialogue");
                self.warnings.push(SegmentationWarning::NarratorSuppressed {
                    duplicate: kind,
                    text_preview: preview(raw.trim()),
                });
                return;
            }
        };

        let text = match trim_leading_fragment(&text, self.config.fragment_max_chars) {
            Some(rest) => {
                debug!(original = %preview(&text), "Trimmed orphaned word fragment from narrator text");
                rest.trim().to_string()
            }
            None => text,
        };

        if text.is_empty() || is_punctuation_residue(&text, self.config.punctuation_residue_max_chars) {
            debug!(residue = %text, "Discarded empty narrator residue");
            return;
        }

        self.segments.push(Segment::Narrator {
            text,
            start_char: self.prose.char_of(region.start).0,
            end_char: self.prose.char_of(region.end).0,
        });
    }

    fn emit_dialogue(&mut self, span: &VerifiedSpan, bounds: TextRange) -> Result<(), SegmentationIntegrityError> {
        let claim = &span.claim;
        let extracted = strip_quote_edges(self.prose.slice(bounds));
        let claimed = strip_quote_edges(&claim.quote);

        let level = classify_content(
            extracted,
            claimed,
            self.config.fuzzy_edge_chars,
            self.config.min_overlap_coverage,
        );
        if !level.is_acceptable(self.config.min_word_overlap) {
            let overlap = match level {
                ContentMatch::WordOverlap(ratio) => ratio,
                _ => 1.0,
            };
            return Err(SegmentationIntegrityError::ContentMismatch {
                speaker: claim.speaker.clone(),
                quote_preview: claim.quote_preview(),
                extracted_preview: preview(extracted),
                start_char: self.prose.char_of(bounds.start).0,
                overlap,
                min_overlap: self.config.min_word_overlap,
            });
        }
        debug!(speaker = %claim.speaker, ?level, "Dialogue text matched claim");

        self.segments.push(Segment::Dialogue {
            speaker: claim.speaker.clone(),
            text: extracted.to_string(),
            emotion: claim.emotion.clone(),
            delivery: claim.delivery.clone(),
            start_char: self.prose.char_of(bounds.start).0,
            end_char: self.prose.char_of(bounds.end).0,
        });
        Ok(())
    }

    fn emit_synthetic(&mut self, span: &VerifiedSpan) {
        if let SpanOutcome::Synthetic { text } = &span.outcome {
            self.segments.push(Segment::Synthetic {
                speaker: span.claim.speaker.clone(),
                text: text.clone(),
                emotion: span.claim.emotion.clone(),
                delivery: span.claim.delivery.clone(),
            });
        }
    }

    fn finish(mut self) -> BuildOutput {
        let prose_chars = self.prose.char_len();
        let emitted_chars: usize = self
            .segments
            .iter()
            .filter(|s| !matches!(s, Segment::Synthetic { .. }))
            .map(|s| s.text().chars().count())
            .sum();

        let limit = prose_chars as f64 * (1.0 + self.config.duplication_tolerance);
        let duplication_detected = emitted_chars as f64 > limit;
        if duplication_detected {
            warn!(emitted_chars, prose_chars, "Emitted segment text exceeds prose length, duplication suspected");
            self.warnings.push(SegmentationWarning::DuplicationDetected { emitted_chars, prose_chars });
        }

        BuildOutput {
            segments: self.segments,
            warnings: self.warnings,
            duplication_detected,
        }
    }
}

/// Walk resolved spans in position order and emit the segment list
///
/// Failed spans are ignored. A span starting before the end of the previous
/// dialogue is a hard failure, as is dialogue text that no longer matches its
/// claim.
pub fn build(
    prose: &ProseText,
    spans: &[VerifiedSpan],
    config: &SegmentationConfig,
) -> Result<BuildOutput, SegmentationIntegrityError> {
    let (anchors, leading_synthetic) = plan(spans);
    let mut builder = SegmentBuilder::new(prose, spans, config);

    for (idx, anchor) in anchors.iter().enumerate() {
        if anchor.range.start < builder.last {
            return Err(SegmentationIntegrityError::OverlappingSpans {
                speaker: anchor.span.claim.speaker.clone(),
                quote_preview: anchor.span.claim.quote_preview(),
                start_char: prose.char_of(anchor.range.start).0,
                previous_end_char: prose.char_of(builder.last).0,
            });
        }

        let limit = anchors.get(idx + 1).map_or(prose.end(), |next| next.range.start);
        let bounds = dialogue_bounds(prose, anchor.range, builder.last, limit);

        if bounds.start > builder.last {
            builder.emit_narrator(TextRange::new(builder.last, bounds.start));
        }
        if idx == 0 {
            leading_synthetic.iter().for_each(|span| builder.emit_synthetic(span));
        }

        builder.emit_dialogue(anchor.span, bounds)?;
        anchor.synthetic_after.iter().for_each(|span| builder.emit_synthetic(span));
        builder.last = bounds.end;
    }

    if builder.last < prose.end() {
        builder.emit_narrator(TextRange::new(builder.last, prose.end()));
    }
    if anchors.is_empty() {
        leading_synthetic.iter().for_each(|span| builder.emit_synthetic(span));
    }

    Ok(builder.finish())
}
