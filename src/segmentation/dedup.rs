// WHY: Narrator gaps are cut from stale offsets, so they can leak dialogue text or
// start with the tail of a word. These passes clean a narrator candidate before emission

use super::quotes::{is_closing_glyph, is_quote_glyph};
use super::types::DuplicateKind;
use crate::config::DedupMode;

/// Lowercase words that may legitimately open narration glued to punctuation
const STANDALONE_WORDS: &[&str] = &[
    "ah", "again", "fine", "hmm", "no", "now", "oh", "ok", "okay", "right", "so", "sure", "then", "too",
    "well", "yes",
];

/// Case-folded text with the byte offset of every char (plus a sentinel)
#[derive(Debug, Clone)]
struct Folded {
    chars: Vec<char>,
    offsets: Vec<usize>,
}

impl Folded {
    fn new(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        for (byte, ch) in text.char_indices() {
            // One-to-one fold keeps char indices aligned with the original text
            chars.push(ch.to_lowercase().next().unwrap_or(ch));
            offsets.push(byte);
        }
        offsets.push(text.len());
        Self { chars, offsets }
    }

    /// Char index ranges where `needle` occurs on word boundaries
    fn find_words(&self, needle: &[char]) -> Vec<(usize, usize)> {
        let n = needle.len();
        if n == 0 || n > self.chars.len() {
            return Vec::new();
        }
        let mut hits = Vec::new();
        let mut i = 0;
        while i + n <= self.chars.len() {
            let before_ok = i == 0 || !self.chars[i - 1].is_alphanumeric();
            let after_ok = i + n == self.chars.len() || !self.chars[i + n].is_alphanumeric();
            if before_ok && after_ok && self.chars[i..i + n] == *needle {
                hits.push((i, i + n));
                i += n;
            } else {
                i += 1;
            }
        }
        hits
    }
}

fn trim_non_alphanumeric(text: &str) -> &str {
    text.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Dialogue quote prepared for duplicate comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownQuote {
    folded: Vec<char>,
}

impl KnownQuote {
    /// Fold a quote; `None` when it is too short to compare safely
    pub fn new(quote: &str, min_chars: usize) -> Option<Self> {
        let core = trim_non_alphanumeric(quote);
        let folded: Vec<char> = Folded::new(core).chars;
        if folded.is_empty() || folded.len() < min_chars {
            return None;
        }
        Some(Self { folded })
    }

    pub fn char_len(&self) -> usize {
        self.folded.len()
    }
}

/// Result of duplicate suppression on one narrator candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suppression {
    /// Candidate survives unchanged (trimmed)
    Keep(String),
    /// Echoed quotes were cut out (aggressive mode)
    Rewritten { text: String, kind: DuplicateKind },
    /// Entire candidate dropped
    Removed(DuplicateKind),
}

/// Compare a narrator candidate against every known dialogue quote
///
/// Exact and dominant duplicates are removed in both modes. A minor echo is
/// left alone in conservative mode and cut out in aggressive mode.
pub fn suppress_duplicates(
    candidate: &str,
    quotes: &[KnownQuote],
    mode: DedupMode,
    dominant_ratio: f64,
) -> Suppression {
    let trimmed = candidate.trim();
    let core = trim_non_alphanumeric(trimmed);
    if core.is_empty() || quotes.is_empty() {
        return Suppression::Keep(trimmed.to_string());
    }

    let core_folded = Folded::new(core);
    let core_len = core_folded.chars.len();

    if quotes.iter().any(|q| q.folded == core_folded.chars) {
        return Suppression::Removed(DuplicateKind::ExactMatch);
    }

    let folded = Folded::new(trimmed);
    let mut echoes: Vec<(usize, usize)> = Vec::new();
    for quote in quotes {
        let hits = folded.find_words(&quote.folded);
        if hits.is_empty() {
            continue;
        }
        if quote.char_len() as f64 / core_len as f64 > dominant_ratio {
            return Suppression::Removed(DuplicateKind::Dominant);
        }
        echoes.extend(hits);
    }

    if echoes.is_empty() || mode == DedupMode::Conservative {
        return Suppression::Keep(trimmed.to_string());
    }

    let text = cut_echoes(trimmed, &folded, echoes);
    if trim_non_alphanumeric(&text).is_empty() {
        Suppression::Removed(DuplicateKind::Echo)
    } else {
        Suppression::Rewritten { text, kind: DuplicateKind::Echo }
    }
}

// Remove echo ranges plus the punctuation and whitespace that trail them.
// Whitespace is only collapsed where a cut joins two kept pieces.
fn cut_echoes(text: &str, folded: &Folded, mut echoes: Vec<(usize, usize)>) -> String {
    echoes.sort_unstable();

    let mut pieces: Vec<&str> = Vec::new();
    let mut keep_from = 0usize;
    for (start, end) in echoes {
        if start < keep_from {
            continue;
        }
        pieces.push(&text[folded.offsets[keep_from]..folded.offsets[start]]);
        let mut resume = end;
        while resume < folded.chars.len() {
            let ch = folded.chars[resume];
            if matches!(ch, '.' | ',' | '!' | '?' | ';' | ':') || is_closing_glyph(ch) || ch.is_whitespace() {
                resume += 1;
            } else {
                break;
            }
        }
        keep_from = resume;
    }
    pieces.push(&text[folded.offsets[keep_from]..]);

    let last = pieces.len() - 1;
    let mut result = String::with_capacity(text.len());
    for (idx, piece) in pieces.into_iter().enumerate() {
        let piece = if idx > 0 { piece.trim_start() } else { piece };
        let piece = if idx < last { piece.trim_end() } else { piece };
        if piece.is_empty() {
            continue;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(piece);
    }
    result
}

/// Strip an orphaned word tail left by an off-by-a-few boundary (`ensen? she asked`)
///
/// A leading lowercase word of at most `max_chars` glued directly to
/// punctuation or a closing glyph is dropped with that punctuation.
/// An apostrophe followed by a letter (`he'd`, `mom's`) is a contraction
/// or possessive, not a closing glyph.
/// Returns `None` when the text does not start with such a fragment.
pub fn trim_leading_fragment(text: &str, max_chars: usize) -> Option<&str> {
    let text = text.trim_start();
    let word_end = text.find(|c: char| !c.is_alphabetic()).unwrap_or(text.len());
    let word = &text[..word_end];
    let word_chars = word.chars().count();

    if word_chars == 0 || word_chars > max_chars || !word.chars().all(char::is_lowercase) {
        return None;
    }
    if STANDALONE_WORDS.contains(&word) {
        return None;
    }

    let rest = &text[word_end..];
    let mut after = rest.chars();
    let glued = after.next()?;
    if matches!(glued, '\'' | '\u{2019}') && after.next().is_some_and(char::is_alphabetic) {
        return None;
    }
    if !(matches!(glued, '?' | '!' | '.' | ',' | ';' | ':') || is_closing_glyph(glued)) {
        return None;
    }

    let remainder = rest.trim_start_matches(|c: char| {
        matches!(c, '?' | '!' | '.' | ',' | ';' | ':') || is_quote_glyph(c) || c.is_whitespace()
    });
    Some(remainder)
}

/// Short leftovers made only of punctuation, e.g. `,` or `."`
pub fn is_punctuation_residue(text: &str, max_chars: usize) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= max_chars && !trimmed.chars().any(char::is_alphanumeric)
}
