// WHY: Small pure string-similarity heuristics with their thresholds passed in
// The thresholds are tunable policy (see SegmentationConfig), not algorithmic constants

use std::collections::HashSet;

use super::quotes::{char_prefix, char_suffix};

/// How closely extracted dialogue text matches its claimed quote
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContentMatch {
    Exact,
    /// One text contains the other
    Substring,
    /// Opening and closing characters agree, only interior wording drifted
    FuzzyEdges,
    /// Fraction of claimed words present in the extracted text
    WordOverlap(f64),
}

impl ContentMatch {
    /// Whether the match is acceptable given the minimum word overlap
    pub fn is_acceptable(&self, min_word_overlap: f64) -> bool {
        match self {
            ContentMatch::WordOverlap(ratio) => *ratio >= min_word_overlap,
            _ => true,
        }
    }
}

// The shorter side must span at least `min_coverage` of `reference_chars`
fn covers(shorter: &str, longer: &str, reference_chars: usize, min_coverage: f64) -> bool {
    let shorter_chars = shorter.chars().count().min(longer.chars().count());
    shorter_chars as f64 >= reference_chars as f64 * min_coverage
}

/// Prefix-overlap check used by position verification
///
/// Truncates both texts to `prefix_chars` and accepts when either prefix
/// contains the other and the shorter one covers at least `min_coverage`
/// of the compared quote prefix. Empty input never matches.
pub fn prefix_overlap(actual: &str, quote: &str, prefix_chars: usize, min_coverage: f64) -> bool {
    if actual.is_empty() || quote.is_empty() {
        return false;
    }
    let a = char_prefix(actual, prefix_chars);
    let q = char_prefix(quote, prefix_chars);
    covers(a, q, q.chars().count(), min_coverage) && (a.contains(q) || q.contains(a))
}

/// First and last `edge_chars` characters of both texts agree
pub fn edges_match(a: &str, b: &str, edge_chars: usize) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    char_prefix(a, edge_chars) == char_prefix(b, edge_chars)
        && char_suffix(a, edge_chars) == char_suffix(b, edge_chars)
}

/// Lowercased word tokens; apostrophes inside a word are kept (`don't`)
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|w| w.trim_matches(|c: char| c == '\'' || c == '\u{2019}'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Fraction of distinct claimed words that also appear in the extracted text
pub fn word_overlap_ratio(claim: &str, extracted: &str) -> f64 {
    let claim_words: HashSet<String> = words(claim).into_iter().collect();
    let extracted_words: HashSet<String> = words(extracted).into_iter().collect();

    if claim_words.is_empty() {
        return if extracted_words.is_empty() { 1.0 } else { 0.0 };
    }

    let shared = claim_words.intersection(&extracted_words).count();
    shared as f64 / claim_words.len() as f64
}

/// Escalating comparison: exact, substring either way, fuzzy edges, word overlap
///
/// A substring only counts when the shorter text covers `min_coverage` of the claim.
pub fn classify_content(extracted: &str, claim: &str, edge_chars: usize, min_coverage: f64) -> ContentMatch {
    if extracted == claim {
        return ContentMatch::Exact;
    }
    if !extracted.is_empty()
        && !claim.is_empty()
        && (extracted.contains(claim) || claim.contains(extracted))
        && covers(extracted, claim, claim.chars().count(), min_coverage)
    {
        return ContentMatch::Substring;
    }
    if edges_match(extracted, claim, edge_chars) {
        return ContentMatch::FuzzyEdges;
    }
    ContentMatch::WordOverlap(word_overlap_ratio(claim, extracted))
}

/// The longest distinct words of at least `min_chars` characters, longest first
///
/// Ties keep their order of appearance so results are deterministic.
pub fn distinctive_words(text: &str, min_chars: usize, count: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut candidates: Vec<String> = words(text)
        .into_iter()
        .filter(|w| w.chars().count() >= min_chars)
        .filter(|w| seen.insert(w.clone()))
        .collect();

    candidates.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    candidates.truncate(count);
    candidates
}

/// Number of `targets` present as whole words in `text`
pub fn count_word_hits(text: &str, targets: &[String]) -> usize {
    let present: HashSet<String> = words(text).into_iter().collect();
    targets.iter().filter(|t| present.contains(t.as_str())).count()
}
