// WHY: Read-only pre-flight check run before a dialogue map is persisted
// Needs no prose, so it can only check speakers and offset consistency

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::segmentation::ClaimedSpan;

/// Outcome of [`validate_dialogue_map`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueMapValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

fn speaker_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Check that every span names a known speaker and has sane offsets
///
/// Speaker names are compared trimmed and case-insensitively. Offsets must be
/// non-negative with `start_char < end_char`, and spans sorted by start must
/// not overlap.
pub fn validate_dialogue_map<S: AsRef<str>>(dialogue_map: &[ClaimedSpan], known_speakers: &[S]) -> DialogueMapValidation {
    let known: HashSet<String> = known_speakers.iter().map(|s| speaker_key(s.as_ref())).collect();
    let mut errors = Vec::new();

    for (idx, span) in dialogue_map.iter().enumerate() {
        if span.speaker.trim().is_empty() {
            errors.push(format!("span {idx}: speaker is empty"));
        } else if !known.contains(&speaker_key(&span.speaker)) {
            errors.push(format!("span {idx}: unknown speaker \"{}\"", span.speaker));
        }

        if span.normalized_quote().is_empty() {
            errors.push(format!("span {idx}: quote is empty"));
        }

        if span.start_char < 0 || span.end_char < 0 {
            errors.push(format!(
                "span {idx}: negative offsets ({}, {})",
                span.start_char, span.end_char
            ));
        } else if span.start_char >= span.end_char {
            errors.push(format!(
                "span {idx}: start_char {} is not before end_char {}",
                span.start_char, span.end_char
            ));
        }
    }

    let mut ordered: Vec<(usize, &ClaimedSpan)> = dialogue_map
        .iter()
        .enumerate()
        .filter(|(_, s)| s.start_char >= 0 && s.start_char < s.end_char)
        .collect();
    ordered.sort_by_key(|(_, s)| s.start_char);
    for pair in ordered.windows(2) {
        let (prev_idx, prev) = pair[0];
        let (idx, span) = pair[1];
        if span.start_char < prev.end_char {
            errors.push(format!(
                "span {idx}: starts at {} inside span {prev_idx} ending at {}",
                span.start_char, prev.end_char
            ));
        }
    }

    DialogueMapValidation {
        valid: errors.is_empty(),
        errors,
    }
}
