// WHY: Quote glyph handling shared by the verifier, relocator and builder
// Every stage must strip, open and close quotes identically or their positions drift apart

use regex_automata::{meta::Regex, Input};
use std::sync::OnceLock;

/// Characters that may open a quotation
pub const OPENING_QUOTES: &[char] = &['"', '\u{201C}', '\'', '\u{2018}'];

/// Quote styles tried when wrapping a bare quote for exact search: `"…"`, `“…”`, `'…'`, `‘…’`
pub const WRAPPING_STYLES: &[(char, char)] =
    &[('"', '"'), ('\u{201C}', '\u{201D}'), ('\'', '\''), ('\u{2018}', '\u{2019}')];

/// Paired double quotes, straight or curly. Single quotes are left out because
/// apostrophes make them unpairable with a regex.
const QUOTED_SPAN_PATTERN: &str = r"\x22[^\x22]+\x22|\u{201C}[^\u{201D}]+\u{201D}";

static QUOTED_SPAN_REGEX: OnceLock<Regex> = OnceLock::new();

fn quoted_span_regex() -> &'static Regex {
    QUOTED_SPAN_REGEX.get_or_init(|| {
        Regex::new(QUOTED_SPAN_PATTERN).expect("quoted span pattern is a valid regex")
    })
}

/// Any straight or curly quotation glyph
pub fn is_quote_glyph(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}')
}

/// Glyphs that can open a quotation (straight quotes open and close)
pub fn is_opening_glyph(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '\u{201C}' | '\u{2018}')
}

pub fn is_closing_glyph(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '\u{201D}' | '\u{2019}')
}

/// Closing glyph paired with an opening glyph
pub fn closing_glyph(opener: char) -> Option<char> {
    match opener {
        '"' => Some('"'),
        '\'' => Some('\''),
        '\u{201C}' => Some('\u{201D}'),
        '\u{2018}' => Some('\u{2019}'),
        _ => None,
    }
}

/// Strip leading/trailing quote glyphs and whitespace
pub fn normalize_quote(text: &str) -> String {
    strip_quote_edges(text).to_string()
}

/// Borrowing form of [`normalize_quote`]
pub fn strip_quote_edges(text: &str) -> &str {
    text.trim_matches(|c: char| is_quote_glyph(c) || c.is_whitespace())
}

/// First `n` characters of `text`
pub fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Last `n` characters of `text`
pub fn char_suffix(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((byte, _)) => &text[byte..],
        None => text,
    }
}

// An apostrophe sits between two letters: don't, Jensen's
fn is_apostrophe(prev: Option<char>, ch: char, next: Option<char>) -> bool {
    matches!(ch, '\'' | '\u{2019}')
        && prev.is_some_and(char::is_alphanumeric)
        && next.is_some_and(char::is_alphanumeric)
}

/// Find the end (exclusive byte offset) of the quotation opened at `open`
///
/// Tracks nesting depth for curly pairs, where opener and closer differ.
/// Straight quotes cannot nest, so the next matching straight glyph closes.
/// Returns `None` when `open` is not an opening glyph or no closer exists.
pub fn find_closing_quote(text: &str, open: usize) -> Option<usize> {
    let tail = text.get(open..)?;
    let mut chars = tail.char_indices().peekable();
    let (_, opener) = chars.next()?;
    let closer = closing_glyph(opener)?;
    let single = matches!(closer, '\'' | '\u{2019}');

    let mut depth = 1usize;
    let mut prev = Some(opener);

    while let Some((offset, ch)) = chars.next() {
        let next = chars.peek().map(|(_, c)| *c);

        if single && is_apostrophe(prev, ch, next) {
            prev = Some(ch);
            continue;
        }

        if ch == closer {
            depth -= 1;
            if depth == 0 {
                return Some(open + offset + ch.len_utf8());
            }
        } else if ch == opener && opener != closer {
            depth += 1;
        }
        prev = Some(ch);
    }

    None
}

/// Byte ranges of every paired double-quote span starting at or after `from`
pub fn quoted_spans_from(text: &str, from: usize) -> Vec<(usize, usize)> {
    if from > text.len() {
        return Vec::new();
    }
    let input = Input::new(text).range(from..);
    quoted_span_regex()
        .find_iter(input)
        .map(|m| (m.start(), m.end()))
        .collect()
}
