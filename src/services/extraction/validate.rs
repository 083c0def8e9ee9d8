//! Extracted-text validation and language tagging.
//!
//! Validation is length-only: script-specific checks (e.g. requiring
//! Arabic ranges) reject valid text in other scripts, so acceptance is
//! decided purely on trimmed character count. Language tagging scans
//! for characters in a fixed set of Unicode ranges, one per language
//! family.

/// Why a candidate text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing left after trimming.
    Empty,
    /// Text present but below the minimum length.
    TooShort { length: usize },
}

/// Validate candidate text, returning the trimmed slice when accepted.
pub fn validate(text: &str, min_chars: usize) -> Result<&str, Rejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }
    let length = trimmed.chars().count();
    if length < min_chars {
        return Err(Rejection::TooShort { length });
    }
    Ok(trimmed)
}

/// Language families reported by the tagger, in reporting order.
const FAMILIES: [&str; 9] = [
    "arabic",
    "chinese",
    "japanese",
    "korean",
    "cyrillic",
    "hebrew",
    "thai",
    "devanagari",
    "latin",
];

/// Map a character to its language family, if it falls in a tagged range.
fn family_of(c: char) -> Option<usize> {
    let family = match c {
        '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' => 0, // Arabic + supplement
        '\u{4E00}'..='\u{9FFF}' => 1,                           // CJK unified ideographs
        '\u{3040}'..='\u{30FF}' => 2,                           // Hiragana + Katakana
        '\u{AC00}'..='\u{D7AF}' => 3,                           // Hangul syllables
        '\u{0400}'..='\u{04FF}' => 4,
        '\u{0590}'..='\u{05FF}' => 5,
        '\u{0E00}'..='\u{0E7F}' => 6,
        '\u{0900}'..='\u{097F}' => 7,
        'A'..='Z' | 'a'..='z' | '\u{00C0}'..='\u{024F}' => 8, // Latin incl. extended
        _ => return None,
    };
    Some(family)
}

/// Tag the language families present in `text`.
///
/// All matching families are reported comma-joined; `"unknown"` when no
/// tagged range matches (digits, punctuation, symbols only).
pub fn tag_languages(text: &str) -> String {
    let mut seen = [false; FAMILIES.len()];
    for c in text.chars() {
        if let Some(index) = family_of(c) {
            seen[index] = true;
        }
    }

    let found: Vec<&str> = FAMILIES
        .iter()
        .enumerate()
        .filter(|(i, _)| seen[*i])
        .map(|(_, name)| *name)
        .collect();

    if found.is_empty() {
        "unknown".to_string()
    } else {
        found.join(", ")
    }
}
