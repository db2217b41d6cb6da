//! Text helpers shared by the quality, dedup and selection stages.
//!
//! All comparisons in the digest engine run over the same normalised form:
//! NFKC folded, lower-cased, non-alphanumeric characters removed and
//! whitespace collapsed to single spaces.

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;
use xxhash_rust::xxh3::xxh3_64;

/// Maximum length (in characters) of a headline dedup key.
pub const HEADLINE_KEY_LEN: usize = 60;

/// Hash text with XXH3.
#[must_use]
pub fn hash_text(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Normalise text for comparison.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the fuzzy dedup key for a headline.
///
/// The key is the normalised headline with a trailing `pdf` marker removed,
/// truncated to [`HEADLINE_KEY_LEN`] characters. Normalisation drops the
/// punctuation first, so `Notice.pdf`, `Notice (PDF)` and `Notice pdf` all
/// reduce to `notice`.
#[must_use]
pub fn headline_key(headline: &str) -> String {
    let normalized = normalize_text(headline);
    let stripped = normalized
        .strip_suffix("pdf")
        .map_or(normalized.as_str(), str::trim_end);
    let truncated: String = stripped.chars().take(HEADLINE_KEY_LEN).collect();
    truncated.trim_end().to_string()
}

/// Count alphabetic characters.
#[must_use]
pub fn alphabetic_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphabetic()).count()
}

/// Whether `text` contains `run` or more consecutive alphabetic characters.
#[must_use]
pub fn has_alpha_run(text: &str, run: usize) -> bool {
    let mut current = 0usize;
    for c in text.chars() {
        if c.is_alphabetic() {
            current += 1;
            if current >= run {
                return true;
            }
        } else {
            current = 0;
        }
    }
    false
}

/// Unique-word ratio of a text, with the total word count.
///
/// Returns `(ratio, words)`; an empty text yields `(1.0, 0)`.
#[must_use]
pub fn word_uniqueness(text: &str) -> (f64, usize) {
    let words: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();
    if words.is_empty() {
        return (1.0, 0);
    }
    let unique: std::collections::HashSet<&str> = words.iter().map(String::as_str).collect();
    #[allow(clippy::cast_precision_loss)]
    let ratio = unique.len() as f64 / words.len() as f64;
    (ratio, words.len())
}

/// Whether a normalised haystack contains a normalised phrase on word boundaries.
#[must_use]
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {haystack} ").contains(&format!(" {phrase} "))
}

/// Detect phone-number fragments such as `0800 123 4567` or `+44 20 7066 1000`.
///
/// A fragment starts with `0` or `+` and carries at least ten digits, allowing
/// spaces, dashes and brackets in between.
#[must_use]
pub fn contains_phone_fragment(text: &str) -> bool {
    let mut digits = 0usize;
    let mut in_run = false;
    let mut prev: Option<char> = None;
    for c in text.chars() {
        let at_boundary = prev.is_none_or(|p| !p.is_alphanumeric());
        prev = Some(c);
        if in_run {
            if c.is_ascii_digit() {
                digits += 1;
                if digits >= 10 {
                    return true;
                }
                continue;
            }
            if matches!(c, ' ' | '-' | '(' | ')') {
                continue;
            }
            in_run = false;
        }
        if at_boundary && (c == '0' || c == '+') {
            in_run = true;
            digits = usize::from(c == '0');
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_punctuation_and_case() {
        assert_eq!(
            normalize_text("  FCA's  Consumer-Duty: update!  "),
            "fcas consumerduty update"
        );
    }

    #[test]
    fn headline_key_drops_pdf_marker_and_truncates() {
        assert_eq!(
            headline_key("Policy Statement PS24/3 (PDF)"),
            "policy statement ps243"
        );
        assert_eq!(
            headline_key("Policy Statement PS24/3.pdf"),
            headline_key("Policy Statement PS24/3")
        );
        let long = "a ".repeat(80);
        assert!(headline_key(&long).chars().count() <= HEADLINE_KEY_LEN);
    }

    #[test]
    fn alpha_run_detection() {
        assert!(has_alpha_run("12 abc 34", 3));
        assert!(!has_alpha_run("1a2b3c 4d", 3));
    }

    #[test]
    fn word_uniqueness_flags_repetition() {
        let (ratio, words) = word_uniqueness("rates rates rates rates rates rates rise");
        assert_eq!(words, 7);
        assert!(ratio < 0.4);
    }

    #[test]
    fn phrase_matching_respects_word_boundaries() {
        assert!(contains_phrase("the bank of england said", "bank of england"));
        assert!(!contains_phrase("embankment works", "bank"));
    }

    #[test]
    fn phone_fragments_are_detected() {
        assert!(contains_phone_fragment("Call 0800 123 4567 now"));
        assert!(contains_phone_fragment("Switchboard +44 (20) 7066 1000"));
        assert!(!contains_phone_fragment("Rules for 2024 2025 2026 periods"));
    }
}
