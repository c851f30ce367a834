//! Query cleanup applied before embedding.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Punctuation kept in normalized queries.
const KEPT_PUNCTUATION: &[char] = &['.', ',', '?', '!', '-', '\''];

/// Normalize a raw query: lowercase, drop unsupported characters, collapse whitespace.
///
/// Characters are dropped before whitespace is collapsed, so removing a symbol
/// between two spaces never leaves a double space behind. The result is
/// therefore stable under repeated application.
pub fn normalize_query(raw: &str) -> String {
    let kept: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || KEPT_PUNCTUATION.contains(c))
        .collect();

    let normalized = WHITESPACE_RUN.replace_all(&kept, " ").trim().to_string();
    tracing::debug!(raw, normalized = %normalized, "normalized query");
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_keeps_basic_punctuation() {
        assert_eq!(normalize_query("Where is the CAT??"), "where is the cat??");
        assert_eq!(normalize_query("It's well-known, right!"), "it's well-known, right!");
    }

    #[test]
    fn test_collapses_whitespace_and_trims() {
        assert_eq!(normalize_query("  hello \n\t world  "), "hello world");
        assert_eq!(normalize_query("\r\n"), "");
    }

    #[test]
    fn test_strips_other_characters() {
        assert_eq!(normalize_query("price: $5 (approx) #tag"), "price 5 approx tag");
        assert_eq!(normalize_query("snake_case@home"), "snakecasehome");
    }

    #[test]
    fn test_removed_symbol_between_spaces_leaves_single_space() {
        assert_eq!(normalize_query("cats & dogs"), "cats dogs");
        assert_eq!(normalize_query("a * * b"), "a b");
    }

    #[test]
    fn test_keeps_unicode_letters_and_digits() {
        assert_eq!(normalize_query("Ünïcode ÀÉ 42"), "ünïcode àé 42");
    }

    #[test]
    fn test_idempotent_and_canonical() {
        let samples = [
            "Where is the CAT??",
            "  Mixed\tCASE  \n text -- with 'quotes' ",
            "~~~",
            "a  @  b",
            "",
            "ÇA VA? Très bien!",
        ];
        for raw in samples {
            let once = normalize_query(raw);
            assert_eq!(normalize_query(&once), once, "not idempotent for {raw:?}");
            assert_eq!(once, once.to_lowercase());
            assert!(!once.contains("  "));
            assert_eq!(once, once.trim());
        }
    }
}
