//! Cypher identifier sanitization.
//!
//! Entity labels, property keys, and relationship types are interpolated
//! into Cypher as backtick-quoted identifiers (they cannot be query
//! parameters). Sanitization keeps word characters, whitespace, and
//! hyphens, so Vietnamese labels survive while quoting characters and
//! punctuation are stripped.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use once_cell::sync::Lazy;
use regex::Regex;

/// Relationship type used when sanitization leaves nothing behind.
pub const DEFAULT_REL_TYPE: &str = "RELATED_TO";

static NON_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("static regex: non-identifier"));

static SPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("static regex: space runs"));

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").expect("static regex: non-word"));

/// Sanitizes a node label or property key for backtick quoting.
///
/// Strips backticks, removes everything except word characters (Unicode),
/// whitespace, and hyphens, then trims. The result may be empty.
#[must_use]
pub fn sanitize_identifier(name: &str) -> String {
    let without_backticks = name.replace('`', "");
    NON_IDENTIFIER
        .replace_all(&without_backticks, "")
        .trim()
        .to_string()
}

/// Sanitizes a relationship type into `UPPER_SNAKE` form.
///
/// Applies [`sanitize_identifier`], collapses whitespace and hyphen runs
/// to underscores, replaces any leftover non-word character with an
/// underscore, and uppercases. An empty result falls back to
/// [`DEFAULT_REL_TYPE`].
#[must_use]
pub fn rel_type_safe(rel_type: &str) -> String {
    let sanitized = sanitize_identifier(rel_type);
    let underscored = SPACE_RUNS.replace_all(&sanitized, "_");
    let word_only = NON_WORD.replace_all(&underscored, "_");
    let upper = word_only.to_uppercase();
    if upper.is_empty() {
        DEFAULT_REL_TYPE.to_string()
    } else {
        upper
    }
}

/// Quotes a sanitized identifier in backticks.
#[must_use]
pub fn quote(identifier: &str) -> String {
    format!("`{identifier}`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Person", "Person"; "plain label")]
    #[test_case("Nhân vật", "Nhân vật"; "vietnamese label keeps diacritics")]
    #[test_case("Label`) DETACH DELETE (n", "Label DETACH DELETE n"; "injection characters stripped")]
    #[test_case("  padded  ", "padded"; "trims outer whitespace")]
    #[test_case("!!!", ""; "punctuation only becomes empty")]
    fn test_sanitize_identifier(input: &str, expected: &str) {
        assert_eq!(sanitize_identifier(input), expected);
    }

    #[test_case("chỉ huy", "CHỈ_HUY"; "vietnamese type uppercased and joined")]
    #[test_case("đánh-bại", "ĐÁNH_BẠI"; "hyphen becomes underscore")]
    #[test_case("thuộc   về", "THUỘC_VỀ"; "whitespace runs collapse")]
    #[test_case("", "RELATED_TO"; "empty falls back")]
    #[test_case("!!!", "RELATED_TO"; "punctuation only falls back")]
    #[test_case("lãnh đạo khởi nghĩa", "LÃNH_ĐẠO_KHỞI_NGHĨA"; "multi word")]
    fn test_rel_type_safe(input: &str, expected: &str) {
        assert_eq!(rel_type_safe(input), expected);
    }

    #[test]
    fn test_quote_wraps_backticks() {
        assert_eq!(quote("Person"), "`Person`");
    }
}
