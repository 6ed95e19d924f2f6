//! Text clean-up shared by every extraction strategy.
//!
//! Markup from different recipe plugins disagrees on whitespace, quantity
//! multipliers, parenthetical notes and even character encoding. Everything an
//! extractor returns goes through [`normalize`] so that results from different
//! strategies can be compared and deduplicated.

use log::debug;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `((...))` groups, removed before single groups.
#[allow(clippy::expect_used)]
static DOUBLE_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\([^)]*\)\)").expect("valid regex"));

/// `(...)` groups. Not nesting-aware.
#[allow(clippy::expect_used)]
static SINGLE_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid regex"));

/// A whole token like `2x` or `1.5x`.
#[allow(clippy::expect_used)]
static MULTIPLIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?x$").expect("valid regex"));

#[allow(clippy::expect_used)]
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// "Step 3:", "3)", "3." at the start of an instruction.
#[allow(clippy::expect_used)]
static STEP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:step\s*)?[0-9]+[.):]\s*").expect("valid regex"));

/// Patterns tried by [`looks_like_ingredient`], in order.
#[allow(clippy::expect_used)]
static INGREDIENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // quantity + unit
        r"\d+\s*(?:cup|tbsp|tsp|oz|gram|g|pound|lb|ml|l|pinch|dash|to taste)",
        // common pantry items
        r"salt|pepper|sugar|flour|oil|butter|water|milk",
        // size descriptors
        r"\d+\s*(?:large|medium|small)",
        // preparation
        r"chopped|minced|diced|sliced|grated|crushed",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

/// Mis-decoded UTF-8 sequences seen on real pages, as read through
/// windows-1252 and through latin-1. Longest sequences first.
const ARTIFACTS: &[(&str, &str)] = &[
    ("ADVERTISEMENT", ""),
    ("Advertisement", ""),
    ("\u{e2}\u{2013}\u{a2}", ""), // checkbox glyph
    ("\u{e2}\u{96}\u{a2}", ""),
    ("\u{e2}\u{2026}\u{201c}", "1/3"),
    ("\u{e2}\u{85}\u{93}", "1/3"),
    ("\u{e2}\u{2026}\u{201d}", "2/3"),
    ("\u{e2}\u{85}\u{94}", "2/3"),
    ("\u{c3}\u{2014}", "x"),
    ("\u{c3}\u{97}", "x"),
    ("\u{c2}\u{bc}", "1/4"),
    ("\u{c2}\u{bd}", "1/2"),
    ("\u{c2}\u{be}", "3/4"),
];

/// Normalizes a single line of recipe text.
///
/// Trims, strips parenthetical asides (double groups first, then single
/// groups), drops quantity multiplier tokens such as `2x`, and collapses
/// whitespace. Never fails; empty input gives empty output.
pub fn normalize(text: &str) -> String {
    let stripped = strip_parentheticals(text.trim());
    remove_multipliers(&stripped)
}

/// Removes `((...))` and then `(...)` groups when the text has both kinds of
/// parenthesis. Nested groups are only partially removed.
pub fn strip_parentheticals(text: &str) -> String {
    let cleaned = text.trim();
    if !(cleaned.contains('(') && cleaned.contains(')')) {
        return cleaned.to_string();
    }

    let cleaned = DOUBLE_PARENS.replace_all(cleaned, "");
    let cleaned = SINGLE_PARENS.replace_all(cleaned.trim(), "");
    cleaned.trim().to_string()
}

/// Drops whitespace-separated multiplier tokens and collapses whitespace.
pub fn remove_multipliers(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| !MULTIPLIER.is_match(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-effort repair of mojibake fractions and advertisement markers.
pub fn repair_artifacts(text: &str) -> String {
    ARTIFACTS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Normalizes every item and keeps the first occurrence of each,
/// compared case-insensitively. Items that normalize to nothing are dropped.
///
/// `kind` only labels the log output.
pub fn dedupe<I, S>(items: I, kind: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for item in items {
        let cleaned = normalize(item.as_ref());
        if cleaned.is_empty() {
            continue;
        }
        if seen.insert(cleaned.to_lowercase()) {
            debug!("Added cleaned {}: '{}'", kind, cleaned);
            unique.push(cleaned);
        }
    }

    debug!("Found {} unique {}s", unique.len(), kind);
    unique
}

/// Heuristic test for "this reads like an ingredient line".
///
/// Deliberately loose: quantities with units, common pantry words, size
/// descriptors or preparation verbs are each enough.
pub fn looks_like_ingredient(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    INGREDIENT_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(&lowered))
}

/// Cleans one instruction candidate. Returns `None` for anything shorter than
/// `min_chars` after cleaning, which is usually a section header.
pub fn clean_instruction(text: &str, min_chars: usize) -> Option<String> {
    let without_tags = HTML_TAG.replace_all(text, "");
    let without_prefix = STEP_PREFIX.replace(without_tags.trim(), "");
    let cleaned = normalize(&without_prefix);

    if cleaned.chars().count() < min_chars {
        return None;
    }
    Some(cleaned)
}

/// Splits a block of text into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_parentheticals() {
        assert_eq!(normalize("  1 cup flour (sifted)  "), "1 cup flour");
        assert_eq!(normalize("2 eggs ((large)) beaten"), "2 eggs beaten");
        assert_eq!(normalize("salt (to taste) and pepper (fresh)"), "salt and pepper");
    }

    #[test]
    fn test_normalize_keeps_unbalanced_parens() {
        assert_eq!(normalize("a) first"), "a) first");
        assert_eq!(normalize("(open only"), "(open only");
    }

    #[test]
    fn test_nested_parens_are_a_known_limitation() {
        // The first closing paren ends the group.
        assert_eq!(normalize("rice (long (basmati) grain) cooked"), "rice grain) cooked");
    }

    #[test]
    fn test_normalize_removes_multipliers() {
        assert_eq!(normalize("2x  1 cup   milk"), "1 cup milk");
        assert_eq!(normalize("1.5x butter"), "butter");
        assert_eq!(normalize("box of 6"), "box of 6");
        assert_eq!(normalize("mix well"), "mix well");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
        assert_eq!(normalize("(only a note)"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "  1 cup flour (sifted)  ",
            "rice (long (basmati) grain) cooked",
            "((a)b) c (d",
            "2(b)x tomatoes",
            "3x  (2x) onions\n\n chopped",
            "))((",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_dedupe_is_case_insensitive_and_ordered() {
        assert_eq!(dedupe(["Salt", "salt", "Pepper"], "ingredient"), vec!["Salt", "Pepper"]);
    }

    #[test]
    fn test_dedupe_compares_after_normalizing() {
        let items = ["1 cup milk (whole)", "1 CUP MILK", "", "  ", "2x eggs", "eggs"];
        assert_eq!(dedupe(items, "ingredient"), vec!["1 cup milk", "eggs"]);
    }

    #[test]
    fn test_looks_like_ingredient() {
        assert!(looks_like_ingredient("2 cups flour, sifted"));
        assert!(looks_like_ingredient("1 tbsp olive oil"));
        assert!(looks_like_ingredient("3 large eggs"));
        assert!(looks_like_ingredient("Onion, diced"));
        assert!(looks_like_ingredient("Salt to taste"));
        assert!(!looks_like_ingredient("Click here to subscribe"));
        assert!(!looks_like_ingredient("Jump to recipe"));
    }

    #[test]
    fn test_clean_instruction_strips_step_prefix() {
        assert_eq!(
            clean_instruction("Step 3: Preheat the oven to 350F", 10),
            Some("Preheat the oven to 350F".to_string())
        );
        assert_eq!(
            clean_instruction("\n  2) Whisk the <b>eggs</b>   well\n", 10),
            Some("Whisk the eggs well".to_string())
        );
        assert_eq!(
            clean_instruction("4. Bake for 20 minutes", 10),
            Some("Bake for 20 minutes".to_string())
        );
    }

    #[test]
    fn test_clean_instruction_drops_short_text() {
        assert_eq!(clean_instruction("Method", 10), None);
        assert_eq!(clean_instruction("Step 1: Mix", 10), None);
        assert_eq!(clean_instruction("", 10), None);
    }

    #[test]
    fn test_repair_artifacts() {
        assert_eq!(repair_artifacts("1Â½ cups milk"), "11/2 cups milk");
        assert_eq!(repair_artifacts("â…“ cup sugar"), "1/3 cup sugar");
        assert_eq!(repair_artifacts("\u{e2}\u{85}\u{94} cup oil"), "2/3 cup oil");
        assert_eq!(repair_artifacts("â–¢ 2 eggs"), " 2 eggs");
        assert_eq!(repair_artifacts("ADVERTISEMENT1 cup rice"), "1 cup rice");
        assert_eq!(repair_artifacts("3Ã—"), "3x");
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(
            split_lines("Boil water.\n\n  Steep tea.  \r\n"),
            vec!["Boil water.", "Steep tea."]
        );
        assert!(split_lines("   ").is_empty());
    }
}
