//! Text normalisation: repair typographic artefacts left by layout extraction.
//!
//! Runs on a whole reconstructed page (not per paragraph) so blank lines at
//! block boundaries collapse correctly. The transform is pure and idempotent:
//! `normalize(normalize(x)) == normalize(x)` for every input when the default
//! [`NormalizerRules`] are used.
//!
//! ## Rule Order
//!
//! 1. Control characters other than `\n`, `\t` and `\r` are removed, then the
//!    substitution table runs (line endings, ligatures, minus variants,
//!    separators, invisible characters, and literal `\\` line breaks)
//! 2. Collapse runs of horizontal whitespace to one space
//! 3. Collapse 3+ consecutive blank lines to one blank line
//! 4. Strip every line
//! 5. Drop empty lines, keeping exactly one blank line between paragraphs
//! 6. *(opt-in)* Split words glued at a lower→upper case boundary
//!
//! Step 6 is off by default: it splits `camelCase` identifiers and names such
//! as `McDonald` as readily as genuinely glued words.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t\p{Zs}]+").unwrap());

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

static RE_GLUED_WORDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").unwrap());

/// Immutable configuration for [`TextNormalizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerRules {
    /// Literal `(from, to)` replacements, applied in order.
    pub substitutions: Vec<(String, String)>,
    /// Enable rule 6 (lower→upper case word splitting).
    pub split_glued_words: bool,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        let table: &[(&str, &str)] = &[
            // Line endings first so later rules only ever see `\n`.
            ("\r\n", "\n"),
            ("\r", "\n"),
            // Ligatures
            ("\u{FB00}", "ff"),
            ("\u{FB01}", "fi"),
            ("\u{FB02}", "fl"),
            ("\u{FB03}", "ffi"),
            ("\u{FB04}", "ffl"),
            ("\u{FB05}", "st"),
            ("\u{FB06}", "st"),
            // Minus variants
            ("\u{2212}", "-"),
            ("\u{FE63}", "-"),
            ("\u{FF0D}", "-"),
            // Unicode line / paragraph separators
            ("\u{2028}", " "),
            ("\u{2029}", "\n"),
            ("\u{2026}", "..."),
            // Invisible characters
            ("\u{200B}", ""),
            ("\u{200C}", ""),
            ("\u{200D}", ""),
            ("\u{2060}", ""),
            ("\u{FEFF}", ""),
            ("\u{00AD}", ""),
            ("  ", " "),
            // Escaped line breaks; must stay after every removal above.
            ("\\\\", "\n"),
        ];

        Self {
            substitutions: table
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            split_glued_words: false,
        }
    }
}

/// Stateless text normaliser; cheap to clone and share across page workers.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    rules: Arc<NormalizerRules>,
}

impl TextNormalizer {
    pub fn new(rules: Arc<NormalizerRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &NormalizerRules {
        &self.rules
    }

    /// Apply all rules in order.
    pub fn normalize(&self, input: &str) -> String {
        let s = strip_control_chars(input, &['\n', '\t', '\r']);
        let s = apply_substitutions(&s, &self.rules.substitutions);
        let s = strip_control_chars(&s, &['\n', '\t']);
        let s = collapse_horizontal_whitespace(&s);
        let s = collapse_blank_lines(&s);
        let s = strip_lines(&s);
        let s = drop_empty_lines(&s);
        if self.rules.split_glued_words {
            split_glued_words(&s)
        } else {
            s
        }
    }
}

// ── Rule 1: Substitution table ───────────────────────────────────────────────

fn apply_substitutions(input: &str, table: &[(String, String)]) -> String {
    let mut s = input.to_string();
    for (from, to) in table {
        if !from.is_empty() && s.contains(from.as_str()) {
            s = s.replace(from.as_str(), to);
        }
    }
    s
}

fn strip_control_chars(input: &str, keep: &[char]) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || keep.contains(c))
        .collect()
}

// ── Rule 2: Horizontal whitespace ────────────────────────────────────────────

fn collapse_horizontal_whitespace(input: &str) -> String {
    RE_HORIZONTAL_WS.replace_all(input, " ").into_owned()
}

// ── Rule 3: Blank-line runs ──────────────────────────────────────────────────

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}

// ── Rule 4: Strip lines ──────────────────────────────────────────────────────

fn strip_lines(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Drop empty lines, keep paragraph breaks ──────────────────────────

fn drop_empty_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut paragraph_break = false;

    for line in input.split('\n') {
        if line.is_empty() {
            paragraph_break = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if paragraph_break { "\n\n" } else { "\n" });
        }
        paragraph_break = false;
        out.push_str(line);
    }

    out
}

// ── Rule 6: Glued words (opt-in) ─────────────────────────────────────────────

fn split_glued_words(input: &str) -> String {
    RE_GLUED_WORDS.replace_all(input, "$1 $2").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalize(s: &str) -> String {
        TextNormalizer::default().normalize(s)
    }

    #[test]
    fn four_newlines_become_one_blank_line() {
        assert_eq!(normalize("A\n\n\n\nB"), "A\n\nB");
    }

    #[test]
    fn single_blank_line_is_preserved() {
        assert_eq!(normalize("A\n\nB"), "A\n\nB");
        assert_eq!(normalize("A\nB"), "A\nB");
    }

    #[test]
    fn whitespace_only_lines_count_as_blank() {
        assert_eq!(normalize("A\n  \n\t\n \nB"), "A\n\nB");
        assert_eq!(normalize("A\n \nB"), "A\n\nB");
    }

    #[test]
    fn ligatures_and_minus_are_repaired() {
        assert_eq!(normalize("e\u{FB03}cient \u{FB01}eld"), "efficient field");
        assert_eq!(normalize("x \u{2212} y"), "x - y");
    }

    #[test]
    fn separators_and_ellipsis() {
        assert_eq!(normalize("one\u{2028}two"), "one two");
        assert_eq!(normalize("one\u{2029}two"), "one\ntwo");
        assert_eq!(normalize("wait\u{2026}"), "wait...");
    }

    #[test]
    fn horizontal_whitespace_collapses_and_lines_are_stripped() {
        assert_eq!(normalize("  a \t\t b  \n   c   "), "a b\nc");
        assert_eq!(normalize("a\u{00A0}\u{2003}b"), "a b");
    }

    #[test]
    fn crlf_and_control_chars() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(normalize("a\u{0007}b\u{000C}c"), "abc");
    }

    #[test]
    fn literal_double_backslash_is_a_line_break() {
        assert_eq!(normalize("a \\\\ b"), "a\nb");
        assert_eq!(normalize("x\\\\\\y"), "x\n\\y");
    }

    #[test]
    fn backslashes_joined_by_removed_characters_are_stable() {
        for input in ["a\\\u{200B}\\b", "a\\\u{0007}\\b"] {
            let once = normalize(input);
            assert_eq!(once, "a\nb");
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn invisible_characters_are_removed() {
        assert_eq!(normalize("zero\u{200B}width\u{FEFF}"), "zerowidth");
    }

    #[test]
    fn leading_and_trailing_blank_lines_vanish() {
        assert_eq!(normalize("\n\n\n  text \n\n\n"), "text");
    }

    #[test]
    fn empty_input_is_fine() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t\n"), "");
    }

    #[test]
    fn glued_word_split_is_off_by_default() {
        assert_eq!(normalize("endOfSentence"), "endOfSentence");
    }

    #[test]
    fn glued_word_split_when_enabled() {
        let n = TextNormalizer::new(Arc::new(NormalizerRules {
            split_glued_words: true,
            ..Default::default()
        }));
        assert_eq!(n.normalize("the endStart of it"), "the end Start of it");
        assert_eq!(n.normalize("ABC stays"), "ABC stays");
    }

    #[test]
    fn custom_table_is_used() {
        let n = TextNormalizer::new(Arc::new(NormalizerRules {
            substitutions: vec![("teh".into(), "the".into())],
            split_glued_words: false,
        }));
        assert_eq!(n.normalize("teh cat"), "the cat");
        // Default ligature repair is gone with a replaced table.
        assert_eq!(n.normalize("\u{FB01}"), "\u{FB01}");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in any::<String>()) {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_on_layout_like_text(
            s in "[a-zA-Z \t\n\r\u{FB01}\u{2212}\u{2029}\u{00A0}]{0,64}"
        ) {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn glued_split_is_idempotent(s in "[a-zA-Z \n]{0,48}") {
            let n = TextNormalizer::new(Arc::new(NormalizerRules {
                split_glued_words: true,
                ..Default::default()
            }));
            let once = n.normalize(&s);
            prop_assert_eq!(n.normalize(&once), once);
        }

        #[test]
        fn never_more_than_one_blank_line(s in "[ab \n]{0,64}") {
            let out = normalize(&s);
            prop_assert!(!out.contains("\n\n\n"));
            prop_assert!(!out.starts_with('\n'));
            prop_assert!(!out.ends_with('\n'));
        }
    }
}
