//! Math classification: decide whether a paragraph is mathematical.
//!
//! Two kinds of evidence are combined:
//!
//! - **density**: the share of characters drawn from a math-symbol set
//!   (operators, comparisons, large operators, Greek letters);
//! - **structure**: an ordered list of patterns that only appear in math
//!   (LaTeX delimiters and commands, `3/4`, `x_1`, `x^`, equation environments).
//!
//! A paragraph with fewer than `min_symbol_count` symbols and no structural
//! match is never math, so prose with one stray dash or slash stays prose.
//! Otherwise it is math when the density exceeds `ratio_threshold` or any
//! structural pattern matches.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Operators, comparisons, large operators, set/logic symbols, and arrows.
const MATH_SYMBOLS: &str = "=+-*/^_<>±∓×÷·≤≥≠≈≡∝∞∑∏∫∮√∂∇∈∉⊂⊃⊆⊇∪∩∀∃∅∘→←↔⇒⇐⇔↦";

/// Greek variants outside the contiguous alphabet ranges.
const GREEK_VARIANTS: &str = "ϵϑϕϱϖ";

const STRUCTURAL_PATTERNS: &[&str] = &[
    // Display and inline dollar delimiters
    r"\$\$[\s\S]+?\$\$",
    r"\$[^$\n]+\$",
    // \( \) \[ \]
    r"\\[()\[\]]",
    // Backslash commands
    r"\\[a-zA-Z]+",
    // digit/digit fraction
    r"\d+/\d+",
    // Subscript and superscript
    r"[a-zA-Z]_\d",
    r"[a-zA-Z]\^",
    // Equation environments
    r"\\begin\{(?:equation|align|gather|multline|eqnarray|displaymath|math)\*?\}",
];

static STRUCTURAL: Lazy<Vec<Regex>> = Lazy::new(|| {
    STRUCTURAL_PATTERNS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Immutable configuration for [`MathClassifier`].
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    pub symbols: BTreeSet<char>,
    /// Checked in order; the first match wins.
    pub patterns: Vec<Regex>,
    /// Density above which a paragraph counts as math. Default: 0.1.
    pub ratio_threshold: f64,
    /// Paragraphs with fewer symbols need structural evidence. Default: 2.
    pub min_symbol_count: usize,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        let greek = ('\u{0391}'..='\u{03A9}')
            .chain('\u{03B1}'..='\u{03C9}')
            .filter(|c| *c != '\u{03A2}');

        Self {
            symbols: MATH_SYMBOLS
                .chars()
                .chain(GREEK_VARIANTS.chars())
                .chain(greek)
                .collect(),
            patterns: STRUCTURAL.clone(),
            ratio_threshold: 0.1,
            min_symbol_count: 2,
        }
    }
}

/// What the classifier saw in one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct MathEvidence {
    pub symbol_count: usize,
    /// Length in characters.
    pub length: usize,
    pub ratio: f64,
    /// Index into [`ClassifierRules::patterns`] of the first matching pattern.
    pub structural_match: Option<usize>,
}

/// Pure, deterministic math predicate.
#[derive(Debug, Clone, Default)]
pub struct MathClassifier {
    rules: Arc<ClassifierRules>,
}

impl MathClassifier {
    pub fn new(rules: Arc<ClassifierRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    pub fn is_math(&self, paragraph: &str) -> bool {
        self.decide(&self.analyze(paragraph))
    }

    /// Collect the evidence `is_math` decides on.
    pub fn analyze(&self, paragraph: &str) -> MathEvidence {
        let (length, symbol_count) = paragraph.chars().fold((0, 0), |(len, count), c| {
            (len + 1, count + usize::from(self.rules.symbols.contains(&c)))
        });

        let ratio = if length == 0 {
            0.0
        } else {
            symbol_count as f64 / length as f64
        };

        let structural_match = self
            .rules
            .patterns
            .iter()
            .position(|re| re.is_match(paragraph));

        MathEvidence {
            symbol_count,
            length,
            ratio,
            structural_match,
        }
    }

    fn decide(&self, evidence: &MathEvidence) -> bool {
        let structural = evidence.structural_match.is_some();
        if evidence.symbol_count < self.rules.min_symbol_count && !structural {
            return false;
        }
        evidence.ratio > self.rules.ratio_threshold || structural
    }
}
