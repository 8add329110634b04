//! LaTeX formatting of paragraphs classified as math.
//!
//! ## Rule Order
//!
//! Each line is rewritten by five passes, in this order; later passes rely on
//! the output of earlier ones (e.g. `α_1` must already read `\alpha_1` before
//! the subscript pass can brace it):
//!
//! 1. Symbol → command substitution (`±` → `\pm`, `α` → `\alpha`, `→` → `\rightarrow`)
//! 2. Subscripts: `x_1` → `x_{1}`
//! 3. Superscripts: `c^2` → `c^{2}`
//! 4. Fractions: `3/4` → `\frac{3}{4}`
//! 5. Parentheses: `(a+b)` → `\left(a+b\right)`
//!
//! Wrapping is decided once, from the raw paragraph: a paragraph with an
//! internal line break becomes display math (`\[ … \]`, lines joined with
//! `\\`), anything else becomes inline math (`\( … \)`).

use crate::model::MathSegment;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

static RE_SUBSCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z])_(\d+|[a-zA-Z])").unwrap());

static RE_SUPERSCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z\d])\^(\d+|[a-zA-Z])").unwrap());

static RE_FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)/(\d+)").unwrap());

const SYMBOL_COMMANDS: &[(char, &str)] = &[
    // Operators and relations
    ('±', r"\pm"),
    ('∓', r"\mp"),
    ('×', r"\times"),
    ('÷', r"\div"),
    ('·', r"\cdot"),
    ('≤', r"\leq"),
    ('≥', r"\geq"),
    ('≠', r"\neq"),
    ('≈', r"\approx"),
    ('≡', r"\equiv"),
    ('∝', r"\propto"),
    ('∞', r"\infty"),
    // Large operators
    ('∑', r"\sum"),
    ('∏', r"\prod"),
    ('∫', r"\int"),
    ('∮', r"\oint"),
    ('√', r"\sqrt"),
    ('∂', r"\partial"),
    ('∇', r"\nabla"),
    // Sets and logic
    ('∈', r"\in"),
    ('∉', r"\notin"),
    ('⊂', r"\subset"),
    ('⊃', r"\supset"),
    ('⊆', r"\subseteq"),
    ('⊇', r"\supseteq"),
    ('∪', r"\cup"),
    ('∩', r"\cap"),
    ('∀', r"\forall"),
    ('∃', r"\exists"),
    ('∅', r"\emptyset"),
    ('∘', r"\circ"),
    // Arrows
    ('→', r"\rightarrow"),
    ('←', r"\leftarrow"),
    ('↔', r"\leftrightarrow"),
    ('⇒', r"\Rightarrow"),
    ('⇐', r"\Leftarrow"),
    ('⇔', r"\Leftrightarrow"),
    ('↦', r"\mapsto"),
    ('↑', r"\uparrow"),
    ('↓', r"\downarrow"),
    // Greek, lower case
    ('α', r"\alpha"),
    ('β', r"\beta"),
    ('γ', r"\gamma"),
    ('δ', r"\delta"),
    ('ε', r"\varepsilon"),
    ('ϵ', r"\epsilon"),
    ('ζ', r"\zeta"),
    ('η', r"\eta"),
    ('θ', r"\theta"),
    ('ϑ', r"\vartheta"),
    ('ι', r"\iota"),
    ('κ', r"\kappa"),
    ('λ', r"\lambda"),
    ('μ', r"\mu"),
    ('ν', r"\nu"),
    ('ξ', r"\xi"),
    ('ο', "o"),
    ('π', r"\pi"),
    ('ϖ', r"\varpi"),
    ('ρ', r"\rho"),
    ('ϱ', r"\varrho"),
    ('σ', r"\sigma"),
    ('ς', r"\varsigma"),
    ('τ', r"\tau"),
    ('υ', r"\upsilon"),
    ('φ', r"\phi"),
    ('ϕ', r"\phi"),
    ('χ', r"\chi"),
    ('ψ', r"\psi"),
    ('ω', r"\omega"),
    // Greek, upper case (letters without a command use their Latin twin)
    ('Α', "A"),
    ('Β', "B"),
    ('Γ', r"\Gamma"),
    ('Δ', r"\Delta"),
    ('Ε', "E"),
    ('Ζ', "Z"),
    ('Η', "H"),
    ('Θ', r"\Theta"),
    ('Ι', "I"),
    ('Κ', "K"),
    ('Λ', r"\Lambda"),
    ('Μ', "M"),
    ('Ν', "N"),
    ('Ξ', r"\Xi"),
    ('Ο', "O"),
    ('Π', r"\Pi"),
    ('Ρ', "P"),
    ('Σ', r"\Sigma"),
    ('Τ', "T"),
    ('Υ', r"\Upsilon"),
    ('Φ', r"\Phi"),
    ('Χ', "X"),
    ('Ψ', r"\Psi"),
    ('Ω', r"\Omega"),
];

/// Immutable configuration for [`MathFormatter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatexRules {
    /// Literal symbol → LaTeX replacement.
    pub commands: BTreeMap<char, String>,
}

impl Default for LatexRules {
    fn default() -> Self {
        Self {
            commands: SYMBOL_COMMANDS
                .iter()
                .map(|(c, cmd)| (*c, cmd.to_string()))
                .collect(),
        }
    }
}

/// Rewrites math paragraphs into LaTeX-flavoured notation.
///
/// The formatter rewrites whatever it is given; callers decide what is math
/// (see [`crate::pipeline::text::TextPipeline`]).
#[derive(Debug, Clone, Default)]
pub struct MathFormatter {
    rules: Arc<LatexRules>,
}

impl MathFormatter {
    pub fn new(rules: Arc<LatexRules>) -> Self {
        Self { rules }
    }

    /// Rewrite and wrap a paragraph, returning the formatted string.
    pub fn format(&self, paragraph: &str) -> String {
        self.segment(paragraph).into_formatted()
    }

    /// Rewrite and wrap a paragraph, keeping the raw form alongside.
    pub fn segment(&self, paragraph: &str) -> MathSegment {
        let raw = paragraph.trim();

        if raw.contains('\n') {
            let body = raw
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| self.rewrite_line(line))
                .collect::<Vec<_>>()
                .join(" \\\\ ");
            MathSegment::Display {
                raw: raw.to_string(),
                formatted: format!("\\[\n{}\n\\]", body),
            }
        } else {
            MathSegment::Inline {
                raw: raw.to_string(),
                formatted: format!("\\({}\\)", self.rewrite_line(raw)),
            }
        }
    }

    /// Apply rules 1–5 to a single line, without wrapping.
    pub fn rewrite_line(&self, line: &str) -> String {
        let s = substitute_symbols(line, &self.rules.commands);
        let s = brace_subscripts(&s);
        let s = brace_superscripts(&s);
        let s = rewrite_fractions(&s);
        scale_parentheses(&s)
    }
}

// ── Rule 1: Symbols ──────────────────────────────────────────────────────────

/// A command glued to a following letter or digit (`\pm5`, `\alphax`) would
/// change meaning, so one space separates them.
fn substitute_symbols(input: &str, commands: &BTreeMap<char, String>) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match commands.get(&c) {
            Some(cmd) => {
                out.push_str(cmd);
                let needs_space = cmd.starts_with('\\')
                    && chars.peek().is_some_and(|next| next.is_ascii_alphanumeric());
                if needs_space {
                    out.push(' ');
                }
            }
            None => out.push(c),
        }
    }

    out
}

// ── Rules 2–4: Scripts and fractions ─────────────────────────────────────────

fn brace_subscripts(input: &str) -> String {
    RE_SUBSCRIPT.replace_all(input, "${1}_{${2}}").into_owned()
}

fn brace_superscripts(input: &str) -> String {
    RE_SUPERSCRIPT.replace_all(input, "${1}^{${2}}").into_owned()
}

fn rewrite_fractions(input: &str) -> String {
    RE_FRACTION
        .replace_all(input, r"\frac{${1}}{${2}}")
        .into_owned()
}

// ── Rule 5: Parentheses ──────────────────────────────────────────────────────

/// Pair parentheses with a stack so nested groups nest correctly. Empty
/// groups, unbalanced parentheses, and escaped `\(` `\)` stay as they are.
fn scale_parentheses(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut scaled = vec![false; chars.len()];
    let mut open: Vec<usize> = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        let escaped = i > 0 && chars[i - 1] == '\\';
        match c {
            '(' if !escaped => open.push(i),
            ')' if !escaped => {
                if let Some(start) = open.pop() {
                    if i > start + 1 {
                        scaled[start] = true;
                        scaled[i] = true;
                    }
                }
            }
            _ => {}
        }
    }

    let mut out = String::with_capacity(input.len() + 16);
    for (i, &c) in chars.iter().enumerate() {
        match (c, scaled[i]) {
            ('(', true) => out.push_str(r"\left("),
            (')', true) => out.push_str(r"\right)"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(s: &str) -> String {
        MathFormatter::default().format(s)
    }

    fn rewrite(s: &str) -> String {
        MathFormatter::default().rewrite_line(s)
    }

    #[test]
    fn einstein_inline() {
        assert_eq!(format("E=mc^2"), r"\(E=mc^{2}\)");
    }

    #[test]
    fn rules_do_not_fire_after_a_closing_brace() {
        // subscript, superscript, fraction run once each, in that order
        assert_eq!(rewrite("x_1^2"), "x_{1}^2");
        assert_eq!(rewrite("2^10/3"), "2^{10}/3");
        assert_eq!(format("x_1^2"), r"\(x_{1}^2\)");
    }

    #[test]
    fn plus_minus_gets_separated_from_digit() {
        assert_eq!(format("±5"), r"\(\pm 5\)");
    }

    #[test]
    fn two_lines_become_display_math() {
        assert_eq!(format("x=1\ny=2"), "\\[\nx=1 \\\\ y=2\n\\]");
    }

    #[test]
    fn blank_lines_inside_display_are_dropped() {
        let seg = MathFormatter::default().segment("a=1\n \nb=2");
        assert!(seg.is_display());
        assert_eq!(seg.formatted(), "\\[\na=1 \\\\ b=2\n\\]");
        assert_eq!(seg.raw(), "a=1\n \nb=2");
    }

    #[test]
    fn greek_then_subscript() {
        assert_eq!(rewrite("α_1"), r"\alpha_{1}");
        assert_eq!(rewrite("∑_i"), r"\sum_{i}");
    }

    #[test]
    fn command_next_to_symbol_gets_no_space() {
        assert_eq!(rewrite("αβ"), r"\alpha\beta");
        assert_eq!(rewrite("√x"), r"\sqrt x");
        assert_eq!(rewrite("Α5"), "A5");
    }

    #[test]
    fn subscripts_take_digit_runs_or_one_letter() {
        assert_eq!(rewrite("x_12"), "x_{12}");
        assert_eq!(rewrite("y_ab"), "y_{a}b");
        assert_eq!(rewrite("z_{3}"), "z_{3}");
    }

    #[test]
    fn superscripts() {
        assert_eq!(rewrite("2^10"), "2^{10}");
        assert_eq!(rewrite("e^x"), "e^{x}");
    }

    #[test]
    fn fractions() {
        assert_eq!(rewrite("1/2 + 3/4"), r"\frac{1}{2} + \frac{3}{4}");
        assert_eq!(rewrite("a/b"), "a/b");
    }

    #[test]
    fn parentheses_scale_and_nest() {
        assert_eq!(rewrite("f(x)"), r"f\left(x\right)");
        assert_eq!(
            rewrite("(a(b)c)"),
            r"\left(a\left(b\right)c\right)"
        );
    }

    #[test]
    fn odd_parentheses_stay() {
        assert_eq!(rewrite("f()"), "f()");
        assert_eq!(rewrite("a) b ("), "a) b (");
        assert_eq!(rewrite(r"\(x\)"), r"\(x\)");
    }

    #[test]
    fn arrows_and_relations() {
        assert_eq!(rewrite("a → b ≤ c"), r"a \rightarrow b \leq c");
    }

    #[test]
    fn custom_command_table() {
        let mut commands = BTreeMap::new();
        commands.insert('★', r"\star".to_string());
        let f = MathFormatter::new(Arc::new(LatexRules { commands }));
        assert_eq!(f.format("★a"), r"\(\star a\)");
        // Default symbols are no longer rewritten.
        assert_eq!(f.format("±"), r"\(±\)");
    }
}
