//! The composed text pipeline for one page:
//!
//! ```text
//! blocks ──▶ layout ──▶ normalize ──▶ split "\n\n" ──▶ classify ──▶ latex | passthrough ──▶ join "\n\n"
//! ```
//!
//! Normalisation runs on the whole reconstructed page so blank lines at block
//! boundaries collapse before paragraphs are split. Each stage is a stateless
//! value sharing its rule tables through `Arc`, so one pipeline can be cloned
//! into every page worker.

use crate::config::ExtractionConfig;
use crate::model::{Block, MathSegment};
use crate::pipeline::classify::MathClassifier;
use crate::pipeline::latex::MathFormatter;
use crate::pipeline::layout;
use crate::pipeline::normalize::TextNormalizer;
use std::borrow::Cow;
use tracing::debug;

/// Final text of one page plus the math paragraphs found on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    pub content: String,
    pub math: Vec<MathSegment>,
}

#[derive(Debug, Clone, Default)]
pub struct TextPipeline {
    normalizer: TextNormalizer,
    classifier: MathClassifier,
    formatter: MathFormatter,
}

impl TextPipeline {
    pub fn new(
        normalizer: TextNormalizer,
        classifier: MathClassifier,
        formatter: MathFormatter,
    ) -> Self {
        Self {
            normalizer,
            classifier,
            formatter,
        }
    }

    /// Build the pipeline from the rule tables held by `config`.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            TextNormalizer::new(config.normalizer.clone()),
            MathClassifier::new(config.classifier.clone()),
            MathFormatter::new(config.latex.clone()),
        )
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn classifier(&self) -> &MathClassifier {
        &self.classifier
    }

    pub fn formatter(&self) -> &MathFormatter {
        &self.formatter
    }

    /// Run every stage over a page's blocks.
    pub fn render_page(&self, blocks: &[Block]) -> PageText {
        let raw = layout::reconstruct(blocks);
        let normalized = self.normalizer.normalize(&raw);

        let mut math = Vec::new();
        let paragraphs: Vec<String> = normalized
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                if self.classifier.is_math(p) {
                    let segment = self.formatter.segment(p);
                    let formatted = segment.formatted().to_string();
                    math.push(segment);
                    formatted
                } else {
                    p.to_string()
                }
            })
            .collect();

        debug!(
            "Rendered {} paragraphs ({} math) from {} blocks",
            paragraphs.len(),
            math.len(),
            blocks.len()
        );

        PageText {
            content: paragraphs.join("\n\n"),
            math,
        }
    }

    /// Classify one paragraph and format it when it is math; anything else is
    /// returned untouched.
    pub fn render_paragraph<'a>(&self, paragraph: &'a str) -> Cow<'a, str> {
        if self.classifier.is_math(paragraph) {
            Cow::Owned(self.formatter.format(paragraph))
        } else {
            Cow::Borrowed(paragraph)
        }
    }
}
