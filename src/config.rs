//! Configuration types for PDF text extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The rule tables used by the text
//! stages (normaliser substitutions, math-symbol set, LaTeX command map) live
//! here as immutable `Arc`-shared values, so tests and callers can swap them
//! without touching module state.

use crate::error::ExtractionError;
use crate::pipeline::classify::ClassifierRules;
use crate::pipeline::images::{DataUriImageExtractor, ImageExtractor};
use crate::pipeline::latex::LatexRules;
use crate::pipeline::normalize::NormalizerRules;
use crate::pipeline::tables::TableExtractor;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a PDF text extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2text::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .concurrency(8)
///     .split_glued_words(true)
///     .document_timeout_secs(Some(60))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Maximum raster dimension (width or height) in pixels. Default: 2000.
    ///
    /// Only used when a table extractor is configured; without one no page
    /// is rasterised at all.
    pub max_rendered_pixels: u32,

    /// Number of pages processed concurrently. Default: 4.
    ///
    /// Output order is always page order regardless of this value.
    pub concurrency: usize,

    /// Deadline for the whole document in seconds. Default: `Some(300)`.
    ///
    /// When it expires the outstanding page work is abandoned, the document
    /// handle is released, and [`ExtractionError::Timeout`] is returned.
    pub document_timeout_secs: Option<u64>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Run the image extractor on embedded images. Default: true.
    pub extract_images: bool,

    /// Table extractor fed with each page raster. Default: None (no tables).
    pub table_extractor: Option<Arc<dyn TableExtractor>>,

    /// Turns embedded images into data URIs.
    pub image_extractor: Arc<dyn ImageExtractor>,

    /// Normaliser substitution table and the glued-word heuristic flag.
    pub normalizer: Arc<NormalizerRules>,

    /// Math-symbol set, structural patterns, and decision thresholds.
    pub classifier: Arc<ClassifierRules>,

    /// Symbol → LaTeX command map.
    pub latex: Arc<LatexRules>,

    /// Page separator for [`crate::model::Document::to_text`]. Default: None.
    pub page_separator: PageSeparator,

    /// Prepend YAML front-matter in plain-text output. Default: false.
    pub include_metadata: bool,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_rendered_pixels: 2000,
            concurrency: 4,
            document_timeout_secs: Some(300),
            password: None,
            extract_images: true,
            table_extractor: None,
            image_extractor: Arc::new(DataUriImageExtractor),
            normalizer: Arc::new(NormalizerRules::default()),
            classifier: Arc::new(ClassifierRules::default()),
            latex: Arc::new(LatexRules::default()),
            page_separator: PageSeparator::default(),
            include_metadata: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("document_timeout_secs", &self.document_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("extract_images", &self.extract_images)
            .field(
                "table_extractor",
                &self.table_extractor.as_ref().map(|t| t.name()),
            )
            .field("image_extractor", &self.image_extractor.name())
            .field("split_glued_words", &self.normalizer.split_glued_words)
            .field("ratio_threshold", &self.classifier.ratio_threshold)
            .field("min_symbol_count", &self.classifier.min_symbol_count)
            .field("page_separator", &self.page_separator)
            .field("include_metadata", &self.include_metadata)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether pages need a raster at all.
    pub fn wants_rasters(&self) -> bool {
        self.table_extractor.is_some()
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn document_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.document_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn extract_images(mut self, v: bool) -> Self {
        self.config.extract_images = v;
        self
    }

    pub fn table_extractor(mut self, extractor: Arc<dyn TableExtractor>) -> Self {
        self.config.table_extractor = Some(extractor);
        self
    }

    pub fn image_extractor(mut self, extractor: Arc<dyn ImageExtractor>) -> Self {
        self.config.image_extractor = extractor;
        self
    }

    pub fn normalizer_rules(mut self, rules: NormalizerRules) -> Self {
        self.config.normalizer = Arc::new(rules);
        self
    }

    /// Toggle the lower→upper case word-splitting heuristic (off by default).
    pub fn split_glued_words(mut self, v: bool) -> Self {
        Arc::make_mut(&mut self.config.normalizer).split_glued_words = v;
        self
    }

    pub fn classifier_rules(mut self, rules: ClassifierRules) -> Self {
        self.config.classifier = Arc::new(rules);
        self
    }

    pub fn math_ratio_threshold(mut self, ratio: f64) -> Self {
        Arc::make_mut(&mut self.config.classifier).ratio_threshold = ratio;
        self
    }

    pub fn math_min_symbol_count(mut self, n: usize) -> Self {
        Arc::make_mut(&mut self.config.classifier).min_symbol_count = n;
        self
    }

    pub fn latex_rules(mut self, rules: LatexRules) -> Self {
        self.config.latex = Arc::new(rules);
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractionError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(ExtractionError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.classifier.ratio_threshold) {
            return Err(ExtractionError::InvalidConfig(format!(
                "Math ratio threshold must be within 0–1, got {}",
                c.classifier.ratio_threshold
            )));
        }
        if c.document_timeout_secs == Some(0) {
            return Err(ExtractionError::InvalidConfig(
                "Document timeout must be ≥ 1s (use None to disable)".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How to separate pages in plain-text output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with "\n\n". (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string for the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }

    /// Parse a CLI-style value: `none`, `hr`/`---`, `comment`, or any custom string.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => PageSeparator::None,
            "hr" | "---" => PageSeparator::HorizontalRule,
            "comment" => PageSeparator::Comment,
            _ => PageSeparator::Custom(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.document_timeout_secs, Some(300));
        assert!(!c.normalizer.split_glued_words);
        assert_eq!(c.classifier.ratio_threshold, 0.1);
        assert_eq!(c.classifier.min_symbol_count, 2);
        assert!(!c.wants_rasters());
    }

    #[test]
    fn builder_clamps_and_toggles() {
        let c = ExtractionConfig::builder()
            .concurrency(0)
            .max_rendered_pixels(10)
            .split_glued_words(true)
            .math_min_symbol_count(3)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_rendered_pixels, 100);
        assert!(c.normalizer.split_glued_words);
        assert_eq!(c.classifier.min_symbol_count, 3);
    }

    #[test]
    fn builder_rejects_bad_threshold() {
        let err = ExtractionConfig::builder()
            .math_ratio_threshold(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(ExtractionConfig::builder()
            .document_timeout_secs(Some(0))
            .build()
            .is_err());
        assert!(ExtractionConfig::builder()
            .document_timeout_secs(None)
            .build()
            .is_ok());
    }

    #[test]
    fn separator_parse_and_render() {
        assert_eq!(PageSeparator::parse("hr"), PageSeparator::HorizontalRule);
        assert_eq!(PageSeparator::parse("NONE"), PageSeparator::None);
        assert_eq!(
            PageSeparator::parse("=== next ==="),
            PageSeparator::Custom("=== next ===".into())
        );
        assert_eq!(PageSeparator::Comment.render(3), "\n\n<!-- page 3 -->\n\n");
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("data-uri"));
    }
}
