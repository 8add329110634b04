//! Data model: page geometry going in, the assembled document coming out.
//!
//! ```text
//! PageGeometry ── Block ── Line ── Span        (from the geometry provider)
//!      │
//!      ▼
//! PageRecord { page, content, tables, images }  (one per page, 1..N)
//!      │
//!      ▼
//! Document { content: [PageRecord], total_pages, metadata }
//! ```
//!
//! Everything here is constructed fresh for each extraction and carries no
//! shared state between documents.

use crate::config::PageSeparator;
use crate::error::{ExtractionError, PageWarning};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Page geometry ────────────────────────────────────────────────────────

/// Smallest text-bearing unit inside a [`Line`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    /// The provider saw a visual gap before this span; reconstruction
    /// inserts exactly one space.
    #[serde(default)]
    pub space_before: bool,
}

impl Span {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            space_before: false,
        }
    }

    /// A span preceded by a visual gap.
    pub fn spaced(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            space_before: true,
        }
    }
}

/// Ordered spans sharing one baseline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }
}

/// A layout-level paragraph candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub lines: Vec<Line>,
}

impl Block {
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    /// Convenience for fixtures: one span per line, no space hints.
    pub fn from_text_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines
                .into_iter()
                .map(|l| Line::new(vec![Span::new(l)]))
                .collect(),
        }
    }
}

/// An embedded image as handed over by the geometry provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Provider-assigned identifier, unique within the document.
    pub id: String,
    pub data: Vec<u8>,
    /// File extension without the dot, e.g. `png`, `jpeg`.
    pub extension: String,
}

/// Everything the pipeline needs to know about one page.
#[derive(Debug, Clone, Default)]
pub struct PageGeometry {
    /// 1-indexed page number.
    pub page_num: usize,
    pub blocks: Vec<Block>,
    /// Rendered page, present only when a table extractor will consume it.
    pub raster: Option<DynamicImage>,
    pub images: Vec<RawImage>,
}

impl PageGeometry {
    pub fn new(page_num: usize, blocks: Vec<Block>) -> Self {
        Self {
            page_num,
            blocks,
            raster: None,
            images: Vec::new(),
        }
    }

    pub fn with_raster(mut self, raster: DynamicImage) -> Self {
        self.raster = Some(raster);
        self
    }

    pub fn with_images(mut self, images: Vec<RawImage>) -> Self {
        self.images = images;
        self
    }
}

// ── Extracted artefacts ──────────────────────────────────────────────────

/// A table grid exactly as the table extractor returned it.
///
/// Serialises as a bare array of rows; `null` marks an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableData {
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableData {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row; extractors may emit ragged grids.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A self-describing embedded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Image format tag, e.g. `png`.
    #[serde(rename = "type")]
    pub format: String,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
}

/// A paragraph recognised as mathematical, before and after formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MathSegment {
    /// Single logical line, wrapped in `\( … \)`.
    Inline { raw: String, formatted: String },
    /// Multi-line, wrapped in `\[ … \]` with `\\` between lines.
    Display { raw: String, formatted: String },
}

impl MathSegment {
    pub fn raw(&self) -> &str {
        match self {
            MathSegment::Inline { raw, .. } | MathSegment::Display { raw, .. } => raw,
        }
    }

    pub fn formatted(&self) -> &str {
        match self {
            MathSegment::Inline { formatted, .. } | MathSegment::Display { formatted, .. } => {
                formatted
            }
        }
    }

    pub fn into_formatted(self) -> String {
        match self {
            MathSegment::Inline { formatted, .. } | MathSegment::Display { formatted, .. } => {
                formatted
            }
        }
    }

    pub fn is_display(&self) -> bool {
        matches!(self, MathSegment::Display { .. })
    }
}

// ── Assembled output ─────────────────────────────────────────────────────

/// Final per-page output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-indexed page number.
    pub page: usize,
    /// Normalised text, paragraphs separated by one blank line.
    pub content: String,
    pub tables: Vec<TableData>,
    pub images: Vec<ImageRef>,
}

/// A fully extracted document.
///
/// `pages` holds page 1..N without gaps and `total_pages == pages.len()`;
/// [`Document::new`] is the only way the pipeline builds one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "content")]
    pub pages: Vec<PageRecord>,
    pub total_pages: usize,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(pages: Vec<PageRecord>, metadata: BTreeMap<String, String>) -> Self {
        let total_pages = pages.len();
        Self {
            pages,
            total_pages,
            metadata,
        }
    }

    /// Render the document as plain text.
    ///
    /// Pages are joined with `separator`; with `include_metadata` a YAML
    /// front-matter block listing the metadata map is prepended.
    pub fn to_text(&self, separator: &PageSeparator, include_metadata: bool) -> String {
        let mut out = String::new();

        if include_metadata {
            out.push_str(&format_front_matter(&self.metadata, self.total_pages));
        }

        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push_str(&separator.render(page.page));
            }
            out.push_str(&page.content);
        }

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        out
    }
}

fn format_front_matter(metadata: &BTreeMap<String, String>, total_pages: usize) -> String {
    let mut yaml = String::from("---\n");
    for (key, value) in metadata {
        yaml.push_str(&format!("{}: \"{}\"\n", key, value.replace('"', "\\\"")));
    }
    yaml.push_str(&format!("pages: {}\n", total_pages));
    yaml.push_str("---\n\n");
    yaml
}

/// What [`crate::inspect`] reports without extracting any page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub metadata: BTreeMap<String, String>,
}

/// Counters gathered while assembling one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    /// Paragraphs rewritten as inline or display math.
    pub math_paragraphs: usize,
    pub tables: usize,
    pub images: usize,
    pub warnings: usize,
    pub total_duration_ms: u64,
}

/// A successful extraction: the document plus its diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub document: Document,
    /// Non-fatal table/image failures, in page order.
    pub warnings: Vec<PageWarning>,
    pub stats: ExtractionStats,
}

/// The single success/failure envelope handed to callers that speak JSON.
///
/// ```json
/// { "success": true, "content": [...], "total_pages": 3, "metadata": {} }
/// { "success": false, "error": "PDF file not found: 'x.pdf'" }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub success: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionReport {
    pub fn success(document: Document) -> Self {
        Self {
            success: true,
            document: Some(document),
            error: None,
        }
    }

    pub fn failure(error: &ExtractionError) -> Self {
        Self {
            success: false,
            document: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<ExtractionOutput, ExtractionError>> for ExtractionReport {
    fn from(result: Result<ExtractionOutput, ExtractionError>) -> Self {
        match result {
            Ok(output) => Self::success(output.document),
            Err(e) => Self::failure(&e),
        }
    }
}
