//! # edgequake-pdf2text
//!
//! Extract clean, indexable text from PDF documents, with mathematical
//! content rewritten as LaTeX and tables and images attached per page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate path, readability, %PDF magic
//!  ├─ 2. Geometry   pdfium text segments → blocks/lines/spans (blocking reader)
//!  ├─ 3. Layout     blocks → paragraphs separated by blank lines
//!  ├─ 4. Normalize  ligatures, dashes, whitespace, control characters
//!  ├─ 5. Classify   math vs prose, per paragraph
//!  ├─ 6. LaTeX      math paragraphs → \( … \) or \[ … \]
//!  ├─ 7. Extractors tables (from a page raster) and images (data URIs)
//!  └─ 8. Assemble   page records in page order + metadata
//! ```
//!
//! Pages run on a bounded worker pool; output is always in page order. Table
//! and image failures are collected as [`PageWarning`]s; anything else is a
//! fatal [`ExtractionError`] and no partial document is returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2text::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let output = extract("document.pdf", &config).await?;
//!     print!("{}", output.document.to_text(&config.page_separator, false));
//!     for w in &output.warnings {
//!         eprintln!("warning: {w}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The text stages can also be used on their own:
//!
//! ```rust
//! use edgequake_pdf2text::pipeline::text::TextPipeline;
//!
//! let pipeline = TextPipeline::default();
//! assert_eq!(pipeline.render_paragraph("E=mc^2"), r"\(E=mc^{2}\)");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2text` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2text = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! The pdfium shared library is bound at run time from `PDFIUM_LIB_PATH` (a
//! file or directory), the working directory, or the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSeparator};
pub use error::{ExtractionError, ExtractorError, PageWarning, ValidationError};
pub use extract::{
    extract, extract_from_bytes, extract_source, extract_sync, extract_to_file, extract_with,
    inspect, write_atomic,
};
pub use model::{
    Block, Document, DocumentInfo, ExtractionOutput, ExtractionReport, ExtractionStats, ImageRef,
    Line, MathSegment, PageGeometry, PageRecord, RawImage, Span, TableData,
};
pub use pipeline::assemble::{DocumentAssembler, GeometrySource, MemorySource, PageFeed};
pub use pipeline::images::{DataUriImageExtractor, ImageExtractor};
pub use pipeline::tables::{CommandTableExtractor, NoopTableExtractor, TableExtractor};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
