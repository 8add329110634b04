//! Error types for the edgequake-pdf2text library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ValidationError`]: the input is not a usable PDF at all. Raised before
//!   the pipeline touches the document; the caller should reject the request.
//!
//! * [`ExtractionError`]: **Fatal**: the whole document failed (geometry
//!   unreadable, wrong password, deadline exceeded). No partial document is
//!   ever returned alongside it.
//!
//! * [`PageWarning`]: **Non-fatal**: a table or image extractor failed on one
//!   page. The page degrades to an empty table/image list and the warning is
//!   collected in [`crate::model::ExtractionOutput::warnings`].
//!
//! The text stages (layout, normalisation, classification, LaTeX formatting)
//! are total functions over strings and have no error type.

use std::path::PathBuf;
use thiserror::Error;

/// The input file cannot be handed to the pipeline.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but holds no bytes.
    #[error("File is empty: '{path}'")]
    Empty { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },
}

/// All fatal errors returned by the edgequake-pdf2text library.
///
/// Table and image failures use [`PageWarning`] and never surface here.
#[derive(Debug, Error)]
pub enum ExtractionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input validation failed before extraction started.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page tree could not be read for a specific page.
    #[error("Failed to read page geometry for page {page}: {detail}")]
    GeometryFailed { page: usize, detail: String },

    /// pdfium-render returned an error while rasterising a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The per-document deadline expired before every page finished.
    #[error("Extraction timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the binary or in the working directory.\n\
  • Install pdfium system-wide so the dynamic linker can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractionError {
    /// `true` when the caller handed in something that is not a usable PDF.
    pub fn is_validation(&self) -> bool {
        matches!(self, ExtractionError::Validation(_))
    }
}

/// Why a table or image extractor failed.
///
/// Never fatal: the assembler turns it into a [`PageWarning`].
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("unparseable extractor output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("empty image payload")]
    EmptyPayload,

    #[error("unknown image format '{extension}'")]
    UnknownFormat { extension: String },
}

/// A non-fatal problem on a single page.
///
/// The page is still emitted; only the affected tables or image are missing.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageWarning {
    /// The table extractor failed; the page has no tables.
    #[error("Page {page}: table extraction failed: {detail}")]
    TableExtraction { page: usize, detail: String },

    /// One embedded image could not be encoded and was skipped.
    #[error("Page {page}: image '{image_id}' skipped: {detail}")]
    ImageExtraction {
        page: usize,
        image_id: String,
        detail: String,
    },
}

impl PageWarning {
    pub fn page(&self) -> usize {
        match self {
            PageWarning::TableExtraction { page, .. } | PageWarning::ImageExtraction { page, .. } => {
                *page
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_converts_into_extraction_error() {
        let e: ExtractionError = ValidationError::FileNotFound {
            path: PathBuf::from("missing.pdf"),
        }
        .into();
        assert!(e.is_validation());
        assert!(e.to_string().contains("missing.pdf"), "got: {e}");
    }

    #[test]
    fn not_a_pdf_display_shows_magic() {
        let e = ValidationError::NotAPdf {
            path: PathBuf::from("a.txt"),
            magic: *b"PK\x03\x04",
        };
        assert!(e.to_string().contains("a.txt"));
    }

    #[test]
    fn timeout_display() {
        let e = ExtractionError::Timeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
        assert!(!e.is_validation());
    }

    #[test]
    fn geometry_failed_display() {
        let e = ExtractionError::GeometryFailed {
            page: 4,
            detail: "bad text page".into(),
        };
        assert!(e.to_string().contains("page 4"));
        assert!(e.to_string().contains("bad text page"));
    }

    #[test]
    fn extractor_error_display() {
        let e = ExtractorError::CommandFailed {
            program: "tabula".into(),
            status: "exit status: 2".into(),
            stderr: "no such page".into(),
        };
        assert!(e.to_string().contains("tabula"));
        assert!(e.to_string().contains("no such page"));
    }

    #[test]
    fn page_warning_roundtrips_through_json() {
        let w = PageWarning::ImageExtraction {
            page: 2,
            image_id: "p2-img0".into(),
            detail: "unknown format".into(),
        };
        let json = serde_json::to_string(&w).unwrap();
        let back: PageWarning = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
        assert_eq!(back.page(), 2);
    }
}
