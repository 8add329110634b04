//! Public extraction entry points.
//!
//! [`extract`] validates the input, opens it with PDFium on a blocking reader
//! thread, and runs the concurrent assembler under the per-document deadline.
//! The other entry points are thin wrappers around it.

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::model::{DocumentInfo, ExtractionOutput, ExtractionReport};
use crate::pipeline::assemble::{DocumentAssembler, GeometrySource, PageFeed};
use crate::pipeline::geometry::{bind_pdfium, PdfiumSource};
use crate::pipeline::input;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Extract text, tables, and images from a PDF file.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Any [`ExtractionError`] is fatal and no partial document is returned.
/// Table and image failures are not errors; they appear in
/// [`ExtractionOutput::warnings`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2text::{extract, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = extract("paper.pdf", &ExtractionConfig::default()).await?;
/// for page in &output.document.pages {
///     println!("--- page {} ---\n{}", page.page, page.content);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    // ── Step 1: Validate input ───────────────────────────────────────────
    let pdf_path = input::validate_pdf(path)?;
    info!("Starting extraction: {}", pdf_path.display());

    // ── Step 2: Open on the reader thread, assemble on the pool ──────────
    let password = config.password.clone();
    let raster_px = config.wants_rasters().then_some(config.max_rendered_pixels);
    let images = config.extract_images;

    extract_with(
        move |feed: PageFeed| {
            let pdfium = match bind_pdfium() {
                Ok(p) => p,
                Err(e) => return feed.fail(e),
            };
            let opened = PdfiumSource::open(&pdfium, &pdf_path, password.as_deref());
            match opened {
                Ok(source) => {
                    let source = source.with_images(images);
                    match raster_px {
                        Some(px) => feed.drain(source.with_rasters(px)),
                        None => feed.drain(source),
                    }
                }
                Err(e) => feed.fail(e),
            };
        },
        config,
    )
    .await
}

/// Run the concurrent assembler over any document reader, under the
/// configured deadline.
///
/// `reader` runs on a blocking thread; it opens its document and passes it to
/// [`PageFeed::drain`].
pub async fn extract_with<R>(reader: R, config: &ExtractionConfig) -> Result<ExtractionOutput, ExtractionError>
where
    R: FnOnce(PageFeed) + Send + 'static,
{
    let assembler = Arc::new(DocumentAssembler::from_config(config));
    let work = assembler.assemble_concurrent(reader, config.concurrency);

    match config.document_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), work)
            .await
            .map_err(|_| ExtractionError::Timeout { secs })?,
        None => work.await,
    }
}

/// [`extract_with`] for a source that can be moved onto the reader thread.
pub async fn extract_source<S>(source: S, config: &ExtractionConfig) -> Result<ExtractionOutput, ExtractionError>
where
    S: GeometrySource + Send + 'static,
{
    extract_with(move |feed: PageFeed| feed.drain(source), config).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractionError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(path, config))
}

/// Extract from PDF bytes held in memory.
///
/// pdfium opens files by path, so the bytes go to a managed [`tempfile`]
/// removed on return.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("pdf2text-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ExtractionError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractionError::Internal(format!("tempfile write: {e}")))?;
    tmp.flush()
        .map_err(|e| ExtractionError::Internal(format!("tempfile flush: {e}")))?;
    // `tmp` is dropped (and the file deleted) when `extract` returns
    extract(tmp.path(), config).await
}

/// Extract a PDF and write the JSON [`ExtractionReport`] to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files. A failed
/// extraction writes nothing and returns the error.
pub async fn extract_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    let output = extract(path, config).await?;
    let report = ExtractionReport::success(output.document.clone());
    let json = serde_json::to_vec_pretty(&report)
        .map_err(|e| ExtractionError::Internal(format!("JSON encoding failed: {e}")))?;
    let target = output_path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&target, &json))
        .await
        .map_err(|e| ExtractionError::Internal(format!("Write task panicked: {}", e)))??;
    Ok(output)
}

/// Read document metadata and page count without extracting any page.
pub async fn inspect(
    path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentInfo, ExtractionError> {
    let pdf_path = input::validate_pdf(path)?;
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || -> Result<_, ExtractionError> {
        let pdfium = bind_pdfium()?;
        let source = PdfiumSource::open(&pdfium, &pdf_path, password.as_deref())?;
        Ok(DocumentInfo {
            page_count: source.page_count(),
            metadata: source.metadata()?,
        })
    })
    .await
    .map_err(|e| ExtractionError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Write `bytes` to `path` via a sibling `.tmp` file and rename, creating
/// missing parent directories. Readers never see a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExtractionError> {
    let write_err = |source: std::io::Error| ExtractionError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, bytes).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_fails_validation() {
        let err = extract("/no/such/file.pdf", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn non_pdf_bytes_fail_validation() {
        let err = extract_from_bytes(b"hello world", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_validation(), "got: {err}");
    }

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.json");
        write_atomic(&target, b"{}").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"{}");
        assert!(!dir.path().join("nested").join("out.json.tmp").exists());
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        std::fs::write(&target, "old contents").unwrap();
        write_atomic(&target, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn write_atomic_reports_the_target_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let target = blocker.join("out.json");
        match write_atomic(&target, b"{}") {
            Err(ExtractionError::OutputWriteFailed { path, .. }) => assert_eq!(path, target),
            other => panic!("expected OutputWriteFailed, got {:?}", other),
        }
    }

    #[test]
    fn sync_wrapper_reports_validation_errors() {
        let err = extract_sync("/no/such/file.pdf", &ExtractionConfig::default()).unwrap_err();
        assert!(err.is_validation());
    }
}
