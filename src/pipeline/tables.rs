//! Table extraction: hand a page raster to an external table detector.
//!
//! Table-grid detection itself is out of scope for this crate; the
//! [`TableExtractor`] trait is the seam where a detector plugs in. The grids it
//! returns are passed through unmodified.
//!
//! ## Why a unique temp file per call?
//!
//! Command-line detectors read the raster from disk. A single shared path
//! would let two concurrent pages overwrite or delete each other's raster
//! mid-read, so [`CommandTableExtractor`] writes every raster to its own
//! [`tempfile::NamedTempFile`], removed when the call returns.

use crate::error::ExtractorError;
use crate::model::TableData;
use image::DynamicImage;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Longest stderr excerpt kept in an error message.
const MAX_STDERR_CHARS: usize = 240;

/// Detects table grids on a rendered page.
///
/// Implementations must be `Send + Sync`: pages are processed on a worker pool.
/// Errors are never fatal; the page simply ends up with no tables.
pub trait TableExtractor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Return zero or more grids found on page `page_num` (1-indexed).
    fn extract_tables(
        &self,
        page_num: usize,
        raster: &DynamicImage,
    ) -> Result<Vec<TableData>, ExtractorError>;
}

/// Finds nothing. Useful to force the raster path without a detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTableExtractor;

impl TableExtractor for NoopTableExtractor {
    fn name(&self) -> &str {
        "noop"
    }

    fn extract_tables(
        &self,
        _page_num: usize,
        _raster: &DynamicImage,
    ) -> Result<Vec<TableData>, ExtractorError> {
        Ok(Vec::new())
    }
}

/// Runs an external program on a PNG of the page.
///
/// The program is invoked as `program [args…] <raster.png>` and must print a
/// JSON array of grids on stdout, each grid an array of rows and each cell a
/// string or `null`:
///
/// ```json
/// [[["Name", "Qty"], ["Bolt", null]]]
/// ```
///
/// Empty stdout means "no tables".
#[derive(Debug, Clone)]
pub struct CommandTableExtractor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTableExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument placed before the raster path.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl TableExtractor for CommandTableExtractor {
    fn name(&self) -> &str {
        "command"
    }

    fn extract_tables(
        &self,
        page_num: usize,
        raster: &DynamicImage,
    ) -> Result<Vec<TableData>, ExtractorError> {
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("pdf2text-p{page_num}-"))
            .suffix(".png")
            .tempfile()?;
        raster.write_to(tmp.as_file_mut(), image::ImageFormat::Png)?;
        tmp.as_file_mut().flush()?;

        debug!(
            "Page {}: running {} on {}",
            page_num,
            self.program.display(),
            tmp.path().display()
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(tmp.path())
            .output()?;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(MAX_STDERR_CHARS)
                .collect();
            return Err(ExtractorError::CommandFailed {
                program: self.program.display().to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        let tables: Vec<TableData> = serde_json::from_str(stdout.trim())?;
        debug!("Page {}: {} tables", page_num, tables.len());
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn raster() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])))
    }

    #[cfg(unix)]
    fn shell(script: &str) -> CommandTableExtractor {
        CommandTableExtractor::new("sh").args(["-c", script, "pdf2text-test"])
    }

    #[cfg(unix)]
    #[test]
    fn parses_grids_from_stdout() {
        let ex = shell(r#"test -s "$1" && printf '[[["a",null],["b","c"]]]'"#);
        let tables = ex.extract_tables(1, &raster()).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows,
            vec![
                vec![Some("a".to_string()), None],
                vec![Some("b".to_string()), Some("c".to_string())],
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn each_call_gets_its_own_raster_file() {
        let ex = shell(r#"printf '[[["%s"]]]' "$1""#);
        let first = ex.extract_tables(3, &raster()).unwrap();
        let second = ex.extract_tables(3, &raster()).unwrap();

        let path_of = |t: &[TableData]| t[0].rows[0][0].clone().unwrap();
        let (a, b) = (path_of(&first), path_of(&second));
        assert_ne!(a, b);
        assert!(a.contains("pdf2text-p3-") && a.ends_with(".png"));
        // Removed once the call returned.
        assert!(!std::path::Path::new(&a).exists());
        assert!(!std::path::Path::new(&b).exists());
    }

    #[cfg(unix)]
    #[test]
    fn empty_stdout_means_no_tables() {
        let ex = shell("true");
        assert!(ex.extract_tables(1, &raster()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_an_error() {
        let ex = shell("echo broken >&2; exit 3");
        let err = ex.extract_tables(1, &raster()).unwrap_err();
        match err {
            ExtractorError::CommandFailed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn garbage_output_is_an_error() {
        let ex = shell("echo not-json");
        assert!(matches!(
            ex.extract_tables(1, &raster()),
            Err(ExtractorError::InvalidOutput(_))
        ));
    }

    #[test]
    fn noop_finds_nothing() {
        assert!(NoopTableExtractor.extract_tables(1, &raster()).unwrap().is_empty());
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let ex = CommandTableExtractor::new("/nonexistent/pdf2text-table-detector");
        assert!(matches!(
            ex.extract_tables(1, &raster()),
            Err(ExtractorError::Io(_))
        ));
    }
}
