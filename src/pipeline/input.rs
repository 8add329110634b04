//! Input validation: reject anything that is not a readable, non-empty PDF
//! before pdfium is involved.
//!
//! pdfium reports unreadable or non-PDF input as a generic load failure.
//! Checking existence, permissions, size and the `%PDF` magic bytes first gives
//! callers a meaningful [`ValidationError`] instead.

use crate::error::ValidationError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate `path` and return it as an owned path ready for the geometry
/// provider.
pub fn validate_pdf(path: impl AsRef<Path>) -> Result<PathBuf, ValidationError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(ValidationError::FileNotFound { path });
    }

    let mut f = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ValidationError::PermissionDenied { path });
        }
        Err(_) => return Err(ValidationError::FileNotFound { path }),
    };

    let len = f.metadata().map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        return Err(ValidationError::Empty { path });
    }

    let mut magic = [0u8; 4];
    if f.read_exact(&mut magic).is_err() || !is_pdf_magic(&magic) {
        return Err(ValidationError::NotAPdf { path, magic });
    }

    debug!("Validated PDF: {} ({} bytes)", path.display(), len);
    Ok(path)
}

/// `true` for byte slices starting with `%PDF`.
pub fn is_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn accepts_pdf_header() {
        let f = write_temp(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n");
        assert_eq!(validate_pdf(f.path()).unwrap(), f.path());
    }

    #[test]
    fn missing_file() {
        let err = validate_pdf("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, ValidationError::FileNotFound { .. }));
    }

    #[test]
    fn empty_file() {
        let f = write_temp(b"");
        assert!(matches!(
            validate_pdf(f.path()).unwrap_err(),
            ValidationError::Empty { .. }
        ));
    }

    #[test]
    fn wrong_magic() {
        let f = write_temp(b"PK\x03\x04 zip archive");
        match validate_pdf(f.path()).unwrap_err() {
            ValidationError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn shorter_than_magic() {
        let f = write_temp(b"%P");
        assert!(matches!(
            validate_pdf(f.path()).unwrap_err(),
            ValidationError::NotAPdf { .. }
        ));
    }

    #[test]
    fn magic_check() {
        assert!(is_pdf_magic(b"%PDF-2.0"));
        assert!(!is_pdf_magic(b"%PD"));
        assert!(!is_pdf_magic(b""));
    }
}
