//! Source validation: make sure the input is a readable PDF before PDFium
//! ever sees it.
//!
//! We check the `%PDF` magic bytes up front so callers get a meaningful
//! error rather than an opaque PDFium load failure.

use crate::error::OcrPdfError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn validate_source(path: &Path) -> Result<PathBuf, OcrPdfError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(OcrPdfError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(OcrPdfError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(OcrPdfError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(OcrPdfError::FileNotFound { path });
        }
    }

    debug!("Validated source PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_source(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, OcrPdfError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_source(dir.path()).unwrap_err();
        assert!(matches!(err, OcrPdfError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(b"PK\x03\x04 not a pdf").unwrap();
        let err = validate_source(f.path()).unwrap_err();
        match err {
            OcrPdfError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pdf_header_is_accepted() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n").unwrap();
        let path = validate_source(f.path()).expect("valid header");
        assert_eq!(path, f.path());
    }
}
