//! Error types for the edgequake-pdfocr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OcrPdfError`]: **Fatal**: the run cannot proceed at all (missing
//!   input, unreadable PDF, PDFium unavailable, output not writable). Returned
//!   as `Err(OcrPdfError)` from the top-level `convert*` functions.
//!
//! * [`PageError`]: **Non-fatal**: a single page image could not be read,
//!   recognised or written, but every other page is fine. Stored inside
//!   [`crate::output::PageStatus::Failed`]; it never escapes the
//!   recognition stage.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfocr library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum OcrPdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

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

    /// pdfium-render returned an error for a specific page, or the PNG could
    /// not be written to the working directory.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// No page image arrived from the rasteriser within the deadline.
    #[error("Rasterisation of page {page} did not finish within {secs}s")]
    RasterTimeout { page: usize, secs: u64 },

    // ── Working directory errors ──────────────────────────────────────────
    /// The working directory must exist before rasterisation starts.
    #[error("Working directory '{path}' does not exist.\nCreate it first: mkdir -p {path:?}")]
    WorkDirMissing { path: PathBuf },

    /// A PNG in the working directory does not follow `page_<N>.png`.
    #[error("Image '{path}' does not follow the page_<N>.png naming scheme")]
    MalformedImageName { path: PathBuf },

    /// Two images claim the same page index.
    #[error("Page index {index} appears twice: '{first}' and '{second}'")]
    DuplicatePageIndex {
        index: usize,
        first: PathBuf,
        second: PathBuf,
    },

    /// The working directory could not be wiped or recreated.
    #[error("Failed to clear working directory '{path}': {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The TrueType font for the output PDF is missing or unparsable.
    #[error("Font '{path}' is unavailable: {detail}")]
    FontUnavailable { path: PathBuf, detail: String },

    /// Could not create or write the output PDF file.
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
  • Install pdfium system-wide (libpdfium.so / libpdfium.dylib / pdfium.dll).\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page image.
///
/// The image is skipped (or replaced by a placeholder page) and the run
/// carries on with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The image file could not be opened or decoded.
    #[error("Page {page}: image '{path}' is unreadable: {detail}")]
    ImageUnreadable {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// The OCR engine could not be started or exited with an error.
    #[error("Page {page}: OCR failed on '{path}': {detail}")]
    OcrFailed {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// The OCR engine did not answer within the deadline.
    #[error("Page {page}: OCR on '{path}' timed out after {secs}s")]
    Timeout {
        page: usize,
        path: PathBuf,
        secs: u64,
    },

    /// The recognised text could not be written into the output document.
    #[error("Page {page}: could not add text to the output PDF: {detail}")]
    ComposeFailed { page: usize, detail: String },
}

impl PageError {
    /// Zero-based index of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::ImageUnreadable { page, .. }
            | PageError::OcrFailed { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::ComposeFailed { page, .. } => *page,
        }
    }

    /// Re-label an error produced without page context.
    pub(crate) fn with_page(mut self, index: usize) -> Self {
        match &mut self {
            PageError::ImageUnreadable { page, .. }
            | PageError::OcrFailed { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::ComposeFailed { page, .. } => *page = index,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_dir_missing_display() {
        let e = OcrPdfError::WorkDirMissing {
            path: PathBuf::from("images"),
        };
        let msg = e.to_string();
        assert!(msg.contains("images"), "got: {msg}");
        assert!(msg.contains("mkdir"), "got: {msg}");
    }

    #[test]
    fn duplicate_index_display() {
        let e = OcrPdfError::DuplicatePageIndex {
            index: 3,
            first: PathBuf::from("images/page_3.png"),
            second: PathBuf::from("images/page_03.png"),
        };
        let msg = e.to_string();
        assert!(msg.contains("index 3"));
        assert!(msg.contains("page_03.png"));
    }

    #[test]
    fn raster_timeout_display() {
        let e = OcrPdfError::RasterTimeout { page: 4, secs: 120 };
        assert!(e.to_string().contains("page 4"));
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn page_error_mentions_image_path() {
        let e = PageError::OcrFailed {
            page: 1,
            path: PathBuf::from("images/page_1.png"),
            detail: "Error in pixReadStream".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page_1.png"));
        assert!(msg.contains("pixReadStream"));
        assert_eq!(e.page(), 1);
    }

    #[test]
    fn with_page_relabels() {
        let e = PageError::ComposeFailed {
            page: 0,
            detail: "boom".into(),
        }
        .with_page(7);
        assert_eq!(e.page(), 7);
    }

    #[test]
    fn page_error_serializes() {
        let e = PageError::Timeout {
            page: 2,
            path: PathBuf::from("images/page_2.png"),
            secs: 30,
        };
        let json = serde_json::to_string(&e).expect("serialize");
        assert!(json.contains("Timeout"));
        assert!(json.contains("page_2.png"));
    }
}
