//! # edgequake-pdfocr
//!
//! Turn a scanned (image-only) PDF into a new PDF whose pages carry the
//! recognised text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      check the source exists and starts with %PDF
//!  ├─ 2. Render     rasterise pages at 300 DPI via pdfium (spawn_blocking)
//!  ├─ 3. OCR        one tesseract call per page image, sequentially
//!  ├─ 4. Compose    wrap text onto A4 pages, auto page-break (lopdf)
//!  └─ 5. Clean      empty the working image directory
//! ```
//!
//! A page whose image cannot be read or recognised is logged and skipped;
//! it never stops the run. Everything else (missing source, pdfium not
//! found, output not writable) is fatal and leaves the working directory
//! untouched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfocr::{convert, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .pdf_path("scan.pdf")
//!         .output_pdf_path("scan-text.pdf")
//!         .build()?;
//!     let report = convert(&config).await?;
//!     eprintln!(
//!         "{}/{} pages recognised",
//!         report.stats.recognized_pages, report.stats.total_images
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfocr = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! - a pdfium shared library (`PDFIUM_LIB_PATH`, the working directory, or
//!   the system library path)
//! - a `tesseract` executable with the requested language data installed

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use convert::{
    convert, convert_images, convert_images_with, convert_sync, convert_with, inspect,
    recognize_pages, run_blocking,
};
pub use error::{OcrPdfError, PageError};
pub use output::{
    CleanupOutcome, DocumentInfo, PageOutcome, PageStatus, RecognitionSummary, RunReport, RunStats,
};
pub use pipeline::manifest::{Manifest, PageImage};
pub use pipeline::ocr::{Tesseract, TextRecognizer};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
