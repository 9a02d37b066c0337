//! Progress-callback trait for per-page pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as each stage advances. The CLI uses it to print one console line
//! per rasterised page, one per recognised (or failed) image, the total OCR
//! time and the cleanup outcome.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfocr::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//! use std::time::Duration;
//!
//! struct CountingCallback {
//!     recognised: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_page_recognized(&self, index: usize, _total: usize, elapsed: Duration, chars: usize) {
//!         self.recognised.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {index}: {chars} chars in {:.2}s", elapsed.as_secs_f64());
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { recognised: AtomicUsize::new(0) });
//! let config = PipelineConfig::builder()
//!     .progress_callback(cb as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::CleanupOutcome;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Called by the pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in order from a single logical
/// thread; the `Send + Sync` bound only lets the callback live in a shared
/// config.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once the source PDF is open and its page count is known.
    fn on_rasterize_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after `page_<index>.png` has been written.
    fn on_page_rasterized(&self, index: usize, path: &Path) {
        let _ = (index, path);
    }

    /// Called before the first image is handed to the OCR engine.
    fn on_recognition_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called when an image was recognised and appended to the output.
    ///
    /// `elapsed` covers the OCR call only; `chars` is the length of the
    /// cleaned text.
    fn on_page_recognized(&self, index: usize, total: usize, elapsed: Duration, chars: usize) {
        let _ = (index, total, elapsed, chars);
    }

    /// Called when an image was skipped.
    fn on_page_failed(&self, index: usize, total: usize, path: &Path, error: &str) {
        let _ = (index, total, path, error);
    }

    /// Called once after every image has been attempted and the output saved.
    fn on_recognition_complete(&self, recognized: usize, failed: usize, total_ocr: Duration) {
        let _ = (recognized, failed, total_ocr);
    }

    /// Called after the working directory has been cleared (or found absent).
    fn on_cleanup(&self, path: &Path, outcome: CleanupOutcome) {
        let _ = (path, outcome);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
