//! Configuration types for a PDF → OCR → PDF run.
//!
//! Every knob lives in one [`PipelineConfig`] that is passed explicitly to
//! each stage, built via its [`PipelineConfigBuilder`]. Nothing is read from
//! module-level state.

use crate::error::OcrPdfError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Rasterisation resolution in dots per inch.
pub const DEFAULT_RESOLUTION: u32 = 300;

/// Bottom margin (layout units, millimetres) that triggers an automatic page
/// break in the output document.
pub const DEFAULT_PAGE_BREAK_MARGIN: f32 = 15.0;

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfocr::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .pdf_path("scan.pdf")
///     .output_pdf_path("scan-text.pdf")
///     .language("deu")
///     .build()
///     .unwrap();
/// assert_eq!(config.resolution, 300);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Source PDF. Default: `test.pdf`.
    pub pdf_path: PathBuf,

    /// Working directory for the intermediate `page_<N>.png` images.
    /// Default: `images`. Must exist before rasterisation starts.
    pub image_folder: PathBuf,

    /// Where the rebuilt PDF is written (overwritten if present).
    /// Default: `output.pdf`.
    pub output_pdf_path: PathBuf,

    /// Tesseract language code, e.g. `eng`, `deu`, `rus`. Default: `eng`.
    ///
    /// Always combined with the fast-mode model, see
    /// [`crate::pipeline::ocr::language_profile`].
    pub language: String,

    /// Tesseract executable. A bare name is looked up on `PATH`.
    /// Default: `tesseract`.
    pub ocr_engine_path: PathBuf,

    /// Rendering DPI. Default: 300.
    pub resolution: u32,

    /// Bottom margin in layout units for automatic page breaks. Default: 15.
    pub page_break_margin: f32,

    /// TrueType font embedded in the output. `None` uses built-in Helvetica,
    /// which only covers WinAnsi (Western European) characters.
    pub font_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Insert a blank page for every image that failed recognition, so the
    /// output keeps one page per source page. Default: false (failed pages
    /// are dropped).
    pub placeholder_pages: bool,

    /// Deadline for each rasterised page to arrive, in seconds. Default: 120.
    pub render_timeout_secs: u64,

    /// Deadline for each OCR call, in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Optional per-page event sink (progress bars, console lines).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pdf_path: PathBuf::from("test.pdf"),
            image_folder: PathBuf::from("images"),
            output_pdf_path: PathBuf::from("output.pdf"),
            language: "eng".to_string(),
            ocr_engine_path: PathBuf::from("tesseract"),
            resolution: DEFAULT_RESOLUTION,
            page_break_margin: DEFAULT_PAGE_BREAK_MARGIN,
            font_path: None,
            password: None,
            placeholder_pages: false,
            render_timeout_secs: 120,
            ocr_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("pdf_path", &self.pdf_path)
            .field("image_folder", &self.image_folder)
            .field("output_pdf_path", &self.output_pdf_path)
            .field("language", &self.language)
            .field("ocr_engine_path", &self.ocr_engine_path)
            .field("resolution", &self.resolution)
            .field("page_break_margin", &self.page_break_margin)
            .field("font_path", &self.font_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("placeholder_pages", &self.placeholder_pages)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Path of the source PDF.
    pub fn pdf_path(&self) -> &Path {
        &self.pdf_path
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn pdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdf_path = path.into();
        self
    }

    pub fn image_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.image_folder = path.into();
        self
    }

    pub fn output_pdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_pdf_path = path.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn ocr_engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ocr_engine_path = path.into();
        self
    }

    pub fn resolution(mut self, dpi: u32) -> Self {
        self.config.resolution = dpi.clamp(72, 600);
        self
    }

    pub fn page_break_margin(mut self, margin: f32) -> Self {
        self.config.page_break_margin = margin;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn placeholder_pages(mut self, v: bool) -> Self {
        self.config.placeholder_pages = v;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, OcrPdfError> {
        let c = &self.config;
        if c.resolution < 72 || c.resolution > 600 {
            return Err(OcrPdfError::InvalidConfig(format!(
                "Resolution must be 72–600 DPI, got {}",
                c.resolution
            )));
        }
        if !(0.0..=100.0).contains(&c.page_break_margin) {
            return Err(OcrPdfError::InvalidConfig(format!(
                "Page break margin must be 0–100, got {}",
                c.page_break_margin
            )));
        }
        if c.language.trim().is_empty() {
            return Err(OcrPdfError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.ocr_engine_path.as_os_str().is_empty() {
            return Err(OcrPdfError::InvalidConfig(
                "OCR engine path must not be empty".into(),
            ));
        }
        if c.render_timeout_secs == 0 || c.ocr_timeout_secs == 0 {
            return Err(OcrPdfError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PipelineConfig::default();
        assert_eq!(c.pdf_path, PathBuf::from("test.pdf"));
        assert_eq!(c.image_folder, PathBuf::from("images"));
        assert_eq!(c.output_pdf_path, PathBuf::from("output.pdf"));
        assert_eq!(c.language, "eng");
        assert_eq!(c.resolution, 300);
        assert_eq!(c.page_break_margin, 15.0);
        assert!(!c.placeholder_pages);
    }

    #[test]
    fn resolution_is_clamped() {
        let c = PipelineConfig::builder().resolution(10).build().unwrap();
        assert_eq!(c.resolution, 72);
        let c = PipelineConfig::builder().resolution(5000).build().unwrap();
        assert_eq!(c.resolution, 600);
    }

    #[test]
    fn empty_language_rejected() {
        let err = PipelineConfig::builder().language("  ").build().unwrap_err();
        assert!(matches!(err, OcrPdfError::InvalidConfig(_)));
    }

    #[test]
    fn negative_margin_rejected() {
        let err = PipelineConfig::builder()
            .page_break_margin(-1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("margin"));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(PipelineConfig::builder().ocr_timeout_secs(0).build().is_err());
        assert!(PipelineConfig::builder().render_timeout_secs(0).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = PipelineConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
