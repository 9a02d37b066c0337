//! Run entry points: rasterise → recognise/compose → clean.
//!
//! The three stages run strictly in order. Fatal errors from validation or
//! rasterisation abort the run before anything is cleaned. Per-image
//! failures in the recognition stage are recorded in the report and never
//! escape it; the cleaner runs whenever recognition completes.

use crate::config::PipelineConfig;
use crate::error::{OcrPdfError, PageError};
use crate::output::{
    CleanupOutcome, DocumentInfo, PageOutcome, PageStatus, RecognitionSummary, RunReport, RunStats,
};
use crate::pipeline::compose::PdfComposer;
use crate::pipeline::manifest::{Manifest, PageImage};
use crate::pipeline::ocr::{Tesseract, TextRecognizer};
use crate::pipeline::{clean, input, postprocess, render};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Run the full pipeline with Tesseract as the OCR engine.
///
/// # Returns
/// `Ok(RunReport)` whenever the output PDF was written, even if some pages
/// failed recognition (check `report.stats.failed_pages`).
///
/// # Errors
/// Only fatal errors: missing or unreadable source, missing working
/// directory, pdfium unavailable, missing font, unwritable output.
pub async fn convert(config: &PipelineConfig) -> Result<RunReport, OcrPdfError> {
    let recognizer = Tesseract::from_config(config);
    convert_with(config, &recognizer).await
}

/// [`convert`] with a caller-supplied OCR engine.
pub async fn convert_with<R: TextRecognizer>(
    config: &PipelineConfig,
    recognizer: &R,
) -> Result<RunReport, OcrPdfError> {
    let total_start = Instant::now();
    info!("Starting run: {}", config.pdf_path.display());

    // ── Step 1: Validate inputs ──────────────────────────────────────────
    let pdf_path = input::validate_source(&config.pdf_path)?;
    // Load the font before the expensive work so a bad path fails fast.
    let composer = PdfComposer::from_config(config)?;

    // ── Step 2: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let manifest = render::rasterize(&pdf_path, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rasterised {} pages in {}ms",
        manifest.len(),
        render_duration_ms
    );

    // ── Step 3: Recognise and compose ────────────────────────────────────
    let summary = recognize_pages(&manifest, recognizer, composer, config).await?;

    // ── Step 4: Clean up ─────────────────────────────────────────────────
    let cleanup = clean_up(config)?;

    Ok(build_report(
        summary,
        cleanup,
        Some(manifest.len()),
        render_duration_ms,
        total_start,
    ))
}

/// Recognise the images already in the working directory, skipping
/// rasterisation.
///
/// The directory is read with [`Manifest::scan`], which refuses any PNG not
/// named `page_<N>.png`.
pub async fn convert_images(config: &PipelineConfig) -> Result<RunReport, OcrPdfError> {
    let recognizer = Tesseract::from_config(config);
    convert_images_with(config, &recognizer).await
}

/// [`convert_images`] with a caller-supplied OCR engine.
pub async fn convert_images_with<R: TextRecognizer>(
    config: &PipelineConfig,
    recognizer: &R,
) -> Result<RunReport, OcrPdfError> {
    let total_start = Instant::now();
    let manifest = Manifest::scan(&config.image_folder)?;
    info!(
        "Found {} page images in {}",
        manifest.len(),
        config.image_folder.display()
    );

    let composer = PdfComposer::from_config(config)?;
    let summary = recognize_pages(&manifest, recognizer, composer, config).await?;
    let cleanup = clean_up(config)?;

    Ok(build_report(summary, cleanup, None, 0, total_start))
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a single-threaded tokio runtime internally.
pub fn convert_sync(config: &PipelineConfig) -> Result<RunReport, OcrPdfError> {
    run_blocking(convert(config))?
}

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// The runtime is shut down without waiting for blocking tasks, so a pdfium
/// worker stranded by a render timeout cannot keep the caller from returning.
pub fn run_blocking<F: Future>(future: F) -> Result<F::Output, OcrPdfError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| OcrPdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    let output = rt.block_on(future);
    rt.shutdown_background();
    Ok(output)
}

/// Read source PDF information without converting anything.
pub async fn inspect(
    pdf_path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentInfo, OcrPdfError> {
    let path = input::validate_source(pdf_path.as_ref())?;
    render::extract_info(&path, password).await
}

/// Stage 2: OCR every image in manifest order and append its text to
/// `composer`, then save the document to `config.output_pdf_path`.
///
/// Per-image failures are logged with the image path, reported to the
/// progress callback and recorded as [`PageStatus::Failed`]; the loop then
/// moves on. With `placeholder_pages` a blank page stands in for each
/// failure.
///
/// # Errors
/// Only [`OcrPdfError::OutputWriteFailed`] when the document cannot be saved.
pub async fn recognize_pages<R: TextRecognizer>(
    manifest: &Manifest,
    recognizer: &R,
    mut composer: PdfComposer,
    config: &PipelineConfig,
) -> Result<RecognitionSummary, OcrPdfError> {
    let total = manifest.len();
    let deadline = Duration::from_secs(config.ocr_timeout_secs);
    let mut total_ocr = Duration::ZERO;
    let mut outcomes = Vec::with_capacity(total);

    info!("Recognising {} images with {}", total, recognizer.profile());
    if let Some(ref cb) = config.progress_callback {
        cb.on_recognition_start(total);
    }

    for page in manifest {
        // Only the engine call is timed.
        let (recognized, elapsed) = match check_decodable(page) {
            Ok(()) => {
                let start = Instant::now();
                let result = ocr_with_deadline(page, recognizer, deadline).await;
                (result, start.elapsed())
            }
            Err(e) => (Err(e), Duration::ZERO),
        };
        total_ocr += elapsed;

        let composed = recognized.and_then(|raw| {
            let text = postprocess::clean_text(&raw);
            let replaced_chars = composer.unencodable_count(&text);
            composer
                .add_text_page(&text)
                .map(|output_pages| (text, output_pages, replaced_chars))
        });

        let status = match composed {
            Ok((text, output_pages, replaced_chars)) => {
                if replaced_chars > 0 {
                    warn!(
                        "Page {}: {} character(s) not covered by the output font were replaced; \
                         pass --font to embed a Unicode font",
                        page.index, replaced_chars
                    );
                }
                info!(
                    "Processing {} took {:.2} seconds",
                    page.path.display(),
                    elapsed.as_secs_f64()
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_recognized(page.index, total, elapsed, text.chars().count());
                }
                PageStatus::Recognized {
                    text,
                    output_pages,
                    replaced_chars,
                }
            }
            Err(error) => {
                let error = error.with_page(page.index);
                warn!(
                    "Error recognizing text on image {}: {}",
                    page.path.display(),
                    error
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_failed(page.index, total, &page.path, &error.to_string());
                }
                if config.placeholder_pages {
                    composer.add_placeholder_page();
                }
                PageStatus::Failed { error }
            }
        };

        outcomes.push(PageOutcome {
            index: page.index,
            image_path: page.path.clone(),
            duration_ms: elapsed.as_millis() as u64,
            status,
        });
    }

    let output_pages = composer.save(&config.output_pdf_path)?;

    let summary = RecognitionSummary {
        pages: outcomes,
        total_ocr_ms: total_ocr.as_millis() as u64,
        output_pages,
        output_path: config.output_pdf_path.clone(),
    };

    info!(
        "Total processing time: {:.2} seconds ({}/{} images recognised)",
        total_ocr.as_secs_f64(),
        summary.recognized(),
        total
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_recognition_complete(summary.recognized(), summary.failed(), total_ocr);
    }

    Ok(summary)
}

/// OCR one image, giving up after `deadline`.
async fn ocr_with_deadline<R: TextRecognizer>(
    page: &PageImage,
    recognizer: &R,
    deadline: Duration,
) -> Result<String, PageError> {
    match timeout(deadline, recognizer.recognize(&page.path)).await {
        Ok(result) => result,
        Err(_) => Err(PageError::Timeout {
            page: page.index,
            path: page.path.clone(),
            secs: deadline.as_secs(),
        }),
    }
}

/// Decode the image once so a corrupt or truncated file is reported as
/// unreadable instead of reaching the OCR engine.
fn check_decodable(page: &PageImage) -> Result<(), PageError> {
    let unreadable = |detail: String| PageError::ImageUnreadable {
        page: page.index,
        path: page.path.clone(),
        detail,
    };

    let image = image::ImageReader::open(&page.path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| unreadable(e.to_string()))?
        .decode()
        .map_err(|e| unreadable(e.to_string()))?;

    debug!(
        "{}: {}x{} px",
        page.path.display(),
        image.width(),
        image.height()
    );
    Ok(())
}

/// Stage 3: wipe the working directory.
fn clean_up(config: &PipelineConfig) -> Result<CleanupOutcome, OcrPdfError> {
    let outcome = clean::clear_work_dir(&config.image_folder)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_cleanup(&config.image_folder, outcome);
    }
    Ok(outcome)
}

fn build_report(
    summary: RecognitionSummary,
    cleanup: CleanupOutcome,
    source_pages: Option<usize>,
    render_duration_ms: u64,
    total_start: Instant,
) -> RunReport {
    let stats = RunStats {
        source_pages,
        total_images: summary.pages.len(),
        recognized_pages: summary.recognized(),
        failed_pages: summary.failed(),
        output_pages: summary.output_pages,
        render_duration_ms,
        total_ocr_ms: summary.total_ocr_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} pages recognised, {}ms total",
        stats.recognized_pages, stats.total_images, stats.total_duration_ms
    );

    RunReport {
        pages: summary.pages,
        stats,
        output_path: summary.output_path,
        cleanup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compose::PageLayout;
    use crate::pipeline::font::PageFont;
    use crate::pipeline::manifest::page_file_name;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    /// Returns a fixed text per image, or fails for file names listed in `fail`.
    struct ScriptedRecognizer {
        fail: Vec<&'static str>,
        delay: Option<Duration>,
    }

    impl TextRecognizer for ScriptedRecognizer {
        async fn recognize(&self, image: &Path) -> Result<String, PageError> {
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            let name = image.file_name().unwrap().to_string_lossy().to_string();
            if self.fail.iter().any(|f| *f == name) {
                return Err(PageError::OcrFailed {
                    page: 0,
                    path: image.to_path_buf(),
                    detail: "scripted failure".into(),
                });
            }
            Ok(format!("text of {name}\x0c"))
        }

        fn profile(&self) -> String {
            "scripted".into()
        }
    }

    fn write_pages(dir: &Path, n: usize) -> Manifest {
        let pages = (0..n)
            .map(|i| {
                let path = dir.join(page_file_name(i));
                RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]))
                    .save(&path)
                    .unwrap();
                PageImage { index: i, path }
            })
            .collect();
        Manifest::new(pages).unwrap()
    }

    fn config_for(out: PathBuf) -> PipelineConfig {
        PipelineConfig::builder()
            .output_pdf_path(out)
            .ocr_timeout_secs(1)
            .build()
            .unwrap()
    }

    fn composer() -> PdfComposer {
        PdfComposer::new(PageFont::Builtin, PageLayout::a4(15.0))
    }

    #[tokio::test]
    async fn all_pages_recognised_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_pages(dir.path(), 3);
        let config = config_for(dir.path().join("out.pdf"));
        let rec = ScriptedRecognizer { fail: vec![], delay: None };

        let summary = recognize_pages(&manifest, &rec, composer(), &config)
            .await
            .unwrap();

        assert_eq!(summary.recognized(), 3);
        assert_eq!(summary.output_pages, 3);
        let indices: Vec<usize> = summary.pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(summary.pages[1].text(), Some("text of page_1.png"));
    }

    #[tokio::test]
    async fn ocr_failure_skips_only_that_page() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_pages(dir.path(), 3);
        let config = config_for(dir.path().join("out.pdf"));
        let rec = ScriptedRecognizer {
            fail: vec!["page_1.png"],
            delay: None,
        };

        let summary = recognize_pages(&manifest, &rec, composer(), &config)
            .await
            .unwrap();

        assert_eq!(summary.recognized(), 2);
        assert_eq!(summary.output_pages, 2);
        let err = summary.pages[1].error().expect("page 1 failed");
        assert_eq!(err.page(), 1);
        assert!(err.to_string().contains("page_1.png"));
    }

    #[tokio::test]
    async fn placeholder_keeps_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_pages(dir.path(), 3);
        let config = PipelineConfig::builder()
            .output_pdf_path(dir.path().join("out.pdf"))
            .placeholder_pages(true)
            .build()
            .unwrap();
        let rec = ScriptedRecognizer {
            fail: vec!["page_0.png", "page_2.png"],
            delay: None,
        };

        let summary = recognize_pages(&manifest, &rec, composer(), &config)
            .await
            .unwrap();
        assert_eq!(summary.recognized(), 1);
        assert_eq!(summary.output_pages, 3);
    }

    #[tokio::test]
    async fn corrupt_image_never_reaches_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_pages(dir.path(), 2);
        std::fs::write(dir.path().join("page_0.png"), b"\x89PNG garbage").unwrap();
        let config = config_for(dir.path().join("out.pdf"));
        let rec = ScriptedRecognizer { fail: vec![], delay: None };

        let summary = recognize_pages(&manifest, &rec, composer(), &config)
            .await
            .unwrap();
        assert!(matches!(
            summary.pages[0].error(),
            Some(PageError::ImageUnreadable { page: 0, .. })
        ));
        assert!(summary.pages[1].is_recognized());
    }

    #[tokio::test]
    async fn slow_ocr_times_out_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_pages(dir.path(), 1);
        let config = config_for(dir.path().join("out.pdf"));
        let rec = ScriptedRecognizer {
            fail: vec![],
            delay: Some(Duration::from_secs(5)),
        };

        let summary = recognize_pages(&manifest, &rec, composer(), &config)
            .await
            .unwrap();
        assert!(matches!(
            summary.pages[0].error(),
            Some(PageError::Timeout { secs: 1, .. })
        ));
        assert_eq!(summary.output_pages, 0);
    }

    #[tokio::test]
    async fn duration_covers_only_the_ocr_call() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_pages(dir.path(), 2);
        // A large image makes the decode check measurably slow.
        RgbImage::from_pixel(2000, 2000, Rgb([255, 255, 255]))
            .save(dir.path().join("page_0.png"))
            .unwrap();
        std::fs::write(dir.path().join("page_1.png"), b"\x89PNG garbage").unwrap();
        let config = config_for(dir.path().join("out.pdf"));
        let rec = ScriptedRecognizer { fail: vec![], delay: None };

        let summary = recognize_pages(&manifest, &rec, composer(), &config)
            .await
            .unwrap();

        assert!(summary.pages[0].is_recognized());
        assert!(
            summary.pages[0].duration_ms < 5,
            "decode time leaked into OCR time: {}ms",
            summary.pages[0].duration_ms
        );
        assert!(summary.pages[1].error().is_some());
        assert_eq!(summary.pages[1].duration_ms, 0);
        assert_eq!(summary.total_ocr_ms, summary.pages[0].duration_ms);
    }

    #[test]
    fn run_blocking_returns_while_a_blocking_task_is_stuck() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let started = Instant::now();

        let outcome = run_blocking(async move {
            // Stands in for a pdfium worker that outlives its deadline.
            let worker = tokio::task::spawn_blocking(move || {
                let _ = rx.recv_timeout(Duration::from_secs(30));
            });
            timeout(Duration::from_millis(50), worker).await.is_err()
        })
        .unwrap();

        assert!(outcome, "the worker should still be running at the deadline");
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "runtime shutdown waited for the blocking task"
        );
        drop(tx);
    }

    #[test]
    fn run_blocking_yields_the_future_output() {
        assert_eq!(run_blocking(async { 21 * 2 }).unwrap(), 42);
    }

    #[tokio::test]
    async fn convert_images_cleans_up_afterwards() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images");
        std::fs::create_dir(&images).unwrap();
        write_pages(&images, 2);

        let config = PipelineConfig::builder()
            .image_folder(&images)
            .output_pdf_path(root.path().join("output.pdf"))
            .build()
            .unwrap();
        let rec = ScriptedRecognizer { fail: vec![], delay: None };

        let report = convert_images_with(&config, &rec).await.unwrap();
        assert_eq!(report.stats.recognized_pages, 2);
        assert_eq!(report.stats.source_pages, None);
        assert_eq!(report.cleanup, CleanupOutcome::Cleared);
        assert_eq!(std::fs::read_dir(&images).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_source_is_fatal_and_nothing_is_cleaned() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images");
        std::fs::create_dir(&images).unwrap();
        std::fs::write(images.join("page_0.png"), b"keep me").unwrap();

        let config = PipelineConfig::builder()
            .pdf_path(root.path().join("missing.pdf"))
            .image_folder(&images)
            .build()
            .unwrap();
        let rec = ScriptedRecognizer { fail: vec![], delay: None };

        let err = convert_with(&config, &rec).await.unwrap_err();
        assert!(matches!(err, OcrPdfError::FileNotFound { .. }));
        assert!(images.join("page_0.png").exists());
    }
}
