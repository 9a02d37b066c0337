//! PDF rasterisation: render every page to `page_<N>.png` via pdfium.
//!
//! ## Threading
//!
//! `pdfium-render` wraps the pdfium C++ library, which is blocking and keeps
//! thread-local state. All pdfium work happens on one `spawn_blocking`
//! worker. The worker hands each finished page to the async side through a
//! channel of capacity 1, so pages arrive lazily and in source order and the
//! worker never runs more than one page ahead.
//!
//! ## Deadline
//!
//! Every page must arrive within `render_timeout_secs`. A pdfium call cannot
//! be interrupted mid-page, so on expiry the worker is abandoned: it notices
//! the closed channel after its current page and stops.

use crate::config::PipelineConfig;
use crate::error::OcrPdfError;
use crate::output::DocumentInfo;
use crate::pipeline::manifest::{page_file_name, Manifest, PageImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

/// Messages from the pdfium worker.
enum RasterEvent {
    Opened { total_pages: usize },
    Page(PageImage),
}

type RasterMessage = Result<RasterEvent, OcrPdfError>;

/// Rasterise every page of `pdf_path` into `config.image_folder`.
///
/// # Returns
/// A [`Manifest`] with one entry per source page, in source order.
///
/// # Errors
/// Every failure here is fatal: missing working directory, pdfium not
/// available, unreadable document, a page that fails to render or save, or
/// a page that misses its deadline.
pub async fn rasterize(pdf_path: &Path, config: &PipelineConfig) -> Result<Manifest, OcrPdfError> {
    let out_dir = config.image_folder.clone();
    if !out_dir.is_dir() {
        return Err(OcrPdfError::WorkDirMissing { path: out_dir });
    }

    let path = pdf_path.to_path_buf();
    let dpi = config.resolution;
    let password = config.password.clone();
    let (tx, mut rx) = mpsc::channel::<RasterMessage>(1);

    let worker = tokio::task::spawn_blocking(move || {
        if let Err(e) = rasterize_blocking(&path, &out_dir, dpi, password.as_deref(), &tx) {
            // Receiver gone means the caller already gave up.
            let _ = tx.blocking_send(Err(e));
        }
    });

    let deadline = Duration::from_secs(config.render_timeout_secs);
    let mut pages: Vec<PageImage> = Vec::new();

    loop {
        let message = match timeout(deadline, rx.recv()).await {
            Ok(message) => message,
            Err(_) => {
                return Err(OcrPdfError::RasterTimeout {
                    page: pages.len(),
                    secs: config.render_timeout_secs,
                })
            }
        };

        match message {
            None => break,
            Some(Err(e)) => return Err(e),
            Some(Ok(RasterEvent::Opened { total_pages })) => {
                info!("PDF loaded: {} pages", total_pages);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_rasterize_start(total_pages);
                }
            }
            Some(Ok(RasterEvent::Page(page))) => {
                info!("Page {} saved as {}", page.index, page.path.display());
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_rasterized(page.index, &page.path);
                }
                pages.push(page);
            }
        }
    }

    worker
        .await
        .map_err(|e| OcrPdfError::Internal(format!("Render task panicked: {}", e)))?;

    Manifest::new(pages)
}

/// Blocking implementation of page rendering.
fn rasterize_blocking(
    pdf_path: &Path,
    out_dir: &Path,
    dpi: u32,
    password: Option<&str>,
    tx: &mpsc::Sender<RasterMessage>,
) -> Result<(), OcrPdfError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if tx
        .blocking_send(Ok(RasterEvent::Opened { total_pages }))
        .is_err()
    {
        return Ok(());
    }

    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    for (index, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            OcrPdfError::RasterisationFailed {
                page: index,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} → {}x{} px at {} DPI",
            index,
            image.width(),
            image.height(),
            dpi
        );

        let image_path = out_dir.join(page_file_name(index));
        image
            .save_with_format(&image_path, image::ImageFormat::Png)
            .map_err(|e| OcrPdfError::RasterisationFailed {
                page: index,
                detail: format!("writing {}: {}", image_path.display(), e),
            })?;

        let page_image = PageImage {
            index,
            path: image_path,
        };
        if tx.blocking_send(Ok(RasterEvent::Page(page_image))).is_err() {
            debug!("Rasterisation abandoned by caller after page {}", index);
            return Ok(());
        }
    }

    Ok(())
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` (file or directory) first, then a
/// library next to the working directory, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, OcrPdfError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(configured) => {
            let configured = PathBuf::from(configured);
            let lib = if configured.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&configured)
            } else {
                configured
            };
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| OcrPdfError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, OcrPdfError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                OcrPdfError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                OcrPdfError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            OcrPdfError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Read document information without rendering pages.
pub async fn extract_info(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentInfo, OcrPdfError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_info_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| OcrPdfError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_info_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentInfo, OcrPdfError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentInfo {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_work_dir_is_fatal_before_pdfium() {
        let config = PipelineConfig::builder()
            .image_folder("/no/such/working/dir")
            .build()
            .unwrap();
        let err = rasterize(Path::new("test.pdf"), &config).await.unwrap_err();
        assert!(matches!(err, OcrPdfError::WorkDirMissing { .. }));
    }
}
