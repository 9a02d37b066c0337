//! Pipeline stages for PDF → OCR → PDF conversion.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and a backend (rasteriser, OCR engine, font) can be swapped without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ manifest ──▶ ocr ──▶ postprocess ──▶ compose ──▶ clean
//! (%PDF)   (pdfium)   (index,path) (tesseract) (tidy)       (lopdf)    (rm -r)
//! ```
//!
//! 1. [`input`]: check the source is a readable PDF
//! 2. [`render`]: rasterise every page to `page_<N>.png` on a blocking worker
//! 3. [`manifest`]: ordered `(index, path)` list handed from render to OCR
//! 4. [`ocr`]: run the OCR engine on one image; the only stage that
//!    spawns processes
//! 5. [`postprocess`]: deterministic cleanup of the raw OCR text
//! 6. [`compose`]: append the text as wrapped, auto-paginated PDF pages
//!    ([`font`] provides metrics and encoding)
//! 7. [`clean`]: wipe and recreate the working directory

pub mod clean;
pub mod compose;
pub mod font;
pub mod input;
pub mod manifest;
pub mod ocr;
pub mod postprocess;
pub mod render;
