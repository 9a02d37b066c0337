//! Output document: lay recognised text onto A4 pages with `lopdf`.
//!
//! Geometry is expressed in layout units (millimetres) and converted to PDF
//! points when the content stream is written. Each recognised image starts a
//! new page; its text is word-wrapped to the text column and continues on
//! further physical pages once a line would cross the bottom margin.
//!
//! ```text
//!  ┌────────────── 210 ──────────────┐
//!  │ 10                              │
//!  │  ┌ line 1 (10 high) ─────────┐  │
//!  │  │ line 2                    │  │
//!  │  │ …                         │  297
//!  │  └───────────────────────────┘  │
//!  │ bottom margin (default 15)      │
//!  └─────────────────────────────────┘
//! ```

use crate::config::PipelineConfig;
use crate::error::{OcrPdfError, PageError};
use crate::pipeline::font::PageFont;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Page geometry and type settings, in layout units unless noted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    /// Left, right and top margin.
    pub margin: f32,
    /// Distance from the bottom edge at which text breaks to a new page.
    pub bottom_margin: f32,
    /// Horizontal padding inside the text column.
    pub cell_padding: f32,
    pub line_height: f32,
    /// Font size in points.
    pub font_size: f32,
}

impl PageLayout {
    /// A4 portrait, 10 mm margins, 10 pt text on 10 mm lines.
    pub fn a4(bottom_margin: f32) -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 10.0,
            bottom_margin,
            cell_padding: 1.0,
            line_height: 10.0,
            font_size: 10.0,
        }
    }

    /// Width available to a line of text, in points.
    pub fn text_width_pt(&self) -> f32 {
        (self.page_width - 2.0 * self.margin - 2.0 * self.cell_padding) * PT_PER_MM
    }

    /// Lines that fit between the top margin and the page-break trigger.
    pub fn lines_per_page(&self) -> usize {
        let usable = self.page_height - self.bottom_margin - self.margin;
        ((usable / self.line_height).floor() as usize).max(1)
    }

    /// Baseline of line `row` (0-based), in PDF points from the bottom edge.
    fn baseline_pt(&self, row: usize) -> f32 {
        let font_size_mm = self.font_size / PT_PER_MM;
        let top = self.margin + row as f32 * self.line_height;
        let baseline = top + 0.5 * self.line_height + 0.3 * font_size_mm;
        (self.page_height - baseline) * PT_PER_MM
    }
}

/// Break `text` into lines no wider than the layout's text column.
///
/// Explicit newlines always break. Lines wrap at spaces; a word wider than
/// the whole column is split between characters. An empty string yields a
/// single empty line.
pub fn wrap_text(text: &str, font: &PageFont, layout: &PageLayout) -> Vec<String> {
    let max_width = layout.text_width_pt();
    let size = layout.font_size;
    let fits = |s: &str| font.text_width(s, size) <= max_width;

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.replace('\t', "    ");
        let mut current = String::new();
        let mut wrapped = false;

        for (i, word) in paragraph.split(' ').enumerate() {
            if wrapped && current.is_empty() && word.is_empty() {
                // No leading blanks on continuation lines
                continue;
            }

            let candidate = if i == 0 || (wrapped && current.is_empty()) {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if fits(&candidate) {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                wrapped = true;
            }

            if fits(word) {
                current = word.to_string();
                continue;
            }

            // Hard-break an over-long word
            for c in word.chars() {
                current.push(c);
                if !fits(&current) {
                    current.pop();
                    if !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                    }
                    current.push(c);
                }
            }
            wrapped = true;
        }

        lines.push(current);
    }
    lines
}

/// Incrementally built output PDF.
pub struct PdfComposer {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    font: PageFont,
    layout: PageLayout,
    page_ids: Vec<ObjectId>,
}

impl PdfComposer {
    pub fn new(font: PageFont, layout: PageLayout) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            font_id,
            font,
            layout,
            page_ids: Vec::new(),
        }
    }

    /// Composer with the configured font and bottom margin.
    ///
    /// # Errors
    /// [`OcrPdfError::FontUnavailable`] if `config.font_path` cannot be loaded.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, OcrPdfError> {
        let font = match config.font_path {
            Some(ref path) => PageFont::load(path)?,
            None => PageFont::Builtin,
        };
        Ok(Self::new(font, PageLayout::a4(config.page_break_margin)))
    }

    /// Physical pages added so far.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Characters of `text` that would be replaced when written with this
    /// composer's font.
    pub fn unencodable_count(&self, text: &str) -> usize {
        self.font.unencodable_count(text)
    }

    /// Start a new page and write `text` on it, breaking onto further pages
    /// as needed.
    ///
    /// The content streams are built before anything is added to the
    /// document, so on error the document is unchanged.
    ///
    /// # Returns
    /// The number of physical pages added (at least 1).
    pub fn add_text_page(&mut self, text: &str) -> Result<usize, PageError> {
        let lines = wrap_text(text, &self.font, &self.layout);
        let per_page = self.layout.lines_per_page();

        let mut streams = Vec::new();
        for chunk in lines.chunks(per_page) {
            let content = self.page_content(chunk);
            let bytes = content.encode().map_err(|e| PageError::ComposeFailed {
                page: 0,
                detail: e.to_string(),
            })?;
            streams.push(bytes);
        }

        let added = streams.len();
        for bytes in streams {
            self.push_page(bytes);
        }
        debug!("Appended {} line(s) on {} page(s)", lines.len(), added);
        Ok(added)
    }

    /// Append an empty page standing in for a page that failed recognition.
    pub fn add_placeholder_page(&mut self) {
        self.push_page(Vec::new());
    }

    fn page_content(&mut self, lines: &[String]) -> Content {
        let x = (self.layout.margin + self.layout.cell_padding) * PT_PER_MM;
        let mut operations = Vec::new();

        for (row, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let y = self.layout.baseline_pt(row);
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec!["F1".into(), Object::Real(self.layout.font_size)],
            ));
            operations.push(Operation::new("Td", vec![Object::Real(x), Object::Real(y)]));
            operations.push(Operation::new("Tj", vec![self.font.encode(line)]));
            operations.push(Operation::new("ET", vec![]));
        }

        Content { operations }
    }

    fn push_page(&mut self, content: Vec<u8>) {
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.layout.page_width * PT_PER_MM),
            Object::Real(self.layout.page_height * PT_PER_MM),
        ];
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => media_box,
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(self.font_id) },
            },
        });
        self.page_ids.push(page_id);
    }

    /// Finish the document and write it to `path`, replacing any existing
    /// file.
    ///
    /// The PDF is written to a temporary file next to `path` and renamed
    /// into place, so a failed write never leaves a truncated output.
    ///
    /// # Returns
    /// The number of physical pages written.
    pub fn save(self, path: &Path) -> Result<usize, OcrPdfError> {
        let write_failed = |source: std::io::Error| OcrPdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let PdfComposer {
            mut doc,
            pages_id,
            font_id,
            font,
            page_ids,
            ..
        } = self;
        let page_count = page_ids.len();

        font.write_objects(&mut doc, font_id);

        let kids: Vec<Object> = page_ids.into_iter().map(Object::Reference).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(page_count as i64),
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("edgequake-pdfocr ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.trailer.set("Info", Object::Reference(info_id));
        doc.compress();

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(write_failed)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_failed)?;
        doc.save_to(&mut tmp)
            .map_err(|e| write_failed(std::io::Error::other(e.to_string())))?;
        tmp.flush().map_err(write_failed)?;
        tmp.persist(path).map_err(|e| write_failed(e.error))?;

        info!("Wrote {} ({} pages)", path.display(), page_count);
        Ok(page_count)
    }
}
