//! Result types returned by a pipeline run.
//!
//! Every image gets a [`PageOutcome`] whose [`PageStatus`] is either the
//! recognised text or the reason the page was skipped, so callers can
//! inspect partial success instead of scraping log lines.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source PDF information, as reported by `--inspect-only`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// What the cleaner found at the working directory path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanupOutcome {
    /// The directory existed; it was removed and recreated empty.
    Cleared,
    /// There was no directory to clear. Not an error.
    Absent,
}

/// Per-image result of the recognition stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PageStatus {
    /// OCR succeeded and the text was appended to the output.
    Recognized {
        text: String,
        /// Physical output pages the text occupied after automatic page breaks.
        output_pages: usize,
        /// Characters the output font could not draw, written as `?`.
        #[serde(default)]
        replaced_chars: usize,
    },
    /// The image was skipped.
    Failed { error: PageError },
}

/// One entry per page image, in manifest order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOutcome {
    /// Zero-based source page index.
    pub index: usize,
    pub image_path: PathBuf,
    /// Wall-clock time of the OCR call; zero when the image never reached it.
    pub duration_ms: u64,
    pub status: PageStatus,
}

impl PageOutcome {
    pub fn is_recognized(&self) -> bool {
        matches!(self.status, PageStatus::Recognized { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.status {
            PageStatus::Recognized { text, .. } => Some(text),
            PageStatus::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&PageError> {
        match &self.status {
            PageStatus::Recognized { .. } => None,
            PageStatus::Failed { error } => Some(error),
        }
    }
}

/// Output of the Recognizer/Composer stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionSummary {
    pub pages: Vec<PageOutcome>,
    /// Sum of the per-image OCR durations.
    pub total_ocr_ms: u64,
    /// Physical pages in the saved document, placeholders included.
    pub output_pages: usize,
    pub output_path: PathBuf,
}

impl RecognitionSummary {
    pub fn recognized(&self) -> usize {
        self.pages.iter().filter(|p| p.is_recognized()).count()
    }

    pub fn failed(&self) -> usize {
        self.pages.len() - self.recognized()
    }
}

/// Aggregate timings and counts for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the source PDF; `None` when rasterisation was skipped.
    pub source_pages: Option<usize>,
    pub total_images: usize,
    pub recognized_pages: usize,
    pub failed_pages: usize,
    pub output_pages: usize,
    pub render_duration_ms: u64,
    pub total_ocr_ms: u64,
    pub total_duration_ms: u64,
}

/// Full result of [`crate::convert::convert`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pages: Vec<PageOutcome>,
    pub stats: RunStats,
    pub output_path: PathBuf,
    pub cleanup: CleanupOutcome,
}

impl RunReport {
    /// Pages that were skipped, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = &PageOutcome> {
        self.pages.iter().filter(|p| !p.is_recognized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, ok: bool) -> PageOutcome {
        let status = if ok {
            PageStatus::Recognized {
                text: format!("page {index}"),
                output_pages: 1,
                replaced_chars: 0,
            }
        } else {
            PageStatus::Failed {
                error: PageError::ImageUnreadable {
                    page: index,
                    path: PathBuf::from(format!("images/page_{index}.png")),
                    detail: "truncated".into(),
                },
            }
        };
        PageOutcome {
            index,
            image_path: PathBuf::from(format!("images/page_{index}.png")),
            duration_ms: 5,
            status,
        }
    }

    #[test]
    fn summary_counts() {
        let summary = RecognitionSummary {
            pages: vec![outcome(0, true), outcome(1, false), outcome(2, true)],
            total_ocr_ms: 15,
            output_pages: 2,
            output_path: PathBuf::from("output.pdf"),
        };
        assert_eq!(summary.recognized(), 2);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn outcome_accessors() {
        let ok = outcome(0, true);
        assert_eq!(ok.text(), Some("page 0"));
        assert!(ok.error().is_none());

        let bad = outcome(1, false);
        assert!(bad.text().is_none());
        assert_eq!(bad.error().map(|e| e.page()), Some(1));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = RunReport {
            pages: vec![outcome(0, true), outcome(1, false)],
            stats: RunStats {
                total_images: 2,
                recognized_pages: 1,
                failed_pages: 1,
                ..Default::default()
            },
            output_path: PathBuf::from("output.pdf"),
            cleanup: CleanupOutcome::Cleared,
        };
        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"Cleared\""));
        assert!(json.contains("page_1.png"));
        assert_eq!(report.failures().count(), 1);
    }
}
