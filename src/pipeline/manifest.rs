//! Page manifest: the ordered list of `(index, path)` pairs that links the
//! rasteriser to the recogniser.
//!
//! The rasteriser builds the manifest directly from the pages it wrote, so
//! the normal run never parses file names. [`Manifest::scan`] exists for
//! recognising images that are already on disk; it is strict about the
//! `page_<N>.png` contract and refuses names it cannot place instead of
//! guessing an index.

use crate::error::OcrPdfError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

static RE_PAGE_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^page_(\d+)\.png$").unwrap());

/// File name for the image of the zero-based page `index`.
pub fn page_file_name(index: usize) -> String {
    format!("page_{index}.png")
}

/// Parse the page index out of a `page_<N>.png` file name.
///
/// Returns `None` for anything else, including names whose number does not
/// fit in `usize`.
pub fn parse_page_index(file_name: &str) -> Option<usize> {
    RE_PAGE_FILE
        .captures(file_name)
        .and_then(|caps| caps[1].parse().ok())
}

/// One rasterised page on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// Zero-based position of the page in the source document.
    pub index: usize,
    pub path: PathBuf,
}

/// Page images sorted by ascending index, each index present once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pages: Vec<PageImage>,
}

impl Manifest {
    /// Sort `pages` by index and reject duplicates.
    pub fn new(mut pages: Vec<PageImage>) -> Result<Self, OcrPdfError> {
        pages.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));

        if let Some(pair) = pages.windows(2).find(|w| w[0].index == w[1].index) {
            return Err(OcrPdfError::DuplicatePageIndex {
                index: pair[0].index,
                first: pair[0].path.clone(),
                second: pair[1].path.clone(),
            });
        }

        Ok(Self { pages })
    }

    /// Build a manifest from the PNG files in `dir`.
    ///
    /// Non-PNG files are ignored. A PNG whose name is not `page_<N>.png`
    /// fails the scan.
    pub fn scan(dir: &Path) -> Result<Self, OcrPdfError> {
        if !dir.is_dir() {
            return Err(OcrPdfError::WorkDirMissing {
                path: dir.to_path_buf(),
            });
        }

        let entries = std::fs::read_dir(dir)
            .map_err(|e| OcrPdfError::Internal(format!("read_dir {}: {e}", dir.display())))?;

        let mut pages = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| OcrPdfError::Internal(format!("read_dir {}: {e}", dir.display())))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }

            let index = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_page_index)
                .ok_or_else(|| OcrPdfError::MalformedImageName { path: path.clone() })?;

            pages.push(PageImage { index, path });
        }

        debug!("Scanned {} page images in {}", pages.len(), dir.display());
        Self::new(pages)
    }

    pub fn pages(&self) -> &[PageImage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageImage> {
        self.pages.iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a PageImage;
    type IntoIter = std::slice::Iter<'a, PageImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}
