//! Working-directory housekeeping at the end of a run.

use crate::error::OcrPdfError;
use crate::output::CleanupOutcome;
use std::path::Path;
use tracing::info;

/// Remove everything under `dir` and recreate it empty.
///
/// An absent directory is reported as [`CleanupOutcome::Absent`], not as an
/// error, so calling this twice in a row is always safe.
pub fn clear_work_dir(dir: &Path) -> Result<CleanupOutcome, OcrPdfError> {
    let failed = |source: std::io::Error| OcrPdfError::CleanupFailed {
        path: dir.to_path_buf(),
        source,
    };

    if !dir.exists() {
        info!("The folder '{}' does not exist", dir.display());
        return Ok(CleanupOutcome::Absent);
    }

    std::fs::remove_dir_all(dir).map_err(failed)?;
    std::fs::create_dir_all(dir).map_err(failed)?;
    info!("All contents of the folder '{}' have been deleted", dir.display());
    Ok(CleanupOutcome::Cleared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clears_nested_contents_and_recreates() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("images");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("page_0.png"), b"png").unwrap();
        std::fs::write(dir.join("nested/page_1.png"), b"png").unwrap();

        assert_eq!(clear_work_dir(&dir).unwrap(), CleanupOutcome::Cleared);
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn twice_in_a_row_is_safe() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("images");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("page_0.png"), b"png").unwrap();

        assert_eq!(clear_work_dir(&dir).unwrap(), CleanupOutcome::Cleared);
        assert_eq!(clear_work_dir(&dir).unwrap(), CleanupOutcome::Cleared);
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn absent_dir_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("never-created");
        assert_eq!(clear_work_dir(&dir).unwrap(), CleanupOutcome::Absent);
        assert!(!dir.exists());
    }
}
