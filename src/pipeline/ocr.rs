//! OCR engine seam: turn one page image into plain text.
//!
//! [`TextRecognizer`] is the narrow contract the recognition loop depends
//! on. [`Tesseract`] is the production implementation and drives the
//! `tesseract` binary as a child process. The loop owns the deadline; the
//! child is spawned with `kill_on_drop`, so dropping the future on timeout
//! also kills the process.

use crate::config::PipelineConfig;
use crate::error::PageError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Traineddata that is always stacked on top of the configured language.
pub const FAST_PROFILE: &str = "fast";

/// The `-l` argument for `language`: the language code plus the fast-mode
/// model, e.g. `eng+fast`.
pub fn language_profile(language: &str) -> String {
    format!("{}+{}", language.trim(), FAST_PROFILE)
}

/// Extracts plain text from a page image.
///
/// Errors carry page index 0; the caller relabels them with the real index.
pub trait TextRecognizer {
    fn recognize(&self, image: &Path) -> impl Future<Output = Result<String, PageError>> + Send;

    /// Human-readable description of the recognition profile, for logs.
    fn profile(&self) -> String;
}

/// Runs `<binary> <image> stdout -l <language>+fast`.
#[derive(Debug, Clone)]
pub struct Tesseract {
    binary: PathBuf,
    profile: String,
}

impl Tesseract {
    pub fn new(binary: impl Into<PathBuf>, language: &str) -> Self {
        Self {
            binary: binary.into(),
            profile: language_profile(language),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.ocr_engine_path, &config.language)
    }

    fn command(&self, image: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.profile)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl TextRecognizer for Tesseract {
    async fn recognize(&self, image: &Path) -> Result<String, PageError> {
        let failed = |detail: String| PageError::OcrFailed {
            page: 0,
            path: image.to_path_buf(),
            detail,
        };

        let output = self
            .command(image)
            .output()
            .await
            .map_err(|e| failed(format!("could not start '{}': {}", self.binary.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                msg => msg.to_string(),
            };
            return Err(failed(detail));
        }

        debug!(
            "tesseract {} → {} bytes",
            image.display(),
            output.stdout.len()
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn profile(&self) -> String {
        format!("{} -l {}", self.binary.display(), self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_always_includes_fast_model() {
        assert_eq!(language_profile("eng"), "eng+fast");
        assert_eq!(language_profile(" deu "), "deu+fast");
        assert_eq!(language_profile("rus+eng"), "rus+eng+fast");
    }

    #[test]
    fn from_config_uses_engine_path_and_language() {
        let config = PipelineConfig::builder()
            .ocr_engine_path("/opt/tesseract/bin/tesseract")
            .language("rus")
            .build()
            .unwrap();
        let t = Tesseract::from_config(&config);
        assert_eq!(t.profile(), "/opt/tesseract/bin/tesseract -l rus+fast");
    }

    #[tokio::test]
    async fn missing_binary_is_a_page_error() {
        let t = Tesseract::new("/definitely/not/tesseract", "eng");
        let err = t
            .recognize(Path::new("images/page_0.png"))
            .await
            .unwrap_err();
        match err {
            PageError::OcrFailed { path, detail, .. } => {
                assert!(path.ends_with("page_0.png"));
                assert!(detail.contains("could not start"), "got: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
