use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

pub const DEFAULT_OCR_LANGUAGES: &str = "chi_tra+eng";

/// Reads text printed on an image.
#[async_trait]
pub trait ImageTextReader: Send + Sync {
    /// `None` when the image could not be read.
    async fn read_text(&self, image: &Path) -> Option<String>;
}

/// `tesseract` command-line OCR.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    languages: String,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages: DEFAULT_OCR_LANGUAGES.to_string(),
        }
    }
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, languages: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.into(),
        }
    }

    /// Whether the binary runs at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    /// The reader, or `None` with a single warning when tesseract cannot run.
    pub async fn detect(binary: impl Into<PathBuf>, languages: impl Into<String>) -> Option<Self> {
        let cli = Self::new(binary, languages);
        if cli.is_available().await {
            Some(cli)
        } else {
            warn!(binary = %cli.binary.display(), "tesseract is not available, importing without OCR");
            None
        }
    }
}

#[async_trait]
impl ImageTextReader for TesseractCli {
    async fn read_text(&self, image: &Path) -> Option<String> {
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                debug!(image = %image.display(), status = %output.status, "OCR failed");
                None
            }
            Err(e) => {
                debug!(image = %image.display(), error = %e, "OCR unavailable");
                None
            }
        }
    }
}
