//! Text extraction from images for the create-doubt form
//!
//! The engine is an external program; by default the `tesseract` CLI.
//! Failures never reach the caller as errors, only as an [`OcrStatus`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, image: &Path) -> Result<String>;
}

/// Runs `<command> <image> stdout -l <language>` and reads stdout.
pub struct TesseractCli {
    command: String,
    language: String,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ocr_command, &config.ocr_language)
    }
}

#[async_trait]
impl TextExtractor for TesseractCli {
    async fn extract(&self, image: &Path) -> Result<String> {
        let mut cmd = Command::new(&self.command);
        cmd.arg(image).arg("stdout").arg("-l").arg(&self.language);

        debug!("Executing OCR command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{} exited with {}: {}", self.command, output.status, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrStatus {
    NoImage,
    Extracting,
    Extracted,
    NoText,
    Failed,
}

impl OcrStatus {
    pub fn message(&self) -> &'static str {
        match self {
            OcrStatus::NoImage => "Select an image first",
            OcrStatus::Extracting => "Extracting text...",
            OcrStatus::Extracted => "Text extracted",
            OcrStatus::NoText => "No text found",
            OcrStatus::Failed => "OCR failed",
        }
    }
}

/// Extract text from `image` into `question`. The question only changes
/// when text was found.
pub async fn extract_into<E: TextExtractor + ?Sized>(
    extractor: &E,
    image: Option<&Path>,
    question: &mut String,
) -> OcrStatus {
    let Some(image) = image.filter(|p| !p.as_os_str().is_empty()) else {
        return OcrStatus::NoImage;
    };

    match extractor.extract(image).await {
        Ok(text) if text.trim().is_empty() => OcrStatus::NoText,
        Ok(text) => {
            *question = merge_text(question, &text);
            OcrStatus::Extracted
        }
        Err(e) => {
            warn!(error = %e, image = %image.display(), "OCR failed");
            OcrStatus::Failed
        }
    }
}

fn merge_text(question: &str, extracted: &str) -> String {
    let extracted = extracted.trim();
    if question.trim().is_empty() {
        extracted.to_string()
    } else {
        format!("{}\n\n{}", question.trim_end(), extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl TextExtractor for Fixed {
        async fn extract(&self, _image: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl TextExtractor for Broken {
        async fn extract(&self, _image: &Path) -> Result<String> {
            Err(anyhow!("engine crashed"))
        }
    }

    #[tokio::test]
    async fn test_missing_image() {
        let mut question = "keep me".to_string();
        let status = extract_into(&Fixed("text"), None, &mut question).await;
        assert_eq!(status.message(), "Select an image first");
        assert_eq!(question, "keep me");

        let status = extract_into(&Fixed("text"), Some(Path::new("")), &mut question).await;
        assert_eq!(status, OcrStatus::NoImage);
    }

    #[tokio::test]
    async fn test_text_appended_after_blank_line() {
        let mut question = "Solve this:\n".to_string();
        let status = extract_into(&Fixed("  x + 1 = 2\n"), Some(Path::new("eq.png")), &mut question).await;
        assert_eq!(status, OcrStatus::Extracted);
        assert_eq!(question, "Solve this:\n\nx + 1 = 2");
    }

    #[tokio::test]
    async fn test_text_fills_empty_question() {
        let mut question = String::new();
        extract_into(&Fixed("x + 1 = 2"), Some(Path::new("eq.png")), &mut question).await;
        assert_eq!(question, "x + 1 = 2");
    }

    #[tokio::test]
    async fn test_blank_output_and_failure_leave_question() {
        let mut question = "original".to_string();

        let status = extract_into(&Fixed(" \n\x0c"), Some(Path::new("blank.png")), &mut question).await;
        assert_eq!(status.message(), "No text found");

        let status = extract_into(&Broken, Some(Path::new("eq.png")), &mut question).await;
        assert_eq!(status.message(), "OCR failed");
        assert_eq!(question, "original");
    }

    #[tokio::test]
    async fn test_missing_executable_is_a_failure() {
        let cli = TesseractCli::new("novard-no-such-ocr-binary", "eng");
        let mut question = String::new();
        let status = extract_into(&cli, Some(Path::new("eq.png")), &mut question).await;
        assert_eq!(status, OcrStatus::Failed);
        assert!(question.is_empty());
    }
}
