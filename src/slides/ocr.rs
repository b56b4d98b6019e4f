use anyhow::{anyhow, Context, Result};
use std::process::Command;
use tracing::debug;

use super::frames::Frame;

/// OCR collaborator. May legitimately return an empty string for frames with
/// no readable text; errors mean the engine itself failed.
pub trait OcrEngine: Send + Sync {
    fn extract_text(&self, frame: &Frame) -> Result<String>;
}

/// OCR engine shelling out to the `tesseract` CLI.
///
/// Each call writes the frame to a scratch PNG and reads the recognized text
/// from tesseract's stdout. Slow, so the detector only invokes it on frames
/// that pass the hash-distance gate.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Check whether the tesseract binary is on PATH.
    pub fn check_availability() -> Result<String> {
        let output = Command::new("tesseract")
            .arg("--version")
            .output()
            .context("tesseract not found on PATH")?;

        if !output.status.success() {
            return Err(anyhow!("tesseract --version exited with {}", output.status));
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        let version = banner.lines().next().unwrap_or("tesseract").to_string();
        Ok(version)
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn extract_text(&self, frame: &Frame) -> Result<String> {
        let img = image::GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| {
                anyhow!(
                    "frame buffer does not match {}x{} dimensions",
                    frame.width,
                    frame.height
                )
            })?;

        let scratch = tempfile::Builder::new()
            .prefix("slide_frame_")
            .suffix(".png")
            .tempfile()
            .context("failed to create OCR scratch file")?;
        img.save(scratch.path())
            .context("failed to write OCR scratch PNG")?;

        let output = Command::new("tesseract")
            .arg(scratch.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .context("failed to run tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("OCR produced {} characters", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_language() {
        let ocr = TesseractOcr::default();
        assert_eq!(ocr.language, "eng");
    }

    #[test]
    fn test_bad_frame_dimensions_rejected() {
        let ocr = TesseractOcr::default();
        let frame = Frame {
            width: 16,
            height: 16,
            data: vec![0u8; 4],
        };
        assert!(ocr.extract_text(&frame).is_err());
    }
}
