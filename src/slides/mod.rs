//! Slide-text extraction from lecture video.
//!
//! The detector samples decoded frames at a fixed interval, compares a
//! perceptual hash against the last emitted frame, and only pays for OCR when
//! the slide actually changed.

pub mod detector;
pub mod frames;
pub mod ocr;
pub mod phash;

pub use detector::{SlideDetector, SlideDetectorConfig, SlideError, SlideRecord, SlideStream};
pub use frames::{FfmpegFrameSource, Frame, FrameSource};
pub use ocr::{OcrEngine, TesseractOcr};
pub use phash::{hamming_distance, AverageHasher, FrameHasher, HASH_BITS};

use anyhow::Result;
use std::path::Path;
use tracing::warn;

/// Run slide detection over a video file with the production collaborators
/// (ffmpeg decode, average hash, tesseract OCR).
///
/// Policy at this seam: hash failures on individual frames are logged and
/// skipped, decode failures abort the run. Blocking; call from
/// `spawn_blocking` in async contexts.
pub fn analyze_video(
    video_path: &Path,
    width: u32,
    height: u32,
    fps: f64,
    config: SlideDetectorConfig,
    ocr_language: &str,
) -> Result<Vec<SlideRecord>> {
    let source = FfmpegFrameSource::open(video_path, width, height, fps)?;
    let detector = SlideDetector::new(
        config,
        AverageHasher,
        TesseractOcr::new(ocr_language.to_string()),
    );

    let mut records = Vec::new();
    for item in detector.records(source) {
        match item {
            Ok(record) => records.push(record),
            Err(e @ SlideError::Hash { .. }) => {
                warn!("⚠️ Skipping frame: {}", e);
            }
            Err(e @ SlideError::Decode { .. }) => return Err(e.into()),
        }
    }

    Ok(records)
}
