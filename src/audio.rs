use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Information about an extracted audio file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    pub path: PathBuf,
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u32,
    pub file_size: u64,
}

/// Extracts recognizer-ready audio from video files using ffmpeg.
///
/// The offline recognizer expects 16 kHz mono signed 16-bit PCM, so every
/// extraction normalizes to that format regardless of the source codec.
#[derive(Clone)]
pub struct AudioExtractor {
    sample_rate: u32,
}

impl AudioExtractor {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Extract the audio track of `video_path` into a WAV at `output_path`.
    pub async fn extract_audio(&self, video_path: &Path, output_path: &Path) -> Result<AudioInfo> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(
            "🎵 Extracting audio: {} -> {}",
            video_path.display(),
            output_path.display()
        );

        let output = tokio::process::Command::new("ffmpeg")
            .args([
                "-y",
                "-i",
                &video_path.to_string_lossy(),
                "-vn",
                "-acodec",
                "pcm_s16le",
                "-ar",
                &self.sample_rate.to_string(),
                "-ac",
                "1",
                &output_path.to_string_lossy(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "ffmpeg audio extraction failed for {}: {}",
                video_path.display(),
                stderr.trim()
            ));
        }

        let info = self.get_audio_info(output_path).await?;

        info!(
            "✅ Audio extracted: {} ({:.1}s, {}Hz)",
            output_path.display(),
            info.duration,
            info.sample_rate
        );

        Ok(info)
    }

    /// Probe an audio file with ffprobe.
    pub async fn get_audio_info(&self, audio_path: &Path) -> Result<AudioInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                &audio_path.to_string_lossy(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", audio_path.display()));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let data: serde_json::Value = serde_json::from_str(&json_str)?;

        let streams = data["streams"]
            .as_array()
            .ok_or_else(|| anyhow!("ffprobe returned no streams for {}", audio_path.display()))?;

        let audio_stream = streams
            .iter()
            .find(|s| s["codec_type"] == "audio")
            .ok_or_else(|| anyhow!("No audio stream found in {}", audio_path.display()))?;

        let duration: f64 = data["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let sample_rate: u32 = audio_stream["sample_rate"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let channels = audio_stream["channels"].as_u64().unwrap_or(0) as u32;

        let file_size = tokio::fs::metadata(audio_path).await?.len();

        Ok(AudioInfo {
            path: audio_path.to_path_buf(),
            duration,
            sample_rate,
            channels,
            file_size,
        })
    }
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new(16_000)
    }
}
