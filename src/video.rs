use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Video information extracted from file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub filename: String,
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: Option<u64>,
    pub format: String,
    pub file_size: u64,
}

impl VideoInfo {
    /// Approximate duration in minutes, used to scale summary length.
    pub fn duration_minutes(&self) -> f64 {
        self.duration.as_secs_f64() / 60.0
    }
}

/// Video prober and discovery helper built on ffprobe
#[derive(Clone)]
pub struct VideoProcessor {
    /// Supported video extensions
    supported_extensions: Vec<String>,
}

impl VideoProcessor {
    pub fn new() -> Self {
        Self {
            supported_extensions: vec![
                "mp4".to_string(),
                "mkv".to_string(),
                "avi".to_string(),
                "mov".to_string(),
                "webm".to_string(),
                "m4v".to_string(),
            ],
        }
    }

    pub fn with_extensions(extensions: Vec<String>) -> Self {
        Self {
            supported_extensions: extensions,
        }
    }

    /// Discover all video files in a directory recursively
    pub async fn discover_videos(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        use std::future::Future;
        use std::pin::Pin;

        fn discover_recursive<'a>(
            supported_extensions: &'a [String],
            dir: &'a Path,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>>> + Send + 'a>> {
            Box::pin(async move {
                let mut videos = Vec::new();

                let mut entries = tokio::fs::read_dir(dir).await?;

                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();

                    if path.is_dir() {
                        let mut sub_videos = discover_recursive(supported_extensions, &path).await?;
                        videos.append(&mut sub_videos);
                    } else if let Some(extension) = path.extension() {
                        if let Some(ext_str) = extension.to_str() {
                            if supported_extensions.contains(&ext_str.to_lowercase()) {
                                videos.push(path);
                            }
                        }
                    }
                }

                videos.sort();
                Ok(videos)
            })
        }

        discover_recursive(&self.supported_extensions, dir).await
    }

    /// Extract video information using ffprobe
    pub async fn get_video_info(&self, video_path: &Path) -> Result<VideoInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                &video_path.to_string_lossy(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", video_path.display()));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let ffprobe_data: serde_json::Value = serde_json::from_str(&json_str)?;

        let format = &ffprobe_data["format"];
        let streams = ffprobe_data["streams"]
            .as_array()
            .ok_or_else(|| anyhow!("ffprobe returned no streams for {}", video_path.display()))?;

        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"] == "video")
            .ok_or_else(|| anyhow!("No video stream found in {}", video_path.display()))?;

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let fps = video_stream["r_frame_rate"]
            .as_str()
            .and_then(|s| {
                let parts: Vec<&str> = s.split('/').collect();
                if parts.len() == 2 {
                    let num: f64 = parts[0].parse().ok()?;
                    let den: f64 = parts[1].parse().ok()?;
                    if den != 0.0 {
                        Some(num / den)
                    } else {
                        None
                    }
                } else {
                    s.parse().ok()
                }
            })
            .unwrap_or(0.0);

        // nb_frames is container metadata and absent for some formats; the
        // frame stream itself remains the source of truth for termination.
        let frame_count = video_stream["nb_frames"]
            .as_str()
            .and_then(|s| s.parse().ok());

        let file_size = tokio::fs::metadata(video_path).await?.len();

        let video_info = VideoInfo {
            path: video_path.to_path_buf(),
            filename: video_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| video_path.display().to_string()),
            duration: Duration::from_secs_f64(duration_seconds),
            width: video_stream["width"].as_u64().unwrap_or(0) as u32,
            height: video_stream["height"].as_u64().unwrap_or(0) as u32,
            fps,
            frame_count,
            format: format["format_name"]
                .as_str()
                .unwrap_or("unknown")
                .to_string(),
            file_size,
        };

        info!(
            "📹 Analyzed video: {} ({}x{}, {:.1}fps, {:.1}s)",
            video_info.filename,
            video_info.width,
            video_info.height,
            video_info.fps,
            video_info.duration.as_secs_f64()
        );

        Ok(video_info)
    }

    /// Validate video file integrity
    pub async fn validate_video(&self, video_path: &Path) -> Result<bool> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_name",
                "-of",
                "csv=p=0",
                &video_path.to_string_lossy(),
            ])
            .output()
            .await?;

        Ok(output.status.success())
    }
}

impl Default for VideoProcessor {
    fn default() -> Self {
        Self::new()
    }
}
