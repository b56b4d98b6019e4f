//! Request handlers for the REST API

use axum::extract::Multipart;
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::models::*;
use super::server::AppState;
use crate::slides::{self, SlideDetectorConfig, TesseractOcr};
use crate::transcription::TranscriptionResult;
use crate::video::VideoProcessor;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

/// GET /health
pub async fn health_check(state: &AppState) -> HealthResponse {
    let vosk_available = state.transcriber.check_availability().await.unwrap_or(false);
    let tesseract_available = TesseractOcr::check_availability().is_ok();
    let llm_available = state.llm.is_available().await;

    HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        vosk_available,
        tesseract_available,
        llm_available,
    }
}

/// POST /transcribe
pub async fn transcribe_upload(
    state: &AppState,
    multipart: Multipart,
) -> Result<TranscribeResponse, ApiError> {
    let upload = save_upload(state, multipart).await?;

    let result = transcribe_video(state, &upload.path).await;

    cleanup_upload(state, &upload.path).await;
    let result = result?;

    Ok(TranscribeResponse {
        filename: upload.filename,
        text: result.full_text,
        segments: result.segments,
        duration: result.duration,
    })
}

/// POST /extract
pub async fn extract_upload(
    state: &AppState,
    multipart: Multipart,
) -> Result<ExtractResponse, ApiError> {
    let upload = save_upload(state, multipart).await?;

    let result = extract_slides(state, &upload.path).await;

    cleanup_upload(state, &upload.path).await;
    let frames = result?;

    Ok(ExtractResponse {
        filename: upload.filename,
        frames,
    })
}

/// POST /quiz
pub async fn generate_quiz(
    state: &AppState,
    request: QuizRequest,
) -> Result<QuizResponse, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("'text' must not be empty".to_string()));
    }

    let generator = state.quiz_generator(request.num_questions);
    let quiz = generator.generate(state.llm.as_ref().as_ref(), &request.text).await?;

    Ok(QuizResponse {
        questions: quiz.questions,
        generated_count: quiz.generated_count,
    })
}

/// POST /summarize
pub async fn summarize_text(
    state: &AppState,
    request: SummarizeRequest,
) -> Result<SummarizeResponse, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("'text' must not be empty".to_string()));
    }

    let duration_minutes = request.duration_minutes.unwrap_or(10.0);
    let summary = state
        .summarizer
        .summarize(
            state.llm.as_ref().as_ref(),
            &state.cleaner,
            &request.text,
            duration_minutes,
        )
        .await?;

    Ok(SummarizeResponse {
        summary: summary.full_text(),
        paragraphs: summary.paragraphs,
        failed_chunks: summary.failed_chunks,
    })
}

struct SavedUpload {
    path: PathBuf,
    filename: String,
}

/// Save the first file field of a multipart upload under the upload dir.
async fn save_upload(state: &AppState, mut multipart: Multipart) -> Result<SavedUpload, ApiError> {
    let upload_dir = &state.config.server.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Cannot create upload dir: {}", e)))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let filename = sanitize_filename(&original_name);
        let unique = format!("{}_{}", Utc::now().timestamp_millis(), filename);
        let path = upload_dir.join(&unique);

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }

        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to save upload: {}", e)))?;

        info!("📥 Saved upload: {} ({} bytes)", path.display(), data.len());

        return Ok(SavedUpload { path, filename });
    }

    Err(ApiError::BadRequest(
        "No file field found in multipart body".to_string(),
    ))
}

async fn cleanup_upload(state: &AppState, path: &Path) {
    if state.config.audio.cleanup_temp_files {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove upload {}: {}", path.display(), e);
        }
    }
}

async fn transcribe_video(
    state: &AppState,
    video_path: &Path,
) -> Result<TranscriptionResult, ApiError> {
    let wav_path = video_path.with_extension("wav");

    state.audio.extract_audio(video_path, &wav_path).await?;

    let result = state.transcriber.transcribe(&wav_path).await;

    if state.config.audio.cleanup_temp_files {
        let _ = tokio::fs::remove_file(&wav_path).await;
    }

    Ok(result?)
}

async fn extract_slides(
    state: &AppState,
    video_path: &Path,
) -> Result<Vec<crate::slides::SlideRecord>, ApiError> {
    let processor = VideoProcessor::new();
    let info = processor.get_video_info(video_path).await?;

    let slides_config = state.config.slides.clone();
    let detector_config = SlideDetectorConfig {
        frame_interval: slides_config.frame_interval,
        hash_threshold: slides_config.hash_threshold,
    };
    let path = video_path.to_path_buf();

    let frames = tokio::task::spawn_blocking(move || {
        slides::analyze_video(
            &path,
            slides_config.frame_width,
            slides_config.frame_height,
            info.fps,
            detector_config,
            &slides_config.ocr_language,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Slide extraction task failed: {}", e)))??;

    Ok(frames)
}

fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());

    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("lecture 01.mp4"), "lecture_01.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("ok-name_v2.mkv"), "ok-name_v2.mkv");
    }
}
