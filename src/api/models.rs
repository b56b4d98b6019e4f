//! API data models

use serde::{Deserialize, Serialize};

use crate::llm::quiz::QuizQuestion;
use crate::slides::SlideRecord;
use crate::transcription::TranscriptSegment;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Response body for POST /transcribe
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub filename: String,
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub duration: f64,
}

/// Response body for POST /extract
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub filename: String,
    pub frames: Vec<SlideRecord>,
}

/// Request body for POST /quiz
#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    pub text: String,
    #[serde(default)]
    pub num_questions: Option<usize>,
}

/// Response body for POST /quiz
#[derive(Debug, Serialize, Deserialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
    pub generated_count: usize,
}

/// Request body for POST /summarize
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
}

/// Response body for POST /summarize
#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub paragraphs: Vec<String>,
    pub failed_chunks: usize,
}

/// Response body for GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub vosk_available: bool,
    pub tesseract_available: bool,
    pub llm_available: bool,
}
