//! Lecture Analyzer
//!
//! Turns lecture videos into transcripts, slide-text extractions, summaries
//! and quizzes, as a batch CLI and a small REST API.

pub mod api;
pub mod audio;
pub mod config;
pub mod llm;
pub mod processing;
pub mod slides;
pub mod text;
pub mod transcription;
pub mod video;

// Re-export main types for easy access
pub use crate::api::ApiServer;
pub use crate::audio::{AudioExtractor, AudioInfo};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::llm::quiz::{Quiz, QuizGenerator, QuizQuestion};
pub use crate::llm::refine::TranscriptRefiner;
pub use crate::llm::summary::{Summarizer, Summary};
pub use crate::llm::{LLMConfig, LLMProvider};
pub use crate::processing::{LectureProcessor, ProcessingResult};
pub use crate::slides::{SlideDetector, SlideDetectorConfig, SlideRecord};
pub use crate::text::TextCleaner;
pub use crate::transcription::{TranscriptionResult, VoskTranscriber};
pub use crate::video::{VideoInfo, VideoProcessor};
