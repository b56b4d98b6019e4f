use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use crate::audio::AudioExtractor;
use crate::config::Config;
use crate::llm::quiz::{Quiz, QuizGenerator};
use crate::llm::refine::TranscriptRefiner;
use crate::llm::summary::{Summarizer, Summary};
use crate::llm::{create_llm, LLM};
use crate::slides::{self, SlideDetectorConfig, SlideRecord};
use crate::text::TextCleaner;
use crate::transcription::{TranscriptionResult, VoskTranscriber};
use crate::video::{VideoInfo, VideoProcessor};

/// Full analysis artifacts for a single lecture video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LectureAnalysis {
    pub video_info: VideoInfo,
    pub transcription: Option<TranscriptionResult>,
    pub slides: Vec<SlideRecord>,
    pub merged_text: Option<String>,
    pub summary: Option<Summary>,
    pub quiz: Option<Quiz>,
    pub processing_time: Duration,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
    pub stages_completed: Vec<ProcessingStage>,
}

/// Overall batch processing results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub results: Vec<LectureAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    InProgress,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcessingStage {
    VideoAnalysis,
    AudioExtraction,
    Transcription,
    SlideExtraction,
    TextMerge,
    Summary,
    Quiz,
    Completed,
}

/// Batch lecture processor with a semaphore-bounded worker pool.
pub struct LectureProcessor {
    config: Config,
    video_processor: VideoProcessor,
    audio_extractor: AudioExtractor,
    transcriber: VoskTranscriber,
    cleaner: Arc<TextCleaner>,
    llm: Arc<Box<dyn LLM>>,
    summarizer: Arc<Summarizer>,
    worker_semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl LectureProcessor {
    pub fn new(config: Config, max_workers: usize) -> Result<Self> {
        info!("🔧 Initializing LectureProcessor with {} workers", max_workers);

        let llm = Arc::new(create_llm(&config.llm)?);
        let summarizer = Arc::new(Summarizer::new(config.summary.clone()));
        let cleaner = Arc::new(TextCleaner::new()?);
        let transcriber = VoskTranscriber::with_executable(
            config.transcription.model_path.clone(),
            config.transcription.executable.clone(),
        );
        let video_processor = VideoProcessor::with_extensions(
            config.processing.supported_extensions.clone(),
        );
        let audio_extractor = AudioExtractor::new(config.audio.sample_rate);

        Ok(Self {
            config,
            video_processor,
            audio_extractor,
            transcriber,
            cleaner,
            llm,
            summarizer,
            worker_semaphore: Arc::new(Semaphore::new(max_workers)),
            max_concurrent: max_workers,
        })
    }

    /// Process all videos in a directory
    pub async fn process_directory(
        self: Arc<Self>,
        input_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Result<ProcessingResult> {
        let start_time = Instant::now();

        info!("🚀 Starting batch processing...");
        info!("📁 Input: {}", input_dir.display());
        info!("📂 Output: {}", output_dir.display());

        tokio::fs::create_dir_all(&output_dir).await?;

        info!("🔍 Discovering videos...");
        let video_paths = self.video_processor.discover_videos(&input_dir).await?;

        if video_paths.is_empty() {
            warn!("No videos found in {}", input_dir.display());
            return Ok(ProcessingResult {
                total: 0,
                successful: 0,
                failed: 0,
                total_time: start_time.elapsed(),
                results: Vec::new(),
            });
        }

        info!("📹 Found {} videos to process", video_paths.len());

        let results = Arc::clone(&self)
            .process_videos_parallel(video_paths, &output_dir)
            .await?;

        let total_time = start_time.elapsed();
        let successful = results
            .iter()
            .filter(|r| matches!(r.status, ProcessingStatus::Completed))
            .count();
        let failed = results
            .iter()
            .filter(|r| matches!(r.status, ProcessingStatus::Failed))
            .count();

        let processing_result = ProcessingResult {
            total: results.len(),
            successful,
            failed,
            total_time,
            results,
        };

        let results_path = output_dir.join("processing_results.json");
        let json_data = serde_json::to_string_pretty(&processing_result)?;
        tokio::fs::write(&results_path, json_data).await?;

        info!("💾 Results saved to: {}", results_path.display());

        Ok(processing_result)
    }

    /// Process multiple videos in parallel with controlled concurrency
    async fn process_videos_parallel(
        self: Arc<Self>,
        video_paths: Vec<PathBuf>,
        output_dir: &Path,
    ) -> Result<Vec<LectureAnalysis>> {
        let (tx, mut rx) = mpsc::channel(self.max_concurrent);
        let total_videos = video_paths.len();

        for (index, video_path) in video_paths.into_iter().enumerate() {
            let processor = Arc::clone(&self);
            let output_dir = output_dir.to_path_buf();
            let tx = tx.clone();

            tokio::spawn(async move {
                let permit = processor.worker_semaphore.acquire().await;
                if permit.is_err() {
                    return;
                }

                info!(
                    "📹 Processing video {}/{}: {}",
                    index + 1,
                    total_videos,
                    video_path.display()
                );

                let result = processor.process_single_video(&video_path, &output_dir).await;

                if let Err(e) = tx.send(result).await {
                    error!("Failed to send result: {}", e);
                }
            });
        }

        drop(tx);

        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            match result {
                Ok(analysis) => {
                    match analysis.status {
                        ProcessingStatus::Completed => {
                            info!(
                                "✅ Completed: {} in {:.2}s",
                                analysis.video_info.filename,
                                analysis.processing_time.as_secs_f64()
                            );
                        }
                        ProcessingStatus::Failed => {
                            warn!(
                                "❌ Failed: {} - {}",
                                analysis.video_info.filename,
                                analysis.error_message.as_deref().unwrap_or("Unknown error")
                            );
                        }
                        _ => {}
                    }
                    results.push(analysis);
                }
                Err(e) => {
                    error!("Processing error: {}", e);
                }
            }
        }

        results.sort_by(|a, b| a.video_info.filename.cmp(&b.video_info.filename));
        Ok(results)
    }

    /// Process a single video through the complete pipeline
    pub async fn process_single_video(
        &self,
        video_path: &Path,
        output_dir: &Path,
    ) -> Result<LectureAnalysis> {
        let start_time = Instant::now();
        let mut stages_completed = Vec::new();

        // Stage 1: probe — fatal if the file cannot be analyzed
        debug!("📊 Analyzing video: {}", video_path.display());
        let video_info = match self.video_processor.get_video_info(video_path).await {
            Ok(info) => info,
            Err(e) => {
                return Ok(failed_analysis(
                    video_path,
                    format!("Video analysis failed: {}", e),
                    start_time.elapsed(),
                ));
            }
        };
        stages_completed.push(ProcessingStage::VideoAnalysis);

        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());

        if self.config.processing.skip_existing {
            let analysis_path = output_dir.join(format!("{stem}_analysis.json"));
            if analysis_path.exists() {
                info!("⏭️ Skipping {} (output exists)", video_info.filename);
                return Ok(LectureAnalysis {
                    video_info,
                    transcription: None,
                    slides: Vec::new(),
                    merged_text: None,
                    summary: None,
                    quiz: None,
                    processing_time: start_time.elapsed(),
                    status: ProcessingStatus::Skipped,
                    error_message: None,
                    stages_completed,
                });
            }
        }

        // Stage 2+3: audio extraction and transcription. Losing the
        // transcript degrades the output but does not fail the video.
        let transcription = self
            .run_transcription(video_path, output_dir, &stem, &mut stages_completed)
            .await;

        // Stage 4: slide extraction, same degradation policy
        let slides = self
            .run_slide_extraction(video_path, &video_info, &mut stages_completed)
            .await;

        // Stage 5: merge slide text with voice segments
        let merged_text = self.merge_texts(&transcription, &slides, &mut stages_completed);

        // Stage 6 + 7: LLM summary and quiz over whatever text we have
        let (summary, quiz) = self
            .run_llm_stages(&merged_text, &video_info, &mut stages_completed)
            .await;

        stages_completed.push(ProcessingStage::Completed);

        let analysis = LectureAnalysis {
            video_info,
            transcription,
            slides,
            merged_text,
            summary,
            quiz,
            processing_time: start_time.elapsed(),
            status: ProcessingStatus::Completed,
            error_message: None,
            stages_completed,
        };

        self.save_analysis(&analysis, output_dir, &stem).await?;

        Ok(analysis)
    }

    async fn run_transcription(
        &self,
        video_path: &Path,
        output_dir: &Path,
        stem: &str,
        stages: &mut Vec<ProcessingStage>,
    ) -> Option<TranscriptionResult> {
        let wav_path = output_dir.join("audio").join(format!("{stem}.wav"));

        let audio_info = match self.audio_extractor.extract_audio(video_path, &wav_path).await {
            Ok(info) => {
                stages.push(ProcessingStage::AudioExtraction);
                info
            }
            Err(e) => {
                warn!("⚠️ Audio extraction failed for {}: {}", video_path.display(), e);
                return None;
            }
        };

        let result = match self.transcriber.transcribe(&audio_info.path).await {
            Ok(result) => {
                stages.push(ProcessingStage::Transcription);
                if let Err(e) = self.transcriber.save_outputs(&result, output_dir).await {
                    warn!("⚠️ Failed to save transcript outputs: {}", e);
                }
                Some(result)
            }
            Err(e) => {
                warn!("⚠️ Transcription failed for {}: {}", video_path.display(), e);
                None
            }
        };

        if self.config.audio.cleanup_temp_files {
            let _ = tokio::fs::remove_file(&audio_info.path).await;
        }

        result
    }

    async fn run_slide_extraction(
        &self,
        video_path: &Path,
        video_info: &VideoInfo,
        stages: &mut Vec<ProcessingStage>,
    ) -> Vec<SlideRecord> {
        let slides_config = self.config.slides.clone();
        let detector_config = SlideDetectorConfig {
            frame_interval: slides_config.frame_interval,
            hash_threshold: slides_config.hash_threshold,
        };
        let fps = video_info.fps;
        let path = video_path.to_path_buf();

        let outcome = tokio::task::spawn_blocking(move || {
            slides::analyze_video(
                &path,
                slides_config.frame_width,
                slides_config.frame_height,
                fps,
                detector_config,
                &slides_config.ocr_language,
            )
        })
        .await;

        match outcome {
            Ok(Ok(records)) => {
                info!("🖼️ Extracted {} slides from {}", records.len(), video_info.filename);
                stages.push(ProcessingStage::SlideExtraction);
                records
            }
            Ok(Err(e)) => {
                warn!("⚠️ Slide extraction failed for {}: {}", video_info.filename, e);
                Vec::new()
            }
            Err(e) => {
                warn!("⚠️ Slide extraction task panicked for {}: {}", video_info.filename, e);
                Vec::new()
            }
        }
    }

    fn merge_texts(
        &self,
        transcription: &Option<TranscriptionResult>,
        slides: &[SlideRecord],
        stages: &mut Vec<ProcessingStage>,
    ) -> Option<String> {
        let merged = match transcription {
            Some(result) if !slides.is_empty() => self.cleaner.merge_by_timestamps(
                slides,
                &result.segments,
                self.config.slides.merge_max_gap,
            ),
            Some(result) => self.cleaner.clean_text(&result.full_text),
            None if !slides.is_empty() => slides
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            None => return None,
        };

        if merged.trim().is_empty() {
            return None;
        }

        stages.push(ProcessingStage::TextMerge);
        Some(merged)
    }

    async fn run_llm_stages(
        &self,
        merged_text: &Option<String>,
        video_info: &VideoInfo,
        stages: &mut Vec<ProcessingStage>,
    ) -> (Option<Summary>, Option<Quiz>) {
        let Some(text) = merged_text else {
            return (None, None);
        };

        // Optional model-assisted cleanup. On failure the rule-cleaned text
        // stands; the run never degrades below it.
        let text = match TranscriptRefiner::refine(self.llm.as_ref().as_ref(), text).await {
            Ok(refined) => refined,
            Err(e) => {
                warn!(
                    "⚠️ Transcript refinement failed for {}, keeping rule-cleaned text: {}",
                    video_info.filename, e
                );
                text.clone()
            }
        };
        let text = &text;

        let summary = match self
            .summarizer
            .summarize(
                self.llm.as_ref().as_ref(),
                &self.cleaner,
                text,
                video_info.duration_minutes(),
            )
            .await
        {
            Ok(summary) => {
                stages.push(ProcessingStage::Summary);
                Some(summary)
            }
            Err(e) => {
                warn!("⚠️ Summarization failed for {}: {}", video_info.filename, e);
                None
            }
        };

        let quiz_source = summary
            .as_ref()
            .map(|s| s.full_text())
            .unwrap_or_else(|| text.clone());

        let generator = QuizGenerator::new(self.config.quiz.num_questions);
        let quiz = match generator
            .generate(self.llm.as_ref().as_ref(), &quiz_source)
            .await
        {
            Ok(quiz) => {
                stages.push(ProcessingStage::Quiz);
                Some(quiz)
            }
            Err(e) => {
                warn!("⚠️ Quiz generation failed for {}: {}", video_info.filename, e);
                None
            }
        };

        (summary, quiz)
    }

    async fn save_analysis(
        &self,
        analysis: &LectureAnalysis,
        output_dir: &Path,
        stem: &str,
    ) -> Result<()> {
        tokio::fs::create_dir_all(output_dir).await?;

        let path = output_dir.join(format!("{stem}_analysis.json"));
        let json = serde_json::to_string_pretty(analysis)?;
        tokio::fs::write(&path, json).await?;

        if let Some(ref merged) = analysis.merged_text {
            let text_path = output_dir.join(format!("{stem}_merged.txt"));
            tokio::fs::write(&text_path, merged).await?;
        }

        debug!("💾 Saved analysis for {}", stem);
        Ok(())
    }

    /// Get processing statistics
    pub fn get_stats(&self) -> ProcessingStats {
        ProcessingStats {
            max_workers: self.max_concurrent,
            available_permits: self.worker_semaphore.available_permits(),
        }
    }
}

fn failed_analysis(video_path: &Path, message: String, elapsed: Duration) -> LectureAnalysis {
    LectureAnalysis {
        video_info: VideoInfo {
            path: video_path.to_path_buf(),
            filename: video_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| video_path.display().to_string()),
            duration: Duration::from_secs(0),
            width: 0,
            height: 0,
            fps: 0.0,
            frame_count: None,
            format: String::new(),
            file_size: 0,
        },
        transcription: None,
        slides: Vec::new(),
        merged_text: None,
        summary: None,
        quiz: None,
        processing_time: elapsed,
        status: ProcessingStatus::Failed,
        error_message: Some(message),
        stages_completed: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingStats {
    pub max_workers: usize,
    pub available_permits: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_processor_creation() {
        let config = Config::default();
        let processor = LectureProcessor::new(config, 4).unwrap();

        let stats = processor.get_stats();
        assert_eq!(stats.max_workers, 4);
        assert_eq!(stats.available_permits, 4);
    }

    #[tokio::test]
    async fn test_empty_directory_processing() {
        let config = Config::default();
        let processor = Arc::new(LectureProcessor::new(config, 2).unwrap());

        let temp_dir = TempDir::new().unwrap();
        let input_dir = temp_dir.path().to_path_buf();
        let output_dir = temp_dir.path().join("output");

        let result = processor
            .process_directory(input_dir, output_dir)
            .await
            .unwrap();

        assert_eq!(result.total, 0);
        assert_eq!(result.successful, 0);
        assert_eq!(result.failed, 0);
    }

    #[tokio::test]
    async fn test_failed_analysis_for_missing_video() {
        let config = Config::default();
        let processor = LectureProcessor::new(config, 1).unwrap();

        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.mp4");
        let analysis = processor
            .process_single_video(&missing, temp_dir.path())
            .await
            .unwrap();

        assert_eq!(analysis.status, ProcessingStatus::Failed);
        assert!(analysis.error_message.is_some());
    }
}
