use crate::llm::LLMConfig;
use crate::llm::summary::SummaryConfig;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the Lecture Analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Video discovery and validation
    pub processing: ProcessingConfig,

    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Speech recognition settings
    pub transcription: TranscriptionConfig,

    /// Slide-change detection settings
    pub slides: SlidesConfig,

    /// LLM provider settings (summaries and quizzes)
    pub llm: LLMConfig,

    /// Summarization settings
    pub summary: SummaryConfig,

    /// Quiz generation settings
    pub quiz: QuizConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Supported video file extensions
    pub supported_extensions: Vec<String>,

    /// Skip videos that already have output
    pub skip_existing: bool,

    /// Probe videos for decodability before processing
    pub validate_videos: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate for the recognizer
    pub sample_rate: u32,

    /// Remove extracted WAV files after transcription
    pub cleanup_temp_files: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Vosk model directory
    pub model_path: PathBuf,

    /// Recognizer CLI executable
    pub executable: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlidesConfig {
    /// Sample one frame out of every N
    pub frame_interval: u64,

    /// Hamming distance that must be exceeded to count as a slide change
    pub hash_threshold: u32,

    /// Width frames are scaled to before hashing/OCR
    pub frame_width: u32,

    /// Height frames are scaled to before hashing/OCR
    pub frame_height: u32,

    /// Tesseract language code
    pub ocr_language: String,

    /// Seconds within which a slide attaches to a voice segment when merging
    pub merge_max_gap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Default number of questions per quiz
    pub num_questions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Directory uploaded videos are saved to
    pub upload_dir: PathBuf,

    /// Maximum upload size in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base output directory for batch processing
    pub base_dir: PathBuf,

    /// Log level when none is given via RUST_LOG
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of concurrent video workers
    pub max_workers: usize,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "lecture-analyzer.toml",
            "config/lecture-analyzer.toml",
            "~/.config/lecture-analyzer/config.toml",
            "/etc/lecture-analyzer/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(model_path) = std::env::var("VOSK_MODEL_PATH") {
            config.transcription.model_path = PathBuf::from(model_path);
        }

        if let Ok(model_path) = std::env::var("LECTURE_ANALYZER_MODEL_PATH") {
            config.transcription.model_path = PathBuf::from(model_path);
        }

        if let Ok(workers) = std::env::var("LECTURE_ANALYZER_WORKERS") {
            config.performance.max_workers = workers.parse().unwrap_or(config.performance.max_workers);
        }

        if let Ok(port) = std::env::var("LECTURE_ANALYZER_PORT") {
            config.server.port = port.parse().unwrap_or(config.server.port);
        }

        if let Ok(output_dir) = std::env::var("LECTURE_ANALYZER_OUTPUT_DIR") {
            config.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(endpoint) = std::env::var("LECTURE_ANALYZER_LLM_ENDPOINT") {
            config.llm.endpoint = Some(endpoint);
        }

        if let Ok(api_key) = std::env::var("LECTURE_ANALYZER_LLM_API_KEY") {
            config.llm.api_key = Some(api_key);
        }

        if let Ok(log_level) = std::env::var("LECTURE_ANALYZER_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.performance.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow!("sample_rate must be greater than 0"));
        }

        if self.slides.frame_interval == 0 {
            return Err(anyhow!("frame_interval must be at least 1"));
        }

        if self.slides.frame_width == 0 || self.slides.frame_height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero"));
        }

        if self.quiz.num_questions == 0 {
            return Err(anyhow!("num_questions must be at least 1"));
        }

        if !self.output.base_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.output.base_dir) {
                return Err(anyhow!("Cannot create output directory: {}", e));
            }
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Lecture Analyzer Configuration:\n\
            - Workers: {}\n\
            - Audio Sample Rate: {}Hz\n\
            - Vosk Model: {}\n\
            - Frame Interval: {} (threshold {})\n\
            - LLM Provider: {:?}\n\
            - Output Directory: {}\n\
            - Server: {}:{}",
            self.performance.max_workers,
            self.audio.sample_rate,
            self.transcription.model_path.display(),
            self.slides.frame_interval,
            self.slides.hash_threshold,
            self.llm.provider,
            self.output.base_dir.display(),
            self.server.host,
            self.server.port,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processing: ProcessingConfig {
                supported_extensions: vec![
                    "mp4".to_string(),
                    "mkv".to_string(),
                    "avi".to_string(),
                    "mov".to_string(),
                    "webm".to_string(),
                    "m4v".to_string(),
                ],
                skip_existing: true,
                validate_videos: true,
            },
            audio: AudioConfig {
                sample_rate: 16000, // What the Vosk small models expect
                cleanup_temp_files: true,
            },
            transcription: TranscriptionConfig {
                model_path: PathBuf::from("models/vosk-model-small-en-us-0.15"),
                executable: "vosk-transcriber".to_string(),
            },
            slides: SlidesConfig {
                frame_interval: 30,
                hash_threshold: 5,
                frame_width: 640,
                frame_height: 360,
                ocr_language: "eng".to_string(),
                merge_max_gap: 3.0,
            },
            llm: LLMConfig::default(),
            summary: SummaryConfig::default(),
            quiz: QuizConfig { num_questions: 5 },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                upload_dir: PathBuf::from("./uploads"),
                max_upload_bytes: 2 * 1024 * 1024 * 1024, // 2GB
            },
            output: OutputConfig {
                base_dir: PathBuf::from("./output"),
                log_level: "info".to_string(),
            },
            performance: PerformanceConfig {
                max_workers: num_cpus::get().min(4),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_workers = workers;
        self
    }

    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.config.transcription.model_path = path;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_frame_interval(mut self, interval: u64) -> Self {
        self.config.slides.frame_interval = interval;
        self
    }

    pub fn with_hash_threshold(mut self, threshold: u32) -> Self {
        self.config.slides.hash_threshold = threshold;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
