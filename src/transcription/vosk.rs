use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// A single recognized utterance with timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Complete transcription result for one audio file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub audio_path: PathBuf,
    pub segments: Vec<TranscriptSegment>,
    pub full_text: String,
    pub duration: f64,
    pub processing_time: f64,
    pub model: String,
}

impl TranscriptionResult {
    /// Join all segment texts into one transcript string.
    pub fn combined_text(segments: &[TranscriptSegment]) -> String {
        segments
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One word in a recognizer utterance, as emitted by the Vosk CLI.
#[derive(Debug, Deserialize)]
struct VoskWord {
    start: f64,
    end: f64,
    #[allow(dead_code)]
    word: String,
}

/// One utterance line from the recognizer output.
#[derive(Debug, Deserialize)]
struct VoskUtterance {
    #[serde(default)]
    result: Vec<VoskWord>,
    #[serde(default)]
    text: String,
}

/// Offline speech recognition via the `vosk-transcriber` CLI.
#[derive(Clone)]
pub struct VoskTranscriber {
    model_path: PathBuf,
    executable_path: String,
}

impl VoskTranscriber {
    pub fn new(model_path: PathBuf) -> Self {
        Self {
            model_path,
            executable_path: "vosk-transcriber".to_string(),
        }
    }

    pub fn with_executable(model_path: PathBuf, executable_path: String) -> Self {
        Self {
            model_path,
            executable_path,
        }
    }

    /// Check if the recognizer CLI and model directory are available
    pub async fn check_availability(&self) -> Result<bool> {
        if !self.model_path.exists() {
            warn!("⚠️ Vosk model not found at {}", self.model_path.display());
            return Ok(false);
        }

        let output = tokio::process::Command::new(&self.executable_path)
            .arg("--help")
            .output()
            .await;

        match output {
            Ok(out) => Ok(out.status.success()),
            Err(_) => Ok(false),
        }
    }

    /// Transcribe a 16 kHz mono WAV file into timestamped segments.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionResult> {
        let start_time = Instant::now();

        info!("🎤 Transcribing: {}", audio_path.display());

        let json_path = audio_path.with_extension("vosk.json");

        let output = tokio::process::Command::new(&self.executable_path)
            .args([
                "--model",
                &self.model_path.to_string_lossy(),
                "--input",
                &audio_path.to_string_lossy(),
                "--output",
                &json_path.to_string_lossy(),
                "--output-type",
                "json",
            ])
            .output()
            .await
            .context("Failed to run vosk-transcriber")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "vosk-transcriber failed for {}: {}",
                audio_path.display(),
                stderr.trim()
            ));
        }

        let raw = tokio::fs::read_to_string(&json_path)
            .await
            .context("Failed to read recognizer output")?;
        let _ = tokio::fs::remove_file(&json_path).await;

        let segments = Self::parse_utterances(&raw)?;
        let full_text = TranscriptionResult::combined_text(&segments);
        let duration = segments.last().map(|s| s.end).unwrap_or(0.0);
        let processing_time = start_time.elapsed().as_secs_f64();

        info!(
            "✅ Transcription complete: {} segments in {:.1}s",
            segments.len(),
            processing_time
        );

        Ok(TranscriptionResult {
            audio_path: audio_path.to_path_buf(),
            segments,
            full_text,
            duration,
            processing_time,
            model: self
                .model_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "vosk".to_string()),
        })
    }

    /// Parse recognizer output.
    ///
    /// Accepts either a JSON array of utterances or one JSON object per
    /// line. Each utterance carries word-level timestamps in `result`;
    /// segment timing is the first word's start and the last word's end.
    /// Utterances with empty text are dropped.
    fn parse_utterances(raw: &str) -> Result<Vec<TranscriptSegment>> {
        let utterances: Vec<VoskUtterance> = match serde_json::from_str(raw) {
            Ok(list) => list,
            Err(_) => raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(serde_json::from_str)
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to parse recognizer JSON output")?,
        };

        let mut segments = Vec::new();
        for utt in utterances {
            let text = utt.text.trim();
            if text.is_empty() {
                continue;
            }
            let start = utt.result.first().map(|w| w.start).unwrap_or(0.0);
            let end = utt.result.last().map(|w| w.end).unwrap_or(start);
            segments.push(TranscriptSegment {
                start,
                end,
                text: text.to_string(),
            });
        }

        Ok(segments)
    }

    /// Save transcript as plain text and timestamped JSON alongside outputs.
    pub async fn save_outputs(&self, result: &TranscriptionResult, output_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(output_dir).await?;

        let stem = result
            .audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "transcript".to_string());

        let txt_path = output_dir.join(format!("{stem}_transcript.txt"));
        tokio::fs::write(&txt_path, &result.full_text).await?;

        let json_path = output_dir.join(format!("{stem}_transcript.json"));
        let json = serde_json::to_string_pretty(result)?;
        tokio::fs::write(&json_path, json).await?;

        info!("💾 Saved transcript outputs to {}", output_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utterance_array() {
        let raw = r#"[
            {"result": [{"start": 0.5, "end": 0.9, "word": "hello", "conf": 1.0},
                        {"start": 1.0, "end": 1.4, "word": "world", "conf": 0.9}],
             "text": "hello world"},
            {"result": [], "text": ""}
        ]"#;

        let segments = VoskTranscriber::parse_utterances(raw).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0.5);
        assert_eq!(segments[0].end, 1.4);
        assert_eq!(segments[0].text, "hello world");
    }

    #[test]
    fn test_parse_utterance_lines() {
        let raw = concat!(
            r#"{"result": [{"start": 0.0, "end": 0.4, "word": "one"}], "text": "one"}"#,
            "\n",
            r#"{"result": [{"start": 2.0, "end": 2.5, "word": "two"}], "text": "two"}"#,
        );

        let segments = VoskTranscriber::parse_utterances(raw).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start, 2.0);
        assert_eq!(segments[1].end, 2.5);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(VoskTranscriber::parse_utterances("not json").is_err());
    }

    #[test]
    fn test_combined_text() {
        let segments = vec![
            TranscriptSegment {
                start: 0.0,
                end: 1.0,
                text: "first part".to_string(),
            },
            TranscriptSegment {
                start: 1.0,
                end: 2.0,
                text: "second part".to_string(),
            },
        ];
        assert_eq!(
            TranscriptionResult::combined_text(&segments),
            "first part second part"
        );
    }
}
