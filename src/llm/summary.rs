use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ChatMessage, LLM};
use crate::text::{chunk_sentences, split_sentences, TextCleaner};

/// Summarization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Character budget per LLM chunk
    pub chunk_chars: usize,
    /// Video length (minutes) below which the summary gets two paragraphs
    pub short_video_minutes: f64,
    /// Video length below which it gets three paragraphs
    pub medium_video_minutes: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 2000,
            short_video_minutes: 8.0,
            medium_video_minutes: 15.0,
        }
    }
}

/// A structured lecture summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub paragraphs: Vec<String>,
    pub chunk_count: usize,
    pub failed_chunks: usize,
}

impl Summary {
    pub fn full_text(&self) -> String {
        self.paragraphs.join("\n\n")
    }
}

/// Chunked LLM summarization of lecture transcripts.
pub struct Summarizer {
    config: SummaryConfig,
}

impl Summarizer {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    /// Summarize a transcript, structuring the result into a paragraph count
    /// proportional to the video length.
    ///
    /// Individual chunk failures are logged and skipped; the call fails only
    /// when every chunk fails or the transcript is empty.
    pub async fn summarize(
        &self,
        llm: &dyn LLM,
        cleaner: &TextCleaner,
        transcript: &str,
        duration_minutes: f64,
    ) -> Result<Summary> {
        let prepared = cleaner.preprocess_transcript(transcript);
        if prepared.trim().is_empty() {
            return Err(anyhow!("Nothing to summarize: transcript is empty"));
        }

        let sentences = split_sentences(&prepared);
        let chunks = chunk_sentences(&sentences, self.config.chunk_chars);
        let chunk_count = chunks.len();

        info!("📝 Summarizing transcript in {} chunks", chunk_count);

        let mut partials = Vec::new();
        let mut failed_chunks = 0usize;

        for (i, chunk) in chunks.iter().enumerate() {
            match self.summarize_chunk(llm, chunk).await {
                Ok(text) => partials.push(text),
                Err(e) => {
                    // Skip-and-log policy: a bad chunk must not sink the run.
                    warn!("⚠️ Summary chunk {}/{} failed: {}", i + 1, chunk_count, e);
                    failed_chunks += 1;
                }
            }
        }

        if partials.is_empty() {
            return Err(anyhow!("All {} summary chunks failed", chunk_count));
        }

        let merged = partials.join(" ");
        let paragraphs = self.structure_paragraphs(&merged, duration_minutes);

        info!(
            "✅ Summary ready: {} paragraphs ({} of {} chunks ok)",
            paragraphs.len(),
            chunk_count - failed_chunks,
            chunk_count
        );

        Ok(Summary {
            paragraphs,
            chunk_count,
            failed_chunks,
        })
    }

    async fn summarize_chunk(&self, llm: &dyn LLM, chunk: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(
                "You summarize lecture transcripts. Write a concise factual \
                 summary of the passage in plain prose. Do not add headings, \
                 lists, or commentary.",
            ),
            ChatMessage::user(chunk.to_string()),
        ];

        let response = llm.chat(messages).await?;
        let text = response.content.trim().to_string();
        if text.is_empty() {
            return Err(anyhow!("LLM returned an empty summary"));
        }
        Ok(text)
    }

    /// Distribute summary sentences across a paragraph count driven by the
    /// video length: under 8 minutes two paragraphs, under 15 three, else
    /// four.
    fn structure_paragraphs(&self, merged: &str, duration_minutes: f64) -> Vec<String> {
        let target = if duration_minutes < self.config.short_video_minutes {
            2
        } else if duration_minutes < self.config.medium_video_minutes {
            3
        } else {
            4
        };

        let sentences = split_sentences(merged);
        if sentences.is_empty() {
            return vec![merged.trim().to_string()];
        }
        let target = target.min(sentences.len());

        let per_paragraph = sentences.len().div_ceil(target);
        sentences
            .chunks(per_paragraph)
            .map(|group| group.join(" "))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMProvider, LLMResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedLlm {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl LLM for ScriptedLlm {
        async fn chat(&self, _messages: Vec<ChatMessage>) -> Result<LLMResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(n) == self.fail_on {
                return Err(anyhow!("connection refused"));
            }
            Ok(LLMResponse {
                content: format!("Summary part {}.", n + 1),
                tokens_used: None,
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn provider_type(&self) -> LLMProvider {
            LLMProvider::LMStudio
        }
    }

    fn long_transcript() -> String {
        (0..80)
            .map(|i| format!("This is lecture sentence number {} about systems.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[tokio::test]
    async fn test_summarize_multiple_chunks() {
        let summarizer = Summarizer::new(SummaryConfig {
            chunk_chars: 500,
            ..Default::default()
        });
        let llm = ScriptedLlm {
            calls: AtomicUsize::new(0),
            fail_on: None,
        };
        let cleaner = TextCleaner::new().unwrap();

        let summary = summarizer
            .summarize(&llm, &cleaner, &long_transcript(), 20.0)
            .await
            .unwrap();

        assert!(summary.chunk_count > 1);
        assert_eq!(summary.failed_chunks, 0);
        assert_eq!(summary.paragraphs.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped() {
        let summarizer = Summarizer::new(SummaryConfig {
            chunk_chars: 500,
            ..Default::default()
        });
        let llm = ScriptedLlm {
            calls: AtomicUsize::new(0),
            fail_on: Some(0),
        };
        let cleaner = TextCleaner::new().unwrap();

        let summary = summarizer
            .summarize(&llm, &cleaner, &long_transcript(), 5.0)
            .await
            .unwrap();

        assert_eq!(summary.failed_chunks, 1);
        assert!(!summary.full_text().is_empty());
    }

    #[tokio::test]
    async fn test_empty_transcript_errors() {
        let summarizer = Summarizer::new(SummaryConfig::default());
        let llm = ScriptedLlm {
            calls: AtomicUsize::new(0),
            fail_on: None,
        };
        let cleaner = TextCleaner::new().unwrap();

        assert!(summarizer
            .summarize(&llm, &cleaner, "   ", 5.0)
            .await
            .is_err());
    }

    #[test]
    fn test_paragraph_count_by_duration() {
        let summarizer = Summarizer::new(SummaryConfig::default());
        let text = (0..12)
            .map(|i| format!("Sentence {}.", i))
            .collect::<Vec<_>>()
            .join(" ");

        assert_eq!(summarizer.structure_paragraphs(&text, 5.0).len(), 2);
        assert_eq!(summarizer.structure_paragraphs(&text, 10.0).len(), 3);
        assert_eq!(summarizer.structure_paragraphs(&text, 30.0).len(), 4);
    }
}
