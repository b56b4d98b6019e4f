use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ChatMessage, LLM};

/// One replacement proposed by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextReplacement {
    pub original: String,
    pub replacement: String,
}

/// LLM-assisted cleanup of recognizer and OCR mistakes.
///
/// The model is asked only for `original -> replacement` pairs, never for a
/// rewritten transcript, so a hallucinating model can at worst mangle a few
/// phrases instead of the whole text. Callers keep the rule-cleaned text
/// when this step fails.
pub struct TranscriptRefiner;

impl TranscriptRefiner {
    const PROMPT: &'static str = "You fix speech-recognition and OCR errors in lecture \
        transcripts. Return ONLY lines in the form 'original -> replacement' \
        for phrases that are clearly misrecognized technical terms. Do not \
        return the transcript, commentary, or stylistic edits. If nothing \
        needs fixing, return 'No corrections needed'.";

    /// Ask the model for corrections and apply them.
    pub async fn refine(llm: &dyn LLM, text: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(Self::PROMPT),
            ChatMessage::user(format!(
                "Find misrecognized terms in this lecture transcript:\n\n{}",
                text
            )),
        ];

        let response = llm.chat(messages).await?;
        let replacements = parse_replacements(&response.content);

        if replacements.is_empty() {
            debug!("No transcript corrections suggested");
            return Ok(text.to_string());
        }

        info!("✏️ Applying {} transcript corrections", replacements.len());
        for r in &replacements {
            debug!("Correction: '{}' -> '{}'", r.original, r.replacement);
        }

        Ok(apply_replacements(text, &replacements))
    }
}

/// Parse `original -> replacement` lines, tolerating a few separator
/// spellings.
fn parse_replacements(response: &str) -> Vec<TextReplacement> {
    let mut replacements = Vec::new();

    for line in response.lines() {
        let line = line.trim().trim_matches('`');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        for separator in &[" -> ", " → ", " => "] {
            if let Some(pos) = line.find(separator) {
                let original = line[..pos].trim().trim_matches('"').to_string();
                let replacement = line[pos + separator.len()..]
                    .trim()
                    .trim_matches('"')
                    .to_string();

                if !original.is_empty() && !replacement.is_empty() && original != replacement {
                    replacements.push(TextReplacement {
                        original,
                        replacement,
                    });
                }
                break;
            }
        }
    }

    replacements
}

/// Apply replacements in a single left-to-right scan. At each position the
/// longest matching original wins and the scan resumes after its
/// replacement, so replaced output is never rewritten by another pattern.
fn apply_replacements(text: &str, replacements: &[TextReplacement]) -> String {
    let mut sorted: Vec<&TextReplacement> = replacements.iter().collect();
    sorted.sort_by(|a, b| b.original.len().cmp(&a.original.len()));

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'scan: while !rest.is_empty() {
        for r in &sorted {
            if rest.starts_with(&r.original) {
                out.push_str(&r.replacement);
                rest = &rest[r.original.len()..];
                continue 'scan;
            }
        }

        let step = rest
            .char_indices()
            .nth(1)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        out.push_str(&rest[..step]);
        rest = &rest[step..];
    }

    out
}
