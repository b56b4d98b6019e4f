use anyhow::Result;
use regex::Regex;
use tracing::debug;

use crate::slides::SlideRecord;
use crate::transcription::TranscriptSegment;

/// Rule-based transcript and slide-text cleanup.
///
/// All patterns are compiled once at construction; cleaning itself is pure
/// string work and never fails, so the methods return plain strings.
pub struct TextCleaner {
    bracket_timestamp: Regex,
    paren_timestamp: Regex,
    seconds_marker: Regex,
    ruler: Regex,
    filler: Regex,
    stray_symbols: Regex,
    hyphen_break: Regex,
    whitespace: Regex,
    sentence_end: Regex,
}

impl TextCleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // [00:12:34] or [12:34]
            bracket_timestamp: Regex::new(r"\[\d{1,2}:\d{2}(:\d{2})?\]")?,
            // (12:34) or (1:02:03)
            paren_timestamp: Regex::new(r"\(\d{1,2}:\d{2}(:\d{2})?\)")?,
            // bare second markers like 12.3s or 45s
            seconds_marker: Regex::new(r"\b\d+(\.\d+)?s\b")?,
            ruler: Regex::new(r"[-=_*]{3,}")?,
            filler: Regex::new(r"(?i)\b(um+|uh+|erm+|hmm+|you know|i mean)\b")?,
            stray_symbols: Regex::new(r"[|•¤§~`^]+")?,
            hyphen_break: Regex::new(r"-\s*\n\s*")?,
            whitespace: Regex::new(r"\s+")?,
            sentence_end: Regex::new(r"([.!?])\s+")?,
        })
    }

    /// Full cleanup pipeline for raw transcript or OCR text.
    pub fn clean_text(&self, text: &str) -> String {
        let mut out = self.hyphen_break.replace_all(text, "").into_owned();
        out = self.bracket_timestamp.replace_all(&out, " ").into_owned();
        out = self.paren_timestamp.replace_all(&out, " ").into_owned();
        out = self.seconds_marker.replace_all(&out, " ").into_owned();
        out = self.ruler.replace_all(&out, " ").into_owned();
        out = self.filler.replace_all(&out, " ").into_owned();
        out = self.stray_symbols.replace_all(&out, " ").into_owned();
        out = collapse_repeated_chars(&out, 3);
        out = self.whitespace.replace_all(&out, " ").trim().to_string();
        self.capitalize_sentences(&out)
    }

    /// Split on sentence terminators and upper-case each sentence start.
    fn capitalize_sentences(&self, text: &str) -> String {
        let marked = self.sentence_end.replace_all(text, "${1}\u{1}");
        marked
            .split('\u{1}')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(capitalize_first)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Concatenate slide text and voice text, dropping duplicate lines.
    pub fn merge_texts(&self, slide_text: &str, voice_text: &str) -> String {
        let mut seen = std::collections::HashSet::new();
        let mut lines = Vec::new();

        for line in slide_text.lines().chain(voice_text.lines()) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_lowercase()) {
                lines.push(trimmed.to_string());
            }
        }

        lines.join("\n")
    }

    /// Interleave slide records with voice segments by timestamp.
    ///
    /// A slide is attached to the first voice segment whose start lies
    /// within `max_gap` seconds of the slide's timestamp; slides with no
    /// segment that close become standalone lines in timestamp order so no
    /// extracted text is lost.
    pub fn merge_by_timestamps(
        &self,
        slides: &[SlideRecord],
        segments: &[TranscriptSegment],
        max_gap: f64,
    ) -> String {
        let mut lines = Vec::new();
        let mut slide_iter = slides.iter().peekable();

        for segment in segments {
            // Slides already too far behind this segment can never attach
            // to it or a later one; emit them standalone, in order.
            while let Some(slide) = slide_iter.peek() {
                if slide.time >= segment.start - max_gap {
                    break;
                }
                if let Some(slide) = slide_iter.next() {
                    lines.push(format!("[{:.2}s] {}", slide.time, slide.text));
                }
            }

            let mut attached = Vec::new();
            while let Some(slide) = slide_iter.peek() {
                if (slide.time - segment.start).abs() > max_gap {
                    break;
                }
                if let Some(slide) = slide_iter.next() {
                    attached.push(slide.text.clone());
                }
            }

            if attached.is_empty() {
                lines.push(format!(
                    "[{:.2}-{:.2}s] {}",
                    segment.start, segment.end, segment.text
                ));
            } else {
                lines.push(format!(
                    "[{:.2}-{:.2}s] {} {}",
                    segment.start,
                    segment.end,
                    attached.join(" "),
                    segment.text
                ));
            }
        }

        // Trailing slides after the last voice segment
        for slide in slide_iter {
            lines.push(format!("[{:.2}s] {}", slide.time, slide.text));
        }

        debug!("🔗 Merged {} slides into {} segments", slides.len(), segments.len());
        lines.join("\n")
    }

    /// Lighter-weight scrub used before summarization: drop timestamps and
    /// boilerplate lines, de-duplicate, keep sentence structure intact.
    pub fn preprocess_transcript(&self, text: &str) -> String {
        let mut seen = std::collections::HashSet::new();
        let mut lines = Vec::new();

        for line in text.lines() {
            let mut cleaned = self.bracket_timestamp.replace_all(line, " ").into_owned();
            cleaned = self.paren_timestamp.replace_all(&cleaned, " ").into_owned();
            cleaned = self.ruler.replace_all(&cleaned, " ").into_owned();
            let cleaned = self.whitespace.replace_all(&cleaned, " ").trim().to_string();

            if cleaned.len() < 3 {
                continue;
            }
            if seen.insert(cleaned.to_lowercase()) {
                lines.push(cleaned);
            }
        }

        lines.join(" ")
    }
}

/// Collapse runs of the same character longer than `max_run`.
///
/// The `regex` crate has no backreferences, so this is done by hand.
fn collapse_repeated_chars(text: &str, max_run: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last: Option<char> = None;
    let mut run = 0usize;

    for c in text.chars() {
        if Some(c) == last {
            run += 1;
        } else {
            last = Some(c);
            run = 1;
        }
        if run <= max_run {
            out.push(c);
        }
    }

    out
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> TextCleaner {
        TextCleaner::new().unwrap()
    }

    #[test]
    fn test_strips_timestamps_and_rulers() {
        let c = cleaner();
        let out = c.clean_text("[00:01:30] intro ---- (2:15) next 12.3s point");
        assert!(!out.contains("00:01:30"));
        assert!(!out.contains("----"));
        assert!(!out.contains("2:15"));
        assert!(!out.contains("12.3s"));
        assert!(out.to_lowercase().contains("intro"));
        assert!(out.contains("next"));
    }

    #[test]
    fn test_removes_filler_words() {
        let c = cleaner();
        let out = c.clean_text("so um this is uh the main point you know");
        assert!(!out.to_lowercase().contains(" um "));
        assert!(!out.to_lowercase().contains(" uh "));
        assert!(out.contains("main point"));
    }

    #[test]
    fn test_collapse_repeated_chars() {
        assert_eq!(collapse_repeated_chars("heyyyyy!!!!!", 3), "heyyy!!!");
        assert_eq!(collapse_repeated_chars("normal", 3), "normal");
    }

    #[test]
    fn test_hyphen_line_break_joined() {
        let c = cleaner();
        let out = c.clean_text("intro-\nduction to systems");
        assert!(out.to_lowercase().contains("introduction"));
    }

    #[test]
    fn test_sentence_capitalization() {
        let c = cleaner();
        let out = c.clean_text("first sentence. second one here. third");
        assert!(out.starts_with("First sentence."));
        assert!(out.contains("Second one here."));
        assert!(out.contains("Third"));
    }

    #[test]
    fn test_merge_texts_dedupes_lines() {
        let c = cleaner();
        let merged = c.merge_texts("Agenda\nIntro slide", "agenda\nspoken notes");
        let lines: Vec<&str> = merged.lines().collect();
        assert_eq!(lines, vec!["Agenda", "Intro slide", "spoken notes"]);
    }

    #[test]
    fn test_merge_by_timestamps_attaches_nearby_slide() {
        let c = cleaner();
        let slides = vec![SlideRecord {
            time: 4.5,
            text: "Slide: Graphs".to_string(),
        }];
        let segments = vec![
            TranscriptSegment {
                start: 0.0,
                end: 3.0,
                text: "welcome".to_string(),
            },
            TranscriptSegment {
                start: 5.0,
                end: 9.0,
                text: "graphs are everywhere".to_string(),
            },
        ];

        let merged = c.merge_by_timestamps(&slides, &segments, 2.0);
        let lines: Vec<&str> = merged.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[0.00-3.00s] welcome"));
        assert!(lines[1].contains("Slide: Graphs"));
        assert!(lines[1].contains("graphs are everywhere"));
    }

    #[test]
    fn test_merge_by_timestamps_orphan_slide_stays_standalone() {
        let c = cleaner();
        let slides = vec![SlideRecord {
            time: 10.0,
            text: "Orphan slide".to_string(),
        }];
        let segments = vec![
            TranscriptSegment {
                start: 0.0,
                end: 3.0,
                text: "early speech".to_string(),
            },
            TranscriptSegment {
                start: 49.0,
                end: 55.0,
                text: "much later speech".to_string(),
            },
        ];

        // No segment starts within 2s of t=10, so the slide must not glue
        // onto the 49s segment.
        let merged = c.merge_by_timestamps(&slides, &segments, 2.0);
        let lines: Vec<&str> = merged.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[0.00-3.00s] early speech",
                "[10.00s] Orphan slide",
                "[49.00-55.00s] much later speech",
            ]
        );
    }

    #[test]
    fn test_merge_by_timestamps_keeps_trailing_slides() {
        let c = cleaner();
        let slides = vec![SlideRecord {
            time: 100.0,
            text: "Closing slide".to_string(),
        }];
        let segments = vec![TranscriptSegment {
            start: 0.0,
            end: 5.0,
            text: "hello".to_string(),
        }];

        let merged = c.merge_by_timestamps(&slides, &segments, 2.0);
        assert!(merged.contains("[100.00s] Closing slide"));
    }

    #[test]
    fn test_preprocess_transcript_dedupes() {
        let c = cleaner();
        let out = c.preprocess_transcript("[00:01] hello there\nhello there\nnew material");
        assert_eq!(out.matches("hello there").count(), 1);
        assert!(out.contains("new material"));
    }
}
