pub mod vosk;

pub use vosk::{TranscriptSegment, TranscriptionResult, VoskTranscriber};
