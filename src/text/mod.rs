pub mod chunker;
pub mod cleaner;

pub use chunker::{chunk_sentences, split_sentences};
pub use cleaner::TextCleaner;
