//! Text segmentation: sentence splitting, bounded packing and SSML chunking.

pub mod chunker;
pub mod markup;
pub mod sentences;

pub use chunker::chunk_text;
pub use markup::chunk_markup;
pub use sentences::{Sentences, split_sentences};

use crate::error::Result;
use speech_client::InputType;

/// A chunk of text (or a well-formed SSML fragment) ready for synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the original document
    pub index: usize,
    /// The text content
    pub text: String,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Split input into indexed chunks, choosing the chunker by input type.
pub fn segment(input: &str, input_type: InputType, max_length: usize) -> Result<Vec<Chunk>> {
    let pieces = match input_type {
        InputType::Text => chunk_text(input, max_length)?,
        InputType::Ssml => chunk_markup(input, max_length)?,
    };

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk::new(index, text))
        .collect())
}
