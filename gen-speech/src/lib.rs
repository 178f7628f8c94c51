//! gen-speech: turn long text or SSML into a single audio file using
//! length-limited text-to-speech providers.

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod text;

pub use config::GenSpeechConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineEvent, Progress};
pub use text::{Chunk, segment};
