//! Pipeline error taxonomy.

use speech_client::SpeechError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed markup at byte {offset}: {message}")]
    Markup { message: String, offset: usize },

    #[error("Sentence detection failed: {message}")]
    SentenceDetection { message: String },

    #[error("Text packing did not terminate within {limit} steps")]
    PackingInvariant { limit: usize },

    #[error("No text to synthesize")]
    EmptyInput,

    #[error("Synthesis failed for chunk {index}: {source}")]
    Synthesis {
        index: usize,
        #[source]
        source: SpeechError,
    },

    #[error("Synthesis task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Fragment path cannot be written to a manifest: {}", .path.display())]
    UnsafeManifestPath { path: PathBuf },

    #[error("Malformed manifest line {line}: {content}")]
    ManifestLine { line: usize, content: String },

    #[error("Could not start process {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with {}: {}", .code.map(|c| format!("exit code {}", c)).unwrap_or_else(|| "no exit code".to_string()), .stderr.trim())]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} reported success but produced no output at {}", .path.display())]
    NoOutput { program: String, path: PathBuf },

    #[error(transparent)]
    Provider(#[from] SpeechError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_message_includes_code_and_stderr() {
        let err = Error::Exit {
            program: "ffmpeg".to_string(),
            code: Some(1),
            stderr: "manifest.txt: Invalid data found\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Invalid data found"));
    }

    #[test]
    fn test_spawn_message_is_distinct() {
        let err = Error::Spawn {
            program: "ffmpeg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().starts_with("Could not start process"));
    }
}
