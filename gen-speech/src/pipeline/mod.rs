//! End-to-end run: segment, synthesize, write the manifest, assemble, clean up.

pub mod dispatcher;

pub use dispatcher::{GeneratedPart, Progress, ProviderSynthesizer, Synthesize, dispatch};

use speech_client::{SpeechProvider, SynthesisOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::{Assembler, AssemblyMode, MANIFEST_FILE_NAME, Manifest};
use crate::error::{Error, Result};
use crate::text::segment;

/// Default number of synthesis requests in flight.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Lifecycle notifications emitted during a run, in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Input was segmented into this many chunks
    Split { chunks: usize },
    /// Another synthesis request completed
    Synthesized(Progress),
    ManifestWritten { path: PathBuf },
    Assembled { path: PathBuf },
    /// Fragments and manifest were removed
    Cleaned,
}

/// Text-to-audio pipeline bound to one provider and one set of options.
pub struct Pipeline {
    provider: Arc<dyn SpeechProvider>,
    options: SynthesisOptions,
    max_chars: usize,
    concurrency: usize,
    assembler: Assembler,
}

impl Pipeline {
    /// Create a pipeline using the provider's own request limit.
    pub fn new(provider: Arc<dyn SpeechProvider>, options: SynthesisOptions) -> Self {
        let max_chars = provider.max_characters();
        Self {
            provider,
            options,
            max_chars,
            concurrency: DEFAULT_CONCURRENCY,
            assembler: Assembler::default(),
        }
    }

    /// Override the per-request text limit.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_assembler(mut self, assembler: Assembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Convert `input` into a single audio file at `output`.
    ///
    /// Fragments are written to a temporary working directory that is
    /// removed when the run ends, whether it succeeds or not.
    pub async fn run<F>(&self, input: &str, output: &Path, mut observer: F) -> Result<PathBuf>
    where
        F: FnMut(PipelineEvent),
    {
        let chunks = segment(input, self.options.input_type, self.max_chars)?;
        if chunks.is_empty() {
            return Err(Error::EmptyInput);
        }
        log::info!(
            "split input into {} chunk(s) of at most {} characters",
            chunks.len(),
            self.max_chars
        );
        observer(PipelineEvent::Split {
            chunks: chunks.len(),
        });

        let work_dir = tempfile::Builder::new().prefix("gen-speech-").tempdir()?;
        log::debug!("working directory: {}", work_dir.path().display());

        let synthesizer = Arc::new(ProviderSynthesizer::new(
            Arc::clone(&self.provider),
            self.options.clone(),
            work_dir.path(),
        ));
        let parts = dispatch(chunks, self.concurrency, synthesizer, |progress| {
            observer(PipelineEvent::Synthesized(progress))
        })
        .await?;

        let manifest = Manifest::build(&parts, &work_dir.path().join(MANIFEST_FILE_NAME)).await?;
        observer(PipelineEvent::ManifestWritten {
            path: manifest.path().to_path_buf(),
        });

        let result = self
            .assembler
            .assemble(&manifest, output, AssemblyMode::for_format(self.options.format))
            .await;

        manifest.cleanup().await?;
        let path = result?;
        observer(PipelineEvent::Assembled { path: path.clone() });
        observer(PipelineEvent::Cleaned);

        Ok(path)
    }
}
