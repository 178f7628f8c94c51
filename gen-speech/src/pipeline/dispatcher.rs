//! Bounded-concurrency synthesis with order-preserving results.

use async_trait::async_trait;
use speech_client::{SpeechError, SpeechProvider, SynthesisOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::text::Chunk;

/// Turns one chunk into an audio fragment on disk.
#[async_trait]
pub trait Synthesize: Send + Sync {
    /// Synthesize the chunk and return the path of the written fragment.
    async fn synthesize(&self, chunk: &Chunk) -> speech_client::Result<PathBuf>;
}

/// A synthesized chunk: its position, fragment path and source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPart {
    pub index: usize,
    pub path: PathBuf,
    pub text: String,
}

/// Completed synthesis requests out of the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Writes each fragment returned by a provider into a working directory.
pub struct ProviderSynthesizer {
    provider: Arc<dyn SpeechProvider>,
    options: SynthesisOptions,
    dir: PathBuf,
}

impl ProviderSynthesizer {
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        options: SynthesisOptions,
        dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            options,
            dir: dir.into(),
        }
    }

    /// Fragment file for a chunk position.
    pub fn fragment_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("part-{:05}.{}", index, self.options.format.extension()))
    }
}

#[async_trait]
impl Synthesize for ProviderSynthesizer {
    async fn synthesize(&self, chunk: &Chunk) -> speech_client::Result<PathBuf> {
        let audio = self.provider.synthesize(&chunk.text, &self.options).await?;
        let path = self.fragment_path(chunk.index);
        tokio::fs::write(&path, &audio)
            .await
            .map_err(SpeechError::Io)?;
        Ok(path)
    }
}

/// Synthesize every chunk with at most `limit` requests in flight.
///
/// Results land in a slot per input position, so the returned parts are in
/// input order whatever order the requests finish in. A new request starts
/// as soon as any in-flight one resolves. The first failure is returned
/// immediately; requests already running are left to finish in the
/// background and their results are dropped. Fragments already written
/// are left on disk.
pub async fn dispatch<F>(
    chunks: Vec<Chunk>,
    limit: usize,
    synthesizer: Arc<dyn Synthesize>,
    mut on_progress: F,
) -> Result<Vec<GeneratedPart>>
where
    F: FnMut(Progress),
{
    let total = chunks.len();
    let limit = limit.max(1);
    let mut slots: Vec<Option<GeneratedPart>> = (0..total).map(|_| None).collect();
    let mut pending = chunks.into_iter().enumerate();
    let mut tasks = JoinSet::new();
    let mut completed = 0;

    log::debug!("dispatching {} chunk(s), {} at a time", total, limit);

    loop {
        while tasks.len() < limit {
            let Some((slot, chunk)) = pending.next() else {
                break;
            };
            let synthesizer = Arc::clone(&synthesizer);
            log::debug!("chunk {} started", chunk.index);
            tasks.spawn(async move {
                let result = synthesizer.synthesize(&chunk).await;
                (slot, chunk, result)
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };

        let (slot, chunk, result) = match joined {
            Ok(output) => output,
            Err(e) => {
                tasks.detach_all();
                return Err(Error::Task(e));
            }
        };

        match result {
            Ok(path) => {
                log::debug!("chunk {} finished: {}", chunk.index, path.display());
                slots[slot] = Some(GeneratedPart {
                    index: chunk.index,
                    path,
                    text: chunk.text,
                });
                completed += 1;
                on_progress(Progress { completed, total });
            }
            Err(source) => {
                log::warn!("chunk {} failed: {}", chunk.index, source);
                tasks.detach_all();
                return Err(Error::Synthesis {
                    index: chunk.index,
                    source,
                });
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
