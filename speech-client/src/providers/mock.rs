//! Mock speech provider for testing
//!
//! Echoes the request text back as audio bytes, with optional per-text
//! delays and failures so callers can exercise ordering and fail-fast paths.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Result, SpeechError};
use crate::provider::{AudioFormat, SpeechProvider, SynthesisOptions};

/// A mock provider for pipeline tests
pub struct MockProvider {
    /// Artificial latency keyed by request text
    delays: HashMap<String, Duration>,
    /// Request texts that fail
    failures: HashSet<String>,
    /// Texts in the order requests were issued
    requests: Mutex<Vec<String>>,
    call_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    max_characters: usize,
}

impl MockProvider {
    /// Create a provider that echoes every request immediately
    pub fn new() -> Self {
        Self {
            delays: HashMap::new(),
            failures: HashSet::new(),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            max_characters: 1500,
        }
    }

    /// Delay the response for a given request text
    pub fn with_delay(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    /// Fail any request with the given text
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failures.insert(text.to_string());
        self
    }

    /// Override the per-request character limit
    pub fn with_max_characters(mut self, max: usize) -> Self {
        self.max_characters = max;
        self
    }

    /// Get the number of times synthesize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously unresolved requests seen
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Request texts in the order they were issued
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechProvider for MockProvider {
    async fn synthesize(&self, text: &str, _options: &SynthesisOptions) -> Result<Vec<u8>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(text.to_string());
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(text) {
            tokio::time::sleep(*delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failures.contains(text) {
            return Err(SpeechError::ApiError {
                message: format!("mock failure for '{}'", text),
                status_code: Some(500),
            });
        }

        Ok(text.as_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn max_characters(&self) -> usize {
        self.max_characters
    }

    fn encoding(&self, format: AudioFormat) -> Result<&'static str> {
        Ok(format.extension())
    }

    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}
