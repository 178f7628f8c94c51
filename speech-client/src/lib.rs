//! Speech synthesis client library for the gen-speech workspace
//!
//! Provides a unified interface over bounded-length synthesis providers:
//! - AWS Polly (via the AWS CLI)
//! - Google Cloud Text-to-Speech (REST)
//! - Mock (tests)

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::{Config, ProviderConfig};
pub use error::{Result, SpeechError};
pub use provider::{AudioFormat, InputType, SpeechProvider, SynthesisOptions};
pub use providers::{MockProvider, ProviderKind, get_provider};
