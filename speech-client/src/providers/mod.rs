//! Speech provider implementations

mod google;
pub mod mock;
mod polly_cli;

pub use google::{GOOGLE_MAX_BYTES, GOOGLE_MAX_CHARACTERS, GoogleProvider};
pub use mock::MockProvider;
pub use polly_cli::{POLLY_MAX_CHARACTERS, PollyCliProvider};

use crate::config::ProviderConfig;
use crate::error::{Result, SpeechError};
use crate::provider::{AudioFormat, SpeechProvider};

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Aws,
    Gcp,
}

impl ProviderKind {
    /// Parse provider kind from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "aws" | "polly" => Ok(Self::Aws),
            "gcp" | "google" => Ok(Self::Gcp),
            _ => Err(SpeechError::ConfigError(format!("Unknown provider: {}", s))),
        }
    }

    /// Name used as the key in the providers config table
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }

    /// Human-readable provider name for messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Aws => "AWS Polly",
            Self::Gcp => "Google Cloud",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Self::Aws => None,
            Self::Gcp => Some("GOOGLE_API_KEY"),
        }
    }
}

/// Create a provider instance and check it can produce the requested format.
///
/// Format problems surface here, before any text is split or sent.
pub fn get_provider(
    kind: ProviderKind,
    format: AudioFormat,
    provider_config: Option<&ProviderConfig>,
) -> Result<Box<dyn SpeechProvider>> {
    let provider: Box<dyn SpeechProvider> = match kind {
        ProviderKind::Aws => {
            let cli_path = provider_config.and_then(|c| c.cli_path.clone());
            let region = provider_config.and_then(|c| c.region.clone());
            Box::new(PollyCliProvider::new(cli_path, region)?)
        }
        ProviderKind::Gcp => {
            let api_key = get_api_key(kind, provider_config)?;
            let base_url = provider_config.and_then(|c| c.base_url.clone());
            Box::new(GoogleProvider::new(api_key, base_url)?)
        }
    };

    provider.encoding(format)?;
    provider.is_available()?;
    Ok(provider)
}

/// Get API key from config or the provider's environment variable
fn get_api_key(kind: ProviderKind, config: Option<&ProviderConfig>) -> Result<String> {
    if let Some(key) = config.and_then(|c| c.api_key.clone()) {
        return Ok(key);
    }

    let env_var = kind.env_var().ok_or_else(|| {
        SpeechError::ConfigError(format!("{} does not use an API key", kind.display_name()))
    })?;
    std::env::var(env_var).map_err(|_| SpeechError::MissingApiKey {
        provider: kind.display_name().to_string(),
        env_var: env_var.to_string(),
    })
}
