//! gen-speech tool defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use speech_client::{AudioFormat, InputType};
use std::fs;
use std::path::PathBuf;

use crate::pipeline::DEFAULT_CONCURRENCY;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenSpeechConfig {
    /// Provider name (aws, gcp). None falls back to providers.toml.
    #[serde(default)]
    pub provider: Option<String>,

    /// Output format (mp3, ogg, pcm)
    #[serde(default)]
    pub format: AudioFormat,

    /// How input is read (text, ssml)
    #[serde(default)]
    pub input_type: InputType,

    /// Voice name or id. None means the provider default.
    #[serde(default)]
    pub voice: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    /// Polly engine (standard, neural, long-form, generative)
    #[serde(default)]
    pub engine: Option<String>,

    /// Synthesis requests in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Override of the provider's per-request character limit
    #[serde(default)]
    pub max_chars: Option<usize>,

    /// FFmpeg program used for encoded output
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Default for GenSpeechConfig {
    fn default() -> Self {
        Self {
            provider: None,
            format: AudioFormat::default(),
            input_type: InputType::default(),
            voice: None,
            language: None,
            engine: None,
            concurrency: default_concurrency(),
            max_chars: None,
            ffmpeg: default_ffmpeg(),
        }
    }
}

impl GenSpeechConfig {
    /// Get the config file path: ~/.config/gen-speech/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("gen-speech")
            .join("config.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: GenSpeechConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}
