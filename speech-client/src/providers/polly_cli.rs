//! AWS Polly provider
//!
//! Uses the installed AWS CLI as a subprocess, so credentials and profiles
//! come from the CLI's own configuration.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use crate::error::{Result, SpeechError};
use crate::provider::{AudioFormat, SpeechProvider, SynthesisOptions};

/// Polly rejects requests longer than this many billed characters.
pub const POLLY_MAX_CHARACTERS: usize = 1500;

const DEFAULT_VOICE: &str = "Joanna";

/// Provider that calls `aws polly synthesize-speech`
pub struct PollyCliProvider {
    cli_path: PathBuf,
    region: Option<String>,
}

impl PollyCliProvider {
    /// Create a new Polly provider
    ///
    /// Returns an error if the AWS CLI is not found.
    pub fn new(cli_path: Option<PathBuf>, region: Option<String>) -> Result<Self> {
        let cli_path = match cli_path {
            Some(path) => {
                if !path.exists() {
                    return Err(SpeechError::ProviderUnavailable(format!(
                        "AWS CLI not found at specified path: {}",
                        path.display()
                    )));
                }
                path
            }
            None => which::which("aws").map_err(|_| {
                SpeechError::ProviderUnavailable(
                    "AWS CLI not found. Install from https://aws.amazon.com/cli/".into(),
                )
            })?,
        };

        Ok(Self { cli_path, region })
    }

    /// Arguments for one request, excluding the trailing output file.
    fn request_args(&self, text: &str, options: &SynthesisOptions) -> Result<Vec<String>> {
        let mut args = vec![
            "polly".to_string(),
            "synthesize-speech".to_string(),
            "--output-format".to_string(),
            self.encoding(options.format)?.to_string(),
            "--voice-id".to_string(),
            options.voice.clone().unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            "--text-type".to_string(),
            options.input_type.to_string(),
        ];

        if let Some(engine) = &options.engine {
            args.extend(["--engine".to_string(), engine.clone()]);
        }
        if let Some(language) = &options.language {
            args.extend(["--language-code".to_string(), language.clone()]);
        }
        if let Some(rate) = options.sample_rate {
            args.extend(["--sample-rate".to_string(), rate.to_string()]);
        }
        if !options.lexicons.is_empty() {
            args.push("--lexicon-names".to_string());
            args.extend(options.lexicons.iter().cloned());
        }
        if let Some(region) = &self.region {
            args.extend(["--region".to_string(), region.clone()]);
        }

        args.extend(["--text".to_string(), text.to_string()]);
        Ok(args)
    }
}

#[async_trait]
impl SpeechProvider for PollyCliProvider {
    async fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<Vec<u8>> {
        let args = self.request_args(text, options)?;

        // The CLI only writes audio to a file
        let out = tempfile::Builder::new()
            .prefix("polly-")
            .suffix(&format!(".{}", options.format.extension()))
            .tempfile()?;

        let output = Command::new(&self.cli_path)
            .args(&args)
            .arg(out.path())
            .output()
            .await
            .map_err(|e| SpeechError::CliError(format!("Failed to execute: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::CliError(format!(
                "Command failed: {}",
                stderr.trim()
            )));
        }

        let audio = tokio::fs::read(out.path()).await?;
        log::trace!("polly returned {} bytes", audio.len());
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "AWS Polly"
    }

    fn max_characters(&self) -> usize {
        POLLY_MAX_CHARACTERS
    }

    fn encoding(&self, format: AudioFormat) -> Result<&'static str> {
        Ok(match format {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg_vorbis",
            AudioFormat::Pcm => "pcm",
        })
    }

    fn is_available(&self) -> Result<()> {
        // Availability was checked in constructor
        Ok(())
    }
}
