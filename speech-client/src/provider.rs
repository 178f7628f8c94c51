use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SpeechError};

/// Output audio format requested from a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Ogg,
    Pcm,
}

impl AudioFormat {
    /// File extension used for fragments and the final output
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Pcm => "pcm",
        }
    }

    /// Whether the format is headerless sample data.
    ///
    /// Raw formats have no container framing, so fragments are joined by
    /// appending bytes rather than by a stream-copy muxer.
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Pcm)
    }
}

impl FromStr for AudioFormat {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "ogg" => Ok(Self::Ogg),
            "pcm" => Ok(Self::Pcm),
            _ => Err(SpeechError::UnsupportedFormat {
                format: s.to_string(),
                provider: None,
            }),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Whether the input is plain text or SSML markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Ssml,
}

impl FromStr for InputType {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "ssml" => Ok(Self::Ssml),
            _ => Err(SpeechError::ConfigError(format!("Unknown input type: {}", s))),
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Ssml => f.write_str("ssml"),
        }
    }
}

/// Options sent with every synthesis request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisOptions {
    pub format: AudioFormat,
    pub input_type: InputType,
    /// Provider voice id or name
    pub voice: Option<String>,
    /// BCP-47 language code
    pub language: Option<String>,
    /// Preferred voice gender (GCP)
    pub gender: Option<String>,
    /// Synthesis engine, e.g. "standard" or "neural" (AWS)
    pub engine: Option<String>,
    /// Speaking rate multiplier (GCP, 0.25-4.0)
    pub speed: Option<f32>,
    /// Pitch in semitones (GCP, -20.0-20.0)
    pub pitch: Option<f32>,
    pub sample_rate: Option<u32>,
    /// Volume gain in dB (GCP, -96.0-16.0)
    pub gain: Option<f32>,
    /// Audio effects profile ids (GCP)
    pub effects: Vec<String>,
    /// Pronunciation lexicon names (AWS)
    pub lexicons: Vec<String>,
}

impl SynthesisOptions {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn with_input_type(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed.clamp(0.25, 4.0));
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch.clamp(-20.0, 20.0));
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = Some(gain.clamp(-96.0, 16.0));
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }
}

/// Trait for speech synthesis providers
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize one bounded-length request and return the encoded audio bytes
    async fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<Vec<u8>>;

    /// Get the provider name for display
    fn name(&self) -> &'static str;

    /// Maximum number of characters accepted in a single request
    fn max_characters(&self) -> usize;

    /// Provider-specific encoding name for an output format
    fn encoding(&self, format: AudioFormat) -> Result<&'static str>;

    /// Check if the provider is available (API key set, CLI installed, etc.)
    fn is_available(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!("mp3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("OGG".parse::<AudioFormat>().unwrap(), AudioFormat::Ogg);
        assert_eq!("pcm".parse::<AudioFormat>().unwrap(), AudioFormat::Pcm);
    }

    #[test]
    fn test_unsupported_format() {
        let err = "flac".parse::<AudioFormat>().unwrap_err();
        assert!(matches!(err, SpeechError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("flac"));
    }

    #[test]
    fn test_only_pcm_is_raw() {
        assert!(AudioFormat::Pcm.is_raw());
        assert!(!AudioFormat::Mp3.is_raw());
        assert!(!AudioFormat::Ogg.is_raw());
    }

    #[test]
    fn test_options_clamping() {
        let opts = SynthesisOptions::new(AudioFormat::Mp3)
            .with_speed(10.0)
            .with_pitch(-50.0)
            .with_gain(30.0);

        assert_eq!(opts.speed, Some(4.0));
        assert_eq!(opts.pitch, Some(-20.0));
        assert_eq!(opts.gain, Some(16.0));
    }

    #[test]
    fn test_input_type_parse() {
        assert_eq!("ssml".parse::<InputType>().unwrap(), InputType::Ssml);
        assert_eq!("Text".parse::<InputType>().unwrap(), InputType::Text);
        assert!("html".parse::<InputType>().is_err());
    }
}
