//! Google Cloud Text-to-Speech provider
//!
//! Direct HTTP implementation for the `text:synthesize` REST endpoint.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpeechError};
use crate::provider::{AudioFormat, InputType, SpeechProvider, SynthesisOptions};

const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Default chunk length in characters.
///
/// Google measures its own limit in bytes, so text with multi-byte
/// characters may need a lower `max_chars` to stay under [`GOOGLE_MAX_BYTES`].
pub const GOOGLE_MAX_CHARACTERS: usize = 5000;

/// Largest request input Google accepts, in UTF-8 bytes.
pub const GOOGLE_MAX_BYTES: usize = 5000;

const DEFAULT_LANGUAGE: &str = "en-US";

/// Provider for direct Google Cloud TTS API calls
pub struct GoogleProvider {
    api_key: String,
    url: String,
    client: Client,
}

impl GoogleProvider {
    /// Create a new Google provider
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self> {
        Ok(Self {
            api_key,
            url: base_url.unwrap_or_else(|| GOOGLE_TTS_URL.to_string()),
            client: Client::new(),
        })
    }

    fn build_request(&self, text: &str, options: &SynthesisOptions) -> Result<SynthesizeRequest> {
        if text.len() > GOOGLE_MAX_BYTES {
            return Err(SpeechError::ApiError {
                message: format!(
                    "Input is {} bytes, over Google's {}-byte limit; lower max_chars",
                    text.len(),
                    GOOGLE_MAX_BYTES
                ),
                status_code: None,
            });
        }

        let input = match options.input_type {
            InputType::Text => SynthesisInput {
                text: Some(text.to_string()),
                ssml: None,
            },
            InputType::Ssml => SynthesisInput {
                text: None,
                ssml: Some(text.to_string()),
            },
        };

        Ok(SynthesizeRequest {
            input,
            voice: VoiceSelection {
                language_code: options
                    .language
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                name: options.voice.clone(),
                ssml_gender: options.gender.as_ref().map(|g| g.to_uppercase()),
            },
            audio_config: AudioConfig {
                audio_encoding: self.encoding(options.format)?.to_string(),
                speaking_rate: options.speed,
                pitch: options.pitch,
                sample_rate_hertz: options.sample_rate,
                volume_gain_db: options.gain,
                effects_profile_id: options.effects.clone(),
            },
        })
    }
}

// Google TTS request/response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest {
    input: SynthesisInput,
    voice: VoiceSelection,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssml: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    language_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssml_gender: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaking_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pitch: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume_gain_db: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    effects_profile_id: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl SpeechProvider for GoogleProvider {
    async fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<Vec<u8>> {
        let api_request = self.build_request(text, options)?;

        let response = self
            .client
            .post(&self.url)
            .header("X-Goog-Api-Key", &self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| SpeechError::ApiError {
                message: format!("Request failed: {}", e),
                status_code: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message =
                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            return Err(SpeechError::ApiError {
                message,
                status_code: Some(status.as_u16()),
            });
        }

        let api_response: SynthesizeResponse =
            response.json().await.map_err(|e| SpeechError::ApiError {
                message: format!("Failed to parse response: {}", e),
                status_code: None,
            })?;

        STANDARD
            .decode(api_response.audio_content.as_bytes())
            .map_err(|e| SpeechError::ApiError {
                message: format!("Invalid audio content: {}", e),
                status_code: None,
            })
    }

    fn name(&self) -> &'static str {
        "Google Cloud TTS"
    }

    fn max_characters(&self) -> usize {
        GOOGLE_MAX_CHARACTERS
    }

    fn encoding(&self, format: AudioFormat) -> Result<&'static str> {
        Ok(match format {
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Ogg => "OGG_OPUS",
            AudioFormat::Pcm => "LINEAR16",
        })
    }

    fn is_available(&self) -> Result<()> {
        // API key was provided in constructor
        Ok(())
    }
}
