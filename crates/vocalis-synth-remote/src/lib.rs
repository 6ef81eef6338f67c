//! Remote speech synthesis over HTTP.
//!
//! The endpoint accepts `{ text, language, voice_id?, character? }` and
//! answers with hex-encoded audio bytes plus a content type, or an error
//! payload `{ error }`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use vocalis_playback::{SpeechSynthesizer, SynthesisError, SynthesisOptions, SynthesizedAudio};

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    character: Option<&'a str>,
}

#[derive(Deserialize)]
struct SynthesisResponse {
    audio_data: Option<String>,
    content_type: Option<String>,
    error: Option<String>,
}

/// Remote HTTP synthesis provider.
pub struct RemoteSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    default_language: String,
    voice_id: Option<String>,
    character: Option<String>,
}

impl RemoteSynthesizer {
    pub fn new(endpoint: String, default_language: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            default_language,
            voice_id: None,
            character: None,
        }
    }

    /// Configure the voice identity the endpoint should speak with.
    pub fn with_voice(mut self, voice_id: Option<String>, character: Option<String>) -> Self {
        self.voice_id = voice_id;
        self.character = character;
        self
    }

    fn decode_response(body: SynthesisResponse) -> Result<SynthesizedAudio, SynthesisError> {
        if let Some(message) = body.error {
            return Err(SynthesisError::InvalidResponse(message));
        }
        let hex_audio = body
            .audio_data
            .ok_or_else(|| SynthesisError::InvalidResponse("no audio data in response".into()))?;
        let data = hex::decode(hex_audio.trim())
            .map_err(|e| SynthesisError::InvalidResponse(format!("invalid hex audio: {}", e)))?;
        if data.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        Ok(SynthesizedAudio {
            data,
            media_type: body.content_type.unwrap_or_else(|| "audio/mp3".to_string()),
            sample_rate: None,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for RemoteSynthesizer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn is_available(&self) -> bool {
        // Availability is only known by asking; let the per-item fallback
        // handle an endpoint that turns out to be down.
        true
    }

    async fn synthesize(
        &self,
        text: &str,
        options: &SynthesisOptions,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        let language = options
            .language
            .as_deref()
            .unwrap_or(&self.default_language);
        let request = SynthesisRequest {
            text,
            language,
            voice_id: options.voice.as_deref().or(self.voice_id.as_deref()),
            character: self.character.as_deref(),
        };

        debug!(target: "playback", "Requesting remote synthesis ({} chars)", text.len());
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let status = response.status();
        let body: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(target: "playback", "Remote synthesis error: {}", message);
            return Err(SynthesisError::Network(message));
        }

        Self::decode_response(body)
    }
}
