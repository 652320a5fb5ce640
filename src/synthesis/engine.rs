use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error};
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::app_config::SynthesisConfig;
use crate::errors::ProviderError;

/// One text-to-speech call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechRequest {
    pub text: String,
    pub language: String,
    /// Reference recording the engine clones the voice from
    pub voice_sample: PathBuf,
    pub speed: f32,
    pub temperature: f32,
}

/// Text-to-speech engine returning WAV bytes
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes, ProviderError>;
}

/// Body posted to the TTS server
#[derive(Debug, Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    language: &'a str,
    speaker_wav: String,
    speed: f32,
    temperature: f32,
    model: &'a str,
    device: &'a str,
}

/// TTS server reachable over HTTP (`POST <endpoint>/tts`, WAV response)
pub struct HttpSpeechEngine {
    client: Client,
    endpoint: String,
    model: String,
    device: String,
}

impl HttpSpeechEngine {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            device: config.device.clone(),
        }
    }
}

#[async_trait]
impl SpeechEngine for HttpSpeechEngine {
    fn name(&self) -> &str {
        "http-tts"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes, ProviderError> {
        let url = format!("{}/tts", self.endpoint);
        let body = TtsBody {
            text: &request.text,
            language: &request.language,
            speaker_wav: request.voice_sample.to_string_lossy().to_string(),
            speed: request.speed,
            temperature: request.temperature,
            model: &self.model,
            device: &self.device,
        };

        debug!("TTS request: {} chars in {}", request.text.chars().count(), request.language);

        let response = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("TTS server error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let audio = response.bytes().await.map_err(ProviderError::from_reqwest)?;
        if audio.is_empty() {
            return Err(ProviderError::EmptyResponse("TTS server returned no audio".to_string()));
        }

        Ok(audio)
    }
}
