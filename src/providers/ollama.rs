use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;

/// Ollama client for interacting with Ollama API
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system message
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }
}

impl Ollama {
    /// Create a client for `base_url` (e.g. `http://localhost:11434`)
    ///
    /// Ollama speaks HTTP/1.1; connections are kept alive between units.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text from the Ollama API
    ///
    /// A streamed (JSON lines) body is accepted as well; its pieces are
    /// concatenated.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self.client.post(&url)
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        let response_text = response.text().await.map_err(ProviderError::from_reqwest)?;

        if !status.is_success() {
            error!("Ollama API error ({}): {}", status, response_text);
            return Err(ProviderError::from_status(status.as_u16(), response_text));
        }

        Self::parse_generation(&response_text)
    }

    fn parse_generation(response_text: &str) -> Result<GenerationResponse, ProviderError> {
        if let Ok(generated) = serde_json::from_str::<GenerationResponse>(response_text) {
            return Ok(generated);
        }

        // JSON lines: concatenate every `response` piece
        let mut full_response = String::new();
        let mut model = String::new();
        let mut parsed_any = false;
        for line in response_text.lines().filter(|l| !l.trim().is_empty()) {
            let value: serde_json::Value = match serde_json::from_str(line) {
                Ok(value) => value,
                Err(_) => continue,
            };
            parsed_any = true;
            if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
                full_response.push_str(part);
            }
            if let Some(m) = value.get("model").and_then(|v| v.as_str()) {
                model = m.to_string();
            }
        }

        if !parsed_any {
            let preview: String = response_text.chars().take(500).collect();
            error!("Failed to parse Ollama API response. Raw response (first 500 chars): {}", preview);
            return Err(ProviderError::ParseError("Ollama response contains invalid JSON".to_string()));
        }

        Ok(GenerationResponse {
            model,
            response: full_response,
            done: true,
            prompt_eval_count: None,
            eval_count: None,
        })
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self.client.get(&url)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?
            .json()
            .await
            .map_err(ProviderError::from_reqwest)?;

        response["version"].as_str()
            .map(|v| v.to_string())
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}
