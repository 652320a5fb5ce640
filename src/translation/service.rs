/*!
 * LLM-backed translator.
 *
 * Dispatches one translation request to the provider selected in the
 * configuration and renders the system prompt for the language pair.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::providers::Translator;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};

/// Output cap for one unit; units are a few sentences at most
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Translation provider implementation variants
enum TranslationProviderImpl {
    /// Ollama LLM service
    Ollama {
        client: Ollama,
    },

    /// OpenAI API service
    OpenAI {
        client: OpenAI,
    },

    /// LM Studio local server (OpenAI-compatible)
    LMStudio {
        client: OpenAI,
    },

    /// Anthropic API service
    Anthropic {
        client: Anthropic,
    },
}

/// Translator backed by the configured LLM provider
pub struct TranslationService {
    provider: TranslationProviderImpl,
    config: TranslationConfig,
    name: String,
}

/// Validate an endpoint and give it a scheme when it has none
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    if endpoint.trim().is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    if url.host_str().is_none() {
        return Err(anyhow!("Invalid host in endpoint: {}", endpoint));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

impl TranslationService {
    /// Create a translation service for the active provider
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let endpoint = normalize_endpoint(&config.get_endpoint())?;
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::new(endpoint, timeout_secs),
            },
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::new(config.get_api_key(), endpoint, timeout_secs),
            },
            ConfigTranslationProvider::LMStudio => {
                // LM Studio often doesn't require an API key; use a default if empty
                let api_key = {
                    let k = config.get_api_key();
                    if k.is_empty() { "lm-studio".to_string() } else { k }
                };
                TranslationProviderImpl::LMStudio {
                    client: OpenAI::new(api_key, endpoint, timeout_secs),
                }
            }
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new(config.get_api_key(), endpoint, timeout_secs),
            },
        };

        let name = format!("{} ({})", config.provider.display_name(), config.get_model());

        Ok(Self {
            provider,
            config,
            name,
        })
    }

    /// Check the provider answers before a batch starts
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.provider {
            TranslationProviderImpl::Ollama { client } => {
                let version = client.version().await?;
                debug!("Connected to Ollama {} at {}", version, client.base_url());
                Ok(())
            }
            _ => self.translate("Hello", "en", "fr").await.map(|_| ()),
        }
    }
}

#[async_trait]
impl Translator for TranslationService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let system_prompt = self.config.system_prompt_for(source_language, target_language);
        let model = self.config.get_model();
        let temperature = self.config.common.temperature;

        let translated = match &self.provider {
            TranslationProviderImpl::Ollama { client } => {
                let request = GenerationRequest::new(model, text)
                    .system(system_prompt)
                    .temperature(temperature);
                let response = client.generate(&request).await?;
                debug!(
                    "Ollama tokens: prompt {:?}, completion {:?}",
                    response.prompt_eval_count, response.eval_count
                );
                response.response
            }
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                let request = OpenAIRequest::new(model)
                    .add_message("system", system_prompt)
                    .add_message("user", text)
                    .temperature(temperature)
                    .max_tokens(MAX_OUTPUT_TOKENS);
                let response = client.complete(&request).await?;
                if let Some(usage) = &response.usage {
                    debug!("Chat tokens: prompt {}, completion {}", usage.prompt_tokens, usage.completion_tokens);
                }
                OpenAI::extract_text_from_response(&response)
            }
            TranslationProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(model, MAX_OUTPUT_TOKENS)
                    .system(system_prompt)
                    .add_message("user", text)
                    .temperature(temperature);
                let response = client.complete(&request).await?;
                if let Some(usage) = &response.usage {
                    debug!("Anthropic tokens: input {}, output {}", usage.input_tokens, usage.output_tokens);
                }
                Anthropic::extract_text_from_response(&response)
            }
        };

        Ok(clean_translation(&translated))
    }
}

/// Collapse the model output to one trimmed line
fn clean_translation(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
