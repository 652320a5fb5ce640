/*!
 * Remote service clients.
 *
 * Translation backends:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API and OpenAI-compatible servers such as LM Studio
 * - Anthropic: Anthropic API integration
 *
 * `mock` holds in-process translator and speech engine doubles used by tests.
 */

use async_trait::async_trait;

use crate::errors::ProviderError;

/// Text translation service
///
/// One call translates one piece of text. Retry and pacing are the caller's
/// business; implementations make exactly one attempt.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;
}

pub mod ollama;
pub mod openai;
pub mod anthropic;
pub mod mock;
