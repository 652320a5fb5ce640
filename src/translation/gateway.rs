/*!
 * Per-unit translation with bounded retry and pacing.
 */

use log::{debug, warn};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::TranslationConfig;
use crate::errors::DubError;
use crate::language_utils;
use crate::numerals;
use crate::providers::Translator;
use crate::segmenter::SegmentationUnit;
use crate::units::TranslatedUnit;

/// Attempt bounds and randomized waits around translator calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    pub pacing_max_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &TranslationConfig) -> Self {
        let common = &config.common;
        Self {
            max_attempts: common.max_attempts.max(1),
            backoff_min_ms: common.retry_backoff_min_ms,
            backoff_max_ms: common.retry_backoff_max_ms.max(common.retry_backoff_min_ms),
            pacing_max_ms: common.pacing_max_ms,
        }
    }

    /// No waiting at all; used by tests and benchmarks
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_min_ms: 0,
            backoff_max_ms: 0,
            pacing_max_ms: 0,
        }
    }

    fn backoff(&self) -> Duration {
        random_millis(self.backoff_min_ms, self.backoff_max_ms)
    }

    fn pacing(&self) -> Duration {
        random_millis(0, self.pacing_max_ms)
    }
}

fn random_millis(min: u64, max: u64) -> Duration {
    if max == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(min..=max))
}

async fn sleep_for(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Translates one unit at a time through a [`Translator`]
pub struct TranslationGateway {
    translator: Arc<dyn Translator>,
    policy: RetryPolicy,
    spell_out_numbers_for: Vec<String>,
}

impl TranslationGateway {
    pub fn new(translator: Arc<dyn Translator>, policy: RetryPolicy, spell_out_numbers_for: Vec<String>) -> Self {
        Self {
            translator,
            policy,
            spell_out_numbers_for,
        }
    }

    pub fn from_config(translator: Arc<dyn Translator>, config: &TranslationConfig) -> Self {
        Self::new(translator, RetryPolicy::from_config(config), config.spell_out_numbers_for.clone())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Text actually sent to the translator
    ///
    /// Digit-only units from the listed source languages are spelled out in
    /// English first.
    fn prepare_text(&self, text: &str, source_language: &str) -> String {
        let spell_out = self.spell_out_numbers_for.iter()
            .any(|code| code == source_language || language_utils::language_codes_match(code, source_language));

        if spell_out {
            if let Some(words) = numerals::spell_out_digits(text) {
                debug!("Spelled out '{}' as '{}'", text.trim(), words);
                return words;
            }
        }
        text.to_string()
    }

    /// Translate one unit, retrying up to the policy's attempt bound
    ///
    /// An empty translation counts as a failed attempt.
    pub async fn translate_unit(
        &self,
        content_id: &str,
        unit: &SegmentationUnit,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranslatedUnit, DubError> {
        let text = self.prepare_text(&unit.text, source_language);
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            match self.translator.translate(&text, source_language, target_language).await {
                Ok(translated) if !translated.trim().is_empty() => {
                    sleep_for(self.policy.pacing()).await;
                    return Ok(TranslatedUnit::new(unit.clone(), translated));
                }
                Ok(_) => {
                    last_error = "empty translation".to_string();
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            warn!(
                "Translation attempt {}/{} failed for {}/{} unit {}: {}",
                attempt, self.policy.max_attempts, content_id, target_language, unit.index, last_error
            );

            if attempt < self.policy.max_attempts {
                sleep_for(self.policy.backoff()).await;
            }
        }

        Err(DubError::TranslationFailed {
            content_id: content_id.to_string(),
            language: target_language.to_string(),
            unit: unit.index,
            attempts: self.policy.max_attempts,
            reason: last_error,
        })
    }
}
