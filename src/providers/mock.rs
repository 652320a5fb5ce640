/*!
 * In-process doubles for the translator and the speech engine.
 *
 * - `MockTranslator::working()` - Always succeeds with `[target] text`
 * - `MockTranslator::failing()` - Always fails with an error
 * - `MockTranslator::failing_for(lang)` - Fails only for one target language
 * - `MockTranslator::intermittent(n)` - Fails every n-th call
 * - `MockTranslator::empty()` - Returns empty translations
 * - `MockSpeechEngine` - Returns silent WAV audio whose length follows the text
 *
 * Clones share their call counters.
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::audio::AudioClip;
use crate::errors::ProviderError;
use crate::providers::Translator;
use crate::synthesis::engine::{SpeechEngine, SpeechRequest};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails every Nth call
    Intermittent { fail_every: usize },
    /// Always fails
    Failing,
    /// Fails for one target language, succeeds for the others
    FailingFor { target_language: String },
    /// Succeeds with an empty string
    Empty,
}

/// Mock translator counting its calls
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn failing_for(target_language: impl Into<String>) -> Self {
        Self::new(MockBehavior::FailingFor { target_language: target_language.into() })
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Number of `translate` calls so far
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Calls made for one target language
    pub fn calls_for(&self, target_language: &str) -> usize {
        self.requests.lock().iter().filter(|(_, _, t)| t == target_language).count()
    }

    /// Texts received, in call order
    pub fn received_texts(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(text, _, _)| text.clone()).collect()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((
            text.to_string(),
            source_language.to_string(),
            target_language.to_string(),
        ));

        match &self.behavior {
            MockBehavior::Working => Ok(format!("[{}] {}", target_language, text)),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(format!("[{}] {}", target_language, text))
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::FailingFor { target_language: failing } if failing == target_language => {
                Err(ProviderError::ApiError {
                    message: format!("Simulated failure for {}", failing),
                    status_code: 500,
                })
            }
            MockBehavior::FailingFor { .. } => Ok(format!("[{}] {}", target_language, text)),
            MockBehavior::Empty => Ok(String::new()),
        }
    }
}

/// Mock speech engine producing silent mono clips
#[derive(Debug, Clone)]
pub struct MockSpeechEngine {
    secs_per_char: f64,
    sample_rate: u32,
    fail_after: Option<usize>,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<SpeechRequest>>>,
}

impl MockSpeechEngine {
    /// Clips last `secs_per_char` seconds per character of text
    pub fn new(secs_per_char: f64) -> Self {
        Self {
            secs_per_char,
            sample_rate: 16_000,
            fail_after: None,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every call after the first `successes`
    pub fn failing_after(mut self, successes: usize) -> Self {
        self.fail_after = Some(successes);
        self
    }

    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SpeechEngine for MockSpeechEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if self.fail_after.is_some_and(|limit| count >= limit) {
            return Err(ProviderError::ConnectionError("Simulated TTS outage".to_string()));
        }

        let secs = request.text.chars().count() as f64 * self.secs_per_char;
        AudioClip::silence(secs, 1, self.sample_rate)
            .to_wav_bytes()
            .map(Bytes::from)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }
}
