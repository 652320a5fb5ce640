/*!
 * Per-unit speech synthesis.
 *
 * A unit's translation is split into chunks that fit the engine's input
 * limit. Every chunk is voiced (or taken from the cache), persisted, and the
 * chunk clips are joined into one clip for the unit.
 */

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::app_config::SynthesisConfig;
use crate::artifacts::{ArtifactKey, ArtifactStore};
use crate::audio::AudioClip;
use crate::errors::DubError;
use crate::units::{SynthesizedUnit, TranslatedUnit};

use super::chunker::chunk_text;
use super::engine::{SpeechEngine, SpeechRequest};

/// Identifies the run a unit belongs to
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub content_id: &'a str,
    pub source_language: &'a str,
    pub target_language: &'a str,
}

/// Drives the speech engine for one unit at a time
pub struct SynthesisOrchestrator {
    engine: Arc<dyn SpeechEngine>,
    store: Arc<dyn ArtifactStore>,
    permits: Arc<Semaphore>,
    config: SynthesisConfig,
}

impl SynthesisOrchestrator {
    /// `permits` bounds engine calls across every orchestrator sharing it
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        store: Arc<dyn ArtifactStore>,
        permits: Arc<Semaphore>,
        config: SynthesisConfig,
    ) -> Self {
        Self {
            engine,
            store,
            permits,
            config,
        }
    }

    fn synthesis_failed(ctx: &RunContext, unit: usize, reason: impl Into<String>) -> DubError {
        DubError::SynthesisFailed {
            content_id: ctx.content_id.to_string(),
            language: ctx.target_language.to_string(),
            unit,
            reason: reason.into(),
        }
    }

    /// Voice one chunk, retrying up to the configured attempts
    ///
    /// The engine permit is held for a single call only.
    async fn voice_chunk(&self, ctx: &RunContext<'_>, unit: usize, chunk: usize, text: &str) -> Result<(AudioClip, Vec<u8>), DubError> {
        let request = SpeechRequest {
            text: text.to_string(),
            language: ctx.target_language.to_lowercase(),
            voice_sample: self.config.voice_sample_for(ctx.source_language),
            speed: self.config.speed,
            temperature: self.config.temperature,
        };
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let response = {
                let _permit = self.permits.acquire().await
                    .map_err(|e| Self::synthesis_failed(ctx, unit, e.to_string()))?;
                self.engine.synthesize(&request).await
            };

            match response {
                Ok(bytes) => match AudioClip::from_wav_bytes(&bytes) {
                    Ok(clip) => return Ok((clip, bytes.to_vec())),
                    Err(e) => last_error = format!("engine returned undecodable audio: {}", e),
                },
                Err(e) => last_error = e.to_string(),
            }

            warn!(
                "Synthesis attempt {}/{} failed for {}/{} unit {} chunk {}: {}",
                attempt, max_attempts, ctx.content_id, ctx.target_language, unit, chunk, last_error
            );

            if attempt < max_attempts && self.config.retry_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        Err(Self::synthesis_failed(ctx, unit, last_error))
    }

    /// Produce the unpadded clip of one unit
    ///
    /// Chunk clips already in the cache are reused; fresh ones are persisted
    /// before moving on so an interrupted unit resumes at its next chunk.
    pub async fn synthesize_unit(
        &self,
        ctx: &RunContext<'_>,
        translated: TranslatedUnit,
        chunk_chars: usize,
    ) -> Result<SynthesizedUnit, DubError> {
        let unit = translated.index();
        let chunks = chunk_text(&translated.translated_text, chunk_chars);
        let mut clips = Vec::with_capacity(chunks.len());

        for (chunk, text) in chunks.iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }

            let key = ArtifactKey::chunk_clip(ctx.content_id, ctx.target_language, unit, chunk);
            let cached = self.store.get(&key).await
                .map_err(|e| DubError::storage(format!("reading {}", key), e))?;

            let clip = match cached {
                Some(bytes) => {
                    debug!("Reusing cached chunk {}", key);
                    AudioClip::from_wav_bytes(&bytes).map_err(|e| DubError::CacheCorruption {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?
                }
                None => {
                    debug!("Voicing {} ({} chars)", key, text.chars().count());
                    let (clip, bytes) = self.voice_chunk(ctx, unit, chunk, text).await?;
                    self.store.put(&key, &bytes).await
                        .map_err(|e| DubError::storage(format!("writing {}", key), e))?;
                    clip
                }
            };
            clips.push(clip);
        }

        if clips.is_empty() {
            return Err(Self::synthesis_failed(ctx, unit, "translation has no speakable text"));
        }

        let clip = AudioClip::concat(&clips)?;
        let actual_duration_secs = clip.duration_secs();

        info!(
            "Voiced {}/{} unit {} in {} chunk(s): {:.2}s",
            ctx.content_id, ctx.target_language, unit, chunks.len(), actual_duration_secs
        );

        Ok(SynthesizedUnit {
            translated,
            clip,
            actual_duration_secs,
            chunk_count: chunks.len(),
        })
    }

    /// Delete a unit's chunk artifacts once its aligned clip is stored
    pub async fn discard_chunks(&self, ctx: &RunContext<'_>, unit: usize, chunk_count: usize) -> Result<(), DubError> {
        for chunk in 0..chunk_count {
            let key = ArtifactKey::chunk_clip(ctx.content_id, ctx.target_language, unit, chunk);
            self.store.remove(&key).await
                .map_err(|e| DubError::storage(format!("removing {}", key), e))?;
        }
        Ok(())
    }
}
