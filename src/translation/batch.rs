/*!
 * Batch translation of all units of one language.
 *
 * Units are translated concurrently up to a worker bound. Each unit checks
 * the artifact cache first; fresh translations are persisted as soon as they
 * arrive so a failing batch still keeps its finished units.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use crate::artifacts::{ArtifactKey, ArtifactStore};
use crate::errors::DubError;
use crate::segmenter::SegmentationUnit;
use crate::shutdown::Shutdown;
use crate::units::TranslatedUnit;

use super::gateway::TranslationGateway;

/// Where a unit's translation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Cache,
    Translator,
}

/// Decode a cached translation
pub fn decode_translation(key: &ArtifactKey, bytes: &[u8]) -> Result<TranslatedUnit, DubError> {
    serde_json::from_slice(bytes).map_err(|e| DubError::CacheCorruption {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Batch translator for the units of one (content, language) run
pub struct BatchTranslator {
    gateway: Arc<TranslationGateway>,
    store: Arc<dyn ArtifactStore>,
    max_concurrent_requests: usize,
}

impl BatchTranslator {
    pub fn new(gateway: Arc<TranslationGateway>, store: Arc<dyn ArtifactStore>, max_concurrent_requests: usize) -> Self {
        Self {
            gateway,
            store,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    /// Cached translation of one unit, or a fresh one persisted to the cache
    async fn translate_one(
        &self,
        content_id: &str,
        unit: &SegmentationUnit,
        source_language: &str,
        target_language: &str,
    ) -> Result<(TranslatedUnit, Origin), DubError> {
        let key = ArtifactKey::translation(content_id, target_language, unit.index);

        let cached = self.store.get(&key).await
            .map_err(|e| DubError::storage(format!("reading {}", key), e))?;
        if let Some(bytes) = cached {
            return Ok((decode_translation(&key, &bytes)?, Origin::Cache));
        }

        let translated = self.gateway
            .translate_unit(content_id, unit, source_language, target_language)
            .await?;

        let json = serde_json::to_vec_pretty(&translated)
            .map_err(|e| DubError::storage(format!("encoding {}", key), e.into()))?;
        self.store.put(&key, &json).await
            .map_err(|e| DubError::storage(format!("writing {}", key), e))?;

        Ok((translated, Origin::Translator))
    }

    /// Translate every unit, returning them in index order
    ///
    /// After the first failure no new unit is started; units already in
    /// flight finish and stay cached. The failure with the lowest unit index
    /// is returned.
    pub async fn translate_all(
        &self,
        content_id: &str,
        units: &[SegmentationUnit],
        source_language: &str,
        target_language: &str,
        shutdown: &Shutdown,
        progress_callback: impl Fn(usize, usize) + Clone + Send,
    ) -> Result<Vec<TranslatedUnit>, DubError> {
        let total = units.len();
        let processed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicBool::new(false));
        let start_time = Instant::now();

        let mut results = stream::iter(units.iter().enumerate())
            .map(|(position, unit)| {
                let processed = processed.clone();
                let failed = failed.clone();
                let progress_callback = progress_callback.clone();

                async move {
                    if failed.load(Ordering::SeqCst) {
                        return (position, None);
                    }
                    if let Err(e) = shutdown.check() {
                        failed.store(true, Ordering::SeqCst);
                        return (position, Some(Err(e)));
                    }

                    let result = self
                        .translate_one(content_id, unit, source_language, target_language)
                        .await;

                    match &result {
                        Ok((_, Origin::Cache)) => {
                            debug!("Unit {} of {}/{} loaded from cache", unit.index, content_id, target_language);
                        }
                        Ok((_, Origin::Translator)) => {
                            debug!("Unit {} of {}/{} translated", unit.index, content_id, target_language);
                        }
                        Err(e) => {
                            failed.store(true, Ordering::SeqCst);
                            error!("Unit {} of {}/{} failed: {}", unit.index, content_id, target_language, e);
                        }
                    }

                    let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total);

                    (position, Some(result))
                }
            })
            .buffer_unordered(self.max_concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        // Sort results by position to maintain unit order
        results.sort_by_key(|(position, _)| *position);

        let mut translated = Vec::with_capacity(total);
        let mut fresh = 0usize;
        for (_, result) in results {
            match result {
                Some(Ok((unit, origin))) => {
                    if origin == Origin::Translator {
                        fresh += 1;
                    }
                    translated.push(unit);
                }
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }

        if translated.len() != total {
            // Units were skipped without a recorded failure
            return Err(DubError::Cancelled);
        }

        info!(
            "Translated {}/{}: {} units ({} fresh, {} cached) in {:?}",
            content_id,
            target_language,
            total,
            fresh,
            total - fresh,
            start_time.elapsed()
        );

        Ok(translated)
    }
}
