use log::info;
use std::sync::Arc;

use crate::artifacts::{ArtifactKey, ArtifactStore};
use crate::audio::AudioClip;
use crate::errors::DubError;

// @module: Final track assembly

/// Joins aligned unit clips into the final track of a language
pub struct TrackAssembler {
    store: Arc<dyn ArtifactStore>,
}

impl TrackAssembler {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Whether the final track of a run already exists
    pub async fn track_exists(&self, content_id: &str, language: &str) -> Result<bool, DubError> {
        let key = ArtifactKey::track(content_id, language);
        self.store.has(&key).await
            .map_err(|e| DubError::storage(format!("checking {}", key), e))
    }

    /// Concatenate clips in order, store the track, then drop the unit clips
    ///
    /// Translation artifacts are left in place.
    pub async fn assemble(&self, content_id: &str, language: &str, clips: &[AudioClip]) -> Result<f64, DubError> {
        let track = AudioClip::concat(clips)?;
        let bytes = track.to_wav_bytes()?;

        let key = ArtifactKey::track(content_id, language);
        self.store.put(&key, &bytes).await
            .map_err(|e| DubError::storage(format!("writing {}", key), e))?;

        for unit in 0..clips.len() {
            let clip_key = ArtifactKey::clip(content_id, language, unit);
            self.store.remove(&clip_key).await
                .map_err(|e| DubError::storage(format!("removing {}", clip_key), e))?;
        }

        let duration = track.duration_secs();
        info!("Assembled {}/{}: {} clips, {:.2}s", content_id, language, clips.len(), duration);
        Ok(duration)
    }
}
