use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{ArtifactKey, ArtifactKind, ArtifactStore};
use crate::file_utils::FileManager;

/// Artifacts as files under the translations root
///
/// Layout for root `R`, content `C`, language `L`:
/// - `R/C/L/C.<i>.L.json` translated unit
/// - `R/C/L/C.<i>-<k>.L.wav` chunk clip
/// - `R/C/L/C.<i>.L.wav` aligned unit clip
/// - `R/C/L/C.L.srt` translated subtitles
/// - `R/C/L/C.L.wav` final track
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        let (c, l) = (&key.content_id, &key.language);
        let file_name = match key.kind {
            ArtifactKind::Translation { unit } => format!("{c}.{unit}.{l}.json"),
            ArtifactKind::ChunkClip { unit, chunk } => format!("{c}.{unit}-{chunk}.{l}.wav"),
            ArtifactKind::Clip { unit } => format!("{c}.{unit}.{l}.wav"),
            ArtifactKind::Subtitles => format!("{c}.{l}.srt"),
            ArtifactKind::Track => format!("{c}.{l}.wav"),
        };
        self.root.join(c).join(l).join(file_name)
    }
}

// File operations are small and local; they run inline rather than on the
// blocking pool.
#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn has(&self, key: &ArtifactKey) -> Result<bool> {
        Ok(FileManager::file_exists(self.path_for(key)))
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        FileManager::read_if_exists(self.path_for(key))
    }

    async fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        FileManager::write_atomic(self.path_for(key), bytes)
    }

    async fn remove(&self, key: &ArtifactKey) -> Result<bool> {
        FileManager::remove_if_exists(self.path_for(key))
    }
}
