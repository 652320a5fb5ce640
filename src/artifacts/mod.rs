/*!
 * Persistent artifact cache.
 *
 * Every product of a run (translations, chunk audio, aligned unit clips,
 * translated subtitles and final tracks) is stored under an [`ArtifactKey`]. A stage
 * whose output already exists is skipped, which makes reruns resume where
 * the previous run stopped. Entries are never invalidated automatically.
 *
 * Two backends are available:
 * - [`FsArtifactStore`]: one file per entry under the translations root
 * - [`SqliteArtifactStore`]: one row per entry in a SQLite database
 */

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::app_config::{CacheBackend, CacheConfig};

pub mod fs_store;
pub mod schema;
pub mod sqlite_store;

pub use fs_store::FsArtifactStore;
pub use sqlite_store::SqliteArtifactStore;

/// What an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Translated unit JSON
    Translation { unit: usize },
    /// Audio of one chunk of a unit, before concatenation
    ChunkClip { unit: usize, chunk: usize },
    /// Aligned audio of a whole unit
    Clip { unit: usize },
    /// Target-language SRT rendered from the translated units
    Subtitles,
    /// Final assembled track
    Track,
}

impl ArtifactKind {
    /// Stable lowercase tag used by storage backends
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Translation { .. } => "translation",
            Self::ChunkClip { .. } => "chunk_clip",
            Self::Clip { .. } => "clip",
            Self::Subtitles => "subtitles",
            Self::Track => "track",
        }
    }

    /// Unit and chunk indices, absent parts as `None`
    pub fn indices(&self) -> (Option<usize>, Option<usize>) {
        match *self {
            Self::Translation { unit } | Self::Clip { unit } => (Some(unit), None),
            Self::ChunkClip { unit, chunk } => (Some(unit), Some(chunk)),
            Self::Subtitles | Self::Track => (None, None),
        }
    }
}

/// Address of one cached artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub content_id: String,
    pub language: String,
    pub kind: ArtifactKind,
}

impl ArtifactKey {
    pub fn new(content_id: &str, language: &str, kind: ArtifactKind) -> Self {
        Self {
            content_id: content_id.to_string(),
            language: language.to_string(),
            kind,
        }
    }

    pub fn translation(content_id: &str, language: &str, unit: usize) -> Self {
        Self::new(content_id, language, ArtifactKind::Translation { unit })
    }

    pub fn chunk_clip(content_id: &str, language: &str, unit: usize, chunk: usize) -> Self {
        Self::new(content_id, language, ArtifactKind::ChunkClip { unit, chunk })
    }

    pub fn clip(content_id: &str, language: &str, unit: usize) -> Self {
        Self::new(content_id, language, ArtifactKind::Clip { unit })
    }

    pub fn subtitles(content_id: &str, language: &str) -> Self {
        Self::new(content_id, language, ArtifactKind::Subtitles)
    }

    pub fn track(content_id: &str, language: &str) -> Self {
        Self::new(content_id, language, ArtifactKind::Track)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.content_id, self.language, self.kind.tag())?;
        match self.kind.indices() {
            (Some(unit), Some(chunk)) => write!(f, "[{}-{}]", unit, chunk),
            (Some(unit), None) => write!(f, "[{}]", unit),
            _ => Ok(()),
        }
    }
}

/// Key-value store for run artifacts
///
/// Implementations must make `put` atomic per entry and be safe to use
/// concurrently with disjoint keys.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    async fn has(&self, key: &ArtifactKey) -> Result<bool>;

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()>;

    /// Remove an entry, returning whether it existed
    async fn remove(&self, key: &ArtifactKey) -> Result<bool>;
}

/// Open the backend selected in the configuration
pub fn open_store(config: &CacheConfig, root_dir: &Path) -> Result<Arc<dyn ArtifactStore>> {
    match config.backend {
        CacheBackend::Filesystem => Ok(Arc::new(FsArtifactStore::new(root_dir))),
        CacheBackend::Sqlite => {
            let store = match &config.sqlite_path {
                Some(path) => SqliteArtifactStore::open(path)?,
                None => SqliteArtifactStore::open_default()?,
            };
            Ok(Arc::new(store))
        }
    }
}
