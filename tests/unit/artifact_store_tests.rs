/*!
 * Tests for the artifact store backends
 */

use anyhow::Result;
use std::sync::Arc;

use cuedub::app_config::{CacheBackend, CacheConfig};
use cuedub::artifacts::{self, ArtifactKey, ArtifactStore, FsArtifactStore, SqliteArtifactStore};

use crate::common;

fn sample_keys() -> Vec<ArtifactKey> {
    vec![
        ArtifactKey::translation("vid", "es", 0),
        ArtifactKey::chunk_clip("vid", "es", 0, 1),
        ArtifactKey::clip("vid", "es", 0),
        ArtifactKey::track("vid", "es"),
        ArtifactKey::translation("vid", "de", 0),
    ]
}

async fn exercise_store(store: &dyn ArtifactStore) -> Result<()> {
    let keys = sample_keys();

    for key in &keys {
        assert!(!store.has(key).await?);
        assert_eq!(store.get(key).await?, None);
    }

    for (i, key) in keys.iter().enumerate() {
        store.put(key, format!("payload {}", i).as_bytes()).await?;
    }

    // Keys differing only in language or kind stay separate
    for (i, key) in keys.iter().enumerate() {
        assert!(store.has(key).await?);
        assert_eq!(store.get(key).await?, Some(format!("payload {}", i).into_bytes()));
    }

    // Overwrite replaces the entry
    store.put(&keys[0], b"second").await?;
    assert_eq!(store.get(&keys[0]).await?, Some(b"second".to_vec()));

    assert!(store.remove(&keys[1]).await?);
    assert!(!store.remove(&keys[1]).await?);
    assert!(!store.has(&keys[1]).await?);
    assert!(store.has(&keys[2]).await?);

    Ok(())
}

/// Test the filesystem backend contract
#[tokio::test]
async fn test_fs_store_withPutGetRemove_shouldBehaveAsKeyValueStore() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = FsArtifactStore::new(temp_dir.path());
    exercise_store(&store).await
}

/// Test the sqlite backend contract
#[tokio::test]
async fn test_sqlite_store_withPutGetRemove_shouldBehaveAsKeyValueStore() -> Result<()> {
    let store = SqliteArtifactStore::open_in_memory()?;
    exercise_store(&store).await
}

/// Test that the filesystem backend writes the documented layout
#[tokio::test]
async fn test_fs_store_withTrack_shouldWriteUnderLanguageDirectory() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = FsArtifactStore::new(temp_dir.path());

    store.put(&ArtifactKey::track("vid", "es"), b"RIFF").await?;
    store.put(&ArtifactKey::translation("vid", "es", 3), b"{}").await?;

    assert!(temp_dir.path().join("vid/es/vid.es.wav").is_file());
    assert!(temp_dir.path().join("vid/es/vid.3.es.json").is_file());
    Ok(())
}

/// Test that a sqlite file keeps entries across reopen
#[test]
fn test_sqlite_store_withReopen_shouldKeepEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("artifacts.db");
    let key = ArtifactKey::clip("vid", "fr", 7);

    tokio_test::block_on(async {
        let store = SqliteArtifactStore::open(&path)?;
        store.put(&key, b"clip").await
    })?;

    let stored = tokio_test::block_on(async {
        let store = SqliteArtifactStore::open(&path)?;
        store.get(&key).await
    })?;
    assert_eq!(stored, Some(b"clip".to_vec()));
    Ok(())
}

/// Test backend selection from configuration
#[tokio::test]
async fn test_open_store_withSqliteBackend_shouldUseDatabase() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = CacheConfig {
        backend: CacheBackend::Sqlite,
        sqlite_path: Some(temp_dir.path().join("cache.db")),
    };

    let store: Arc<dyn ArtifactStore> = artifacts::open_store(&config, temp_dir.path())?;
    store.put(&ArtifactKey::track("vid", "en"), b"x").await?;

    assert!(temp_dir.path().join("cache.db").is_file());
    assert!(!temp_dir.path().join("vid").exists());
    Ok(())
}
