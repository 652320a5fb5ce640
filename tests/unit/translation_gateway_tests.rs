/*!
 * Tests for per-unit translation retry and batch translation
 */

use anyhow::Result;
use std::sync::Arc;

use cuedub::artifacts::{ArtifactKey, ArtifactStore, FsArtifactStore};
use cuedub::errors::DubError;
use cuedub::providers::mock::MockTranslator;
use cuedub::segmenter::SegmentationUnit;
use cuedub::shutdown::Shutdown;
use cuedub::translation::{BatchTranslator, RetryPolicy, TranslationGateway};

use crate::common;

fn units(count: usize) -> Vec<SegmentationUnit> {
    (0..count)
        .map(|index| SegmentationUnit {
            index,
            text: format!("phrase {}", index),
            start_secs: index as f64,
            duration_secs: 1.0,
        })
        .collect()
}

fn gateway(translator: &MockTranslator) -> Arc<TranslationGateway> {
    Arc::new(TranslationGateway::new(
        Arc::new(translator.clone()),
        RetryPolicy::immediate(3),
        Vec::new(),
    ))
}

/// Test that a transient failure is retried and then succeeds
#[tokio::test]
async fn test_translate_unit_withIntermittentProvider_shouldRetryAndSucceed() {
    let translator = MockTranslator::intermittent(2);
    let gateway = gateway(&translator);
    let unit = &units(1)[0];

    // First call succeeds, second fails, third succeeds
    gateway.translate_unit("vid", unit, "fr", "en").await.unwrap();
    let translated = gateway.translate_unit("vid", unit, "fr", "en").await.unwrap();

    assert_eq!(translated.translated_text, "[en] phrase 0");
    assert_eq!(translator.calls(), 3);
}

/// Test that a digit-only unit from a configured source language is spelled out before translation
#[tokio::test]
async fn test_translate_unit_withDigitsFromHindiSource_shouldSendWords() {
    let translator = MockTranslator::working();
    let gateway = TranslationGateway::new(
        Arc::new(translator.clone()),
        RetryPolicy::immediate(3),
        vec!["hi".to_string()],
    );
    let unit = SegmentationUnit {
        index: 0,
        text: "42".to_string(),
        start_secs: 0.0,
        duration_secs: 1.0,
    };

    let translated = gateway.translate_unit("vid", &unit, "hi", "en").await.unwrap();
    gateway.translate_unit("vid", &unit, "fr", "en").await.unwrap();

    assert_eq!(translated.translated_text, "[en] forty-two");
    assert_eq!(translator.received_texts(), vec!["forty-two".to_string(), "42".to_string()]);
}

/// Test that a persistent failure stops after exactly the attempt bound
#[tokio::test]
async fn test_translate_unit_withFailingProvider_shouldStopAfterThreeAttempts() {
    let translator = MockTranslator::failing();
    let result = gateway(&translator).translate_unit("vid", &units(1)[0], "fr", "en").await;

    match result {
        Err(DubError::TranslationFailed { unit, attempts, language, .. }) => {
            assert_eq!(unit, 0);
            assert_eq!(attempts, 3);
            assert_eq!(language, "en");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(translator.calls(), 3);
}

/// Test that concurrent batch translation keeps index order and caches every unit
#[tokio::test]
async fn test_translate_all_withConcurrency_shouldKeepIndexOrderAndCache() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(temp_dir.path()));
    let translator = MockTranslator::working();
    let batch = BatchTranslator::new(gateway(&translator), store.clone(), 4);
    let units = units(12);

    let translated = batch
        .translate_all("vid", &units, "fr", "es", &Shutdown::new(), |_, _| {})
        .await?;

    let indices: Vec<usize> = translated.iter().map(|t| t.index()).collect();
    assert_eq!(indices, (0..12).collect::<Vec<_>>());
    for unit in &units {
        assert!(store.has(&ArtifactKey::translation("vid", "es", unit.index)).await?);
    }

    // Second pass is served from the cache
    let again = batch
        .translate_all("vid", &units, "fr", "es", &Shutdown::new(), |_, _| {})
        .await?;
    assert_eq!(again, translated);
    assert_eq!(translator.calls(), 12);
    Ok(())
}

/// Test that a corrupt cached translation is reported rather than repaired
#[tokio::test]
async fn test_translate_all_withCorruptCacheEntry_shouldReportCorruption() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(temp_dir.path()));
    store.put(&ArtifactKey::translation("vid", "es", 0), b"{not json").await?;

    let translator = MockTranslator::working();
    let batch = BatchTranslator::new(gateway(&translator), store, 1);
    let result = batch
        .translate_all("vid", &units(2), "fr", "es", &Shutdown::new(), |_, _| {})
        .await;

    assert!(matches!(result, Err(DubError::CacheCorruption { .. })));
    Ok(())
}

/// Test that a triggered shutdown stops the batch with Cancelled
#[tokio::test]
async fn test_translate_all_withShutdownTriggered_shouldCancel() {
    let temp_dir = common::create_temp_dir().unwrap();
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(temp_dir.path()));
    let translator = MockTranslator::working();
    let batch = BatchTranslator::new(gateway(&translator), store, 2);

    let shutdown = Shutdown::new();
    shutdown.trigger();
    let result = batch.translate_all("vid", &units(3), "fr", "es", &shutdown, |_, _| {}).await;

    assert!(matches!(result, Err(DubError::Cancelled)));
    assert_eq!(translator.calls(), 0);
}
