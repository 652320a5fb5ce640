/*!
 * End-to-end dubbing runs over a temporary translations root
 */

use anyhow::Result;
use std::fs;

use cuedub::app_config::TargetLanguage;
use cuedub::audio::AudioClip;
use cuedub::errors::DubError;
use cuedub::pipeline::LanguageOutcome;
use cuedub::providers::mock::{MockSpeechEngine, MockTranslator};
use cuedub::shutdown::Shutdown;
use cuedub::transcript::Transcript;

use crate::common;

const SECS_PER_CHAR: f64 = 0.05;

/// Test a full run producing one track per target language
#[tokio::test]
async fn test_run_withWorkingProviders_shouldWriteTracksAndCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let translator = MockTranslator::working();
    let engine = MockSpeechEngine::new(SECS_PER_CHAR);
    let controller = common::build_controller(common::test_config(root), &translator, &engine, Shutdown::new());

    let report = controller.run(&["vid".to_string()]).await;
    assert!(!report.has_failures(), "{}", report);

    for language in ["en", "de"] {
        match report.succeeded("vid", language) {
            Some(LanguageOutcome::Dubbed { units, duration_secs, .. }) => {
                assert_eq!(*units, 3);
                assert!(*duration_secs > 0.0);
            }
            other => panic!("unexpected outcome for {}: {:?}", language, other),
        }

        // Only translations and the final track survive
        assert_eq!(
            common::language_files(root, "vid", language),
            vec![
                format!("vid.0.{}.json", language),
                format!("vid.1.{}.json", language),
                format!("vid.2.{}.json", language),
                format!("vid.{}.srt", language),
                format!("vid.{}.wav", language),
            ]
        );
    }

    // Speech is shorter than every unit, so the track lasts exactly the 14s of cues
    let track = AudioClip::from_wav_bytes(&fs::read(root.join("vid/en/vid.en.wav"))?)?;
    assert!((track.duration_secs() - 14.0).abs() < 0.01, "track lasts {}", track.duration_secs());

    assert_eq!(translator.calls(), 6);
    let requests = engine.requests();
    assert!(requests.iter().all(|r| r.voice_sample.ends_with("sample.fr.wav")));
    assert!(requests.iter().all(|r| r.text.chars().count() <= 40));
    Ok(())
}

/// Test that a second run over a populated cache changes nothing and calls nothing
#[tokio::test]
async fn test_run_twice_withPopulatedCache_shouldMakeNoCallsAndKeepBytes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let first = common::build_controller(
        common::test_config(root),
        &MockTranslator::working(),
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    assert!(!first.run(&["vid".to_string()]).await.has_failures());
    let before = common::snapshot(root)?;

    let translator = MockTranslator::working();
    let engine = MockSpeechEngine::new(SECS_PER_CHAR);
    let second = common::build_controller(common::test_config(root), &translator, &engine, Shutdown::new());
    let report = second.run(&["vid".to_string()]).await;

    assert_eq!(report.succeeded("vid", "en"), Some(&LanguageOutcome::AlreadyDubbed));
    assert_eq!(report.succeeded("vid", "de"), Some(&LanguageOutcome::AlreadyDubbed));
    assert_eq!(translator.calls(), 0);
    assert_eq!(engine.calls(), 0);
    assert_eq!(common::snapshot(root)?, before);
    Ok(())
}

/// Test that a translate-only run is reused by a later dubbing run
#[tokio::test]
async fn test_run_withNoAudioThenAudio_shouldReuseTranslations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let mut config = common::test_config(root);
    config.generate_audio = false;
    let engine = MockSpeechEngine::new(SECS_PER_CHAR);
    let controller = common::build_controller(config, &MockTranslator::working(), &engine, Shutdown::new());

    let report = controller.run(&["vid".to_string()]).await;
    assert_eq!(report.succeeded("vid", "en"), Some(&LanguageOutcome::Translated { units: 3 }));
    assert_eq!(engine.calls(), 0);
    assert!(!root.join("vid/en/vid.en.wav").exists());

    let translator = MockTranslator::working();
    let controller = common::build_controller(
        common::test_config(root),
        &translator,
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    let report = controller.run(&["vid".to_string()]).await;

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(translator.calls(), 0);
    assert!(root.join("vid/en/vid.en.wav").is_file());
    Ok(())
}

/// Test that a language whose translations keep failing is abandoned alone
#[tokio::test]
async fn test_run_withFailingLanguage_shouldIsolateFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let translator = MockTranslator::failing_for("de");
    let controller = common::build_controller(
        common::test_config(root),
        &translator,
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    let report = controller.run(&["vid".to_string()]).await;

    assert!(report.has_failures());
    match report.failed("vid", "de") {
        Some(DubError::TranslationFailed { unit, attempts, .. }) => {
            assert_eq!(*unit, 0);
            assert_eq!(*attempts, 3);
        }
        other => panic!("unexpected failure: {:?}", other),
    }
    assert_eq!(translator.calls_for("de"), 3);

    assert!(matches!(report.succeeded("vid", "en"), Some(LanguageOutcome::Dubbed { .. })));
    assert!(root.join("vid/en/vid.en.wav").is_file());
    assert!(!root.join("vid/de/vid.de.wav").exists());
    Ok(())
}

/// Test that items without a transcript are skipped without failing the batch
#[tokio::test]
async fn test_run_withMissingTranscript_shouldSkipItem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;
    fs::create_dir_all(root.join("empty"))?;

    let controller = common::build_controller(
        common::test_config(root),
        &MockTranslator::working(),
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    let ids = controller.discover_content_ids()?;
    assert_eq!(ids, vec!["empty".to_string(), "vid".to_string()]);

    let report = controller.run(&ids).await;

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(report.skipped_items.len(), 1);
    assert_eq!(report.skipped_items[0].content_id, "empty");
    assert!(matches!(
        report.skipped_items[0].error,
        DubError::TranscriptUnavailable { permanent: false, .. }
    ));
    assert_eq!(report.languages.len(), 2);
    Ok(())
}

/// Test that out-of-order cues fail only their own item
#[tokio::test]
async fn test_run_withMalformedTranscript_shouldFailItemOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "good", "fr", common::SAMPLE_SRT)?;
    common::write_transcript(
        root,
        "bad",
        "fr",
        "1\n00:00:05,000 --> 00:00:06,000\nSecond\n\n2\n00:00:01,000 --> 00:00:02,000\nFirst\n",
    )?;

    let mut config = common::test_config(root);
    config.concurrency.content_items = 2;
    let controller = common::build_controller(
        config,
        &MockTranslator::working(),
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    let report = controller.run(&["bad".to_string(), "good".to_string()]).await;

    assert_eq!(report.failed_items.len(), 1);
    assert_eq!(report.failed_items[0].content_id, "bad");
    assert!(matches!(report.failed_items[0].error, DubError::MalformedInput(_)));
    assert!(root.join("good/en/good.en.wav").is_file());
    Ok(())
}

/// Test that the source language is never dubbed into itself
#[tokio::test]
async fn test_run_withSourceAmongTargets_shouldSkipSourceLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let mut config = common::test_config(root);
    config.target_languages = vec![TargetLanguage::new("fra", 40), TargetLanguage::new("en", 40)];
    let translator = MockTranslator::working();
    let controller = common::build_controller(
        config,
        &translator,
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    let report = controller.run(&["vid".to_string()]).await;

    assert_eq!(report.languages.len(), 1);
    assert_eq!(report.languages[0].language, "en");
    assert_eq!(translator.calls_for("fra"), 0);
    Ok(())
}

/// Test that a triggered shutdown stops items before any work
#[tokio::test]
async fn test_run_withShutdownTriggered_shouldCancelWithoutCalls() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let shutdown = Shutdown::new();
    shutdown.trigger();
    let translator = MockTranslator::working();
    let controller = common::build_controller(
        common::test_config(root),
        &translator,
        &MockSpeechEngine::new(SECS_PER_CHAR),
        shutdown,
    );
    let report = controller.run(&["vid".to_string()]).await;

    assert!(report.has_failures());
    assert!(matches!(report.failed_items[0].error, DubError::Cancelled));
    assert_eq!(translator.calls(), 0);
    Ok(())
}

/// Test that a translate-only run still leaves target-language subtitles
#[tokio::test]
async fn test_run_withNoAudio_shouldWriteTranslatedSubtitles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let mut config = common::test_config(root);
    config.generate_audio = false;
    let controller = common::build_controller(
        config,
        &MockTranslator::working(),
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    assert!(!controller.run(&["vid".to_string()]).await.has_failures());

    let srt = fs::read_to_string(root.join("vid/en/vid.en.srt"))?;
    let subtitles = Transcript::from_srt("vid", "en", &srt)?;

    assert_eq!(subtitles.cues.len(), 3);
    assert!(subtitles.cues.iter().all(|cue| cue.text.starts_with("[en] ")));
    assert!(subtitles.cues[0].text.contains("Bonjour"));
    assert_eq!(subtitles.cues[0].start_secs, 0.0);
    assert!(subtitles.cues.windows(2).all(|pair| pair[0].start_secs < pair[1].start_secs));
    assert!(root.join("vid/de/vid.de.srt").is_file());
    Ok(())
}

/// Test that content ids outside the configured filter are left untouched
#[tokio::test]
async fn test_run_withContentIdFilter_shouldOnlyProcessMatchingItems() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "ep01", "fr", common::SAMPLE_SRT)?;
    common::write_transcript(root, "trailer", "fr", common::SAMPLE_SRT)?;

    let mut config = common::test_config(root);
    config.content_id_filter = Some("^ep".to_string());
    let translator = MockTranslator::working();
    let controller = common::build_controller(
        config,
        &translator,
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );

    let ids = controller.discover_content_ids()?;
    assert_eq!(controller.filter_content_ids(&ids), vec!["ep01".to_string()]);

    let report = controller.run(&ids).await;

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(report.languages.len(), 2);
    assert!(report.languages.iter().all(|r| r.content_id == "ep01"));
    assert_eq!(translator.calls(), 6);
    assert!(root.join("ep01/en/ep01.en.wav").is_file());
    assert!(!root.join("trailer/en").exists());
    Ok(())
}
