/*!
 * Resuming interrupted runs from cached artifacts
 */

use anyhow::Result;
use std::fs;
use std::path::Path;

use cuedub::app_config::{AlignmentPolicy, Config, TargetLanguage};
use cuedub::audio::AudioClip;
use cuedub::errors::DubError;
use cuedub::providers::mock::{MockSpeechEngine, MockTranslator};
use cuedub::shutdown::Shutdown;

use crate::common;

const SECS_PER_CHAR: f64 = 0.08;

fn english_only(root: &Path) -> Config {
    let mut config = common::test_config(root);
    config.target_languages = vec![TargetLanguage::new("en", 40)];
    config
}

fn track_duration(root: &Path) -> Result<f64> {
    let bytes = fs::read(root.join("vid/en/vid.en.wav"))?;
    Ok(AudioClip::from_wav_bytes(&bytes)?.duration_secs())
}

fn with_policy(root: &Path, policy: AlignmentPolicy) -> Config {
    let mut config = english_only(root);
    config.alignment.policy = policy;
    config
}

/// Engine calls and track duration of an uninterrupted run
async fn fresh_run() -> Result<(usize, f64)> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let engine = MockSpeechEngine::new(SECS_PER_CHAR);
    let controller = common::build_controller(english_only(root), &MockTranslator::working(), &engine, Shutdown::new());
    let report = controller.run(&["vid".to_string()]).await;
    assert!(!report.has_failures(), "{}", report);

    Ok((engine.calls(), track_duration(root)?))
}

/// Run until the engine dies on the second chunk of unit 1
async fn interrupted_run(config: Config) {
    let failing = MockSpeechEngine::new(SECS_PER_CHAR).failing_after(3);
    let controller = common::build_controller(config, &MockTranslator::working(), &failing, Shutdown::new());
    let report = controller.run(&["vid".to_string()]).await;
    assert!(matches!(report.failed("vid", "en"), Some(DubError::SynthesisFailed { unit: 1, .. })));
}

/// Test that a run interrupted by engine failures resumes at the next missing chunk
#[tokio::test]
async fn test_run_afterSynthesisFailure_shouldResumeFromCachedArtifacts() -> Result<()> {
    let (fresh_calls, fresh_duration) = fresh_run().await?;

    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    // Unit 0 has two chunks; the engine dies on the second chunk of unit 1
    let failing = MockSpeechEngine::new(SECS_PER_CHAR).failing_after(3);
    let controller = common::build_controller(english_only(root), &MockTranslator::working(), &failing, Shutdown::new());
    let report = controller.run(&["vid".to_string()]).await;

    assert!(matches!(report.failed("vid", "en"), Some(DubError::SynthesisFailed { unit: 1, .. })));
    let files = common::language_files(root, "vid", "en");
    assert!(files.contains(&"vid.0.en.wav".to_string()), "{:?}", files);
    assert!(files.contains(&"vid.1-0.en.wav".to_string()), "{:?}", files);
    assert!(!files.contains(&"vid.0-0.en.wav".to_string()), "{:?}", files);

    let translator = MockTranslator::working();
    let engine = MockSpeechEngine::new(SECS_PER_CHAR);
    let controller = common::build_controller(english_only(root), &translator, &engine, Shutdown::new());
    let report = controller.run(&["vid".to_string()]).await;

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(translator.calls(), 0);
    assert_eq!(engine.calls(), fresh_calls - 3);
    assert!((track_duration(root)? - fresh_duration).abs() < 0.01);
    assert_eq!(
        common::language_files(root, "vid", "en"),
        vec!["vid.0.en.json", "vid.1.en.json", "vid.2.en.json", "vid.en.srt", "vid.en.wav"]
    );
    Ok(())
}

/// Test that an undecodable cached clip is surfaced as corruption
#[tokio::test]
async fn test_run_withCorruptUnitClip_shouldReportCacheCorruption() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    let mut config = english_only(root);
    config.generate_audio = false;
    let controller = common::build_controller(config, &MockTranslator::working(), &MockSpeechEngine::new(SECS_PER_CHAR), Shutdown::new());
    assert!(!controller.run(&["vid".to_string()]).await.has_failures());

    fs::write(root.join("vid/en/vid.0.en.wav"), b"not audio")?;

    let engine = MockSpeechEngine::new(SECS_PER_CHAR);
    let controller = common::build_controller(english_only(root), &MockTranslator::working(), &engine, Shutdown::new());
    let report = controller.run(&["vid".to_string()]).await;

    assert!(matches!(report.failed("vid", "en"), Some(DubError::CacheCorruption { .. })));
    assert_eq!(engine.calls(), 0);
    // The corrupt entry is left for manual inspection
    assert!(root.join("vid/en/vid.0.en.wav").is_file());
    Ok(())
}

/// Test that chunk audio left behind next to a stored unit clip is removed on resume
#[tokio::test]
async fn test_run_withLeftoverChunksOfStoredClip_shouldRemoveThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::write_transcript(root, "vid", "fr", common::SAMPLE_SRT)?;

    interrupted_run(english_only(root)).await;

    // Stopped after storing the clip of unit 0 but before dropping its chunks
    let leftover = AudioClip::silence(0.5, 1, 16_000).to_wav_bytes()?;
    fs::write(root.join("vid/en/vid.0-0.en.wav"), &leftover)?;
    fs::write(root.join("vid/en/vid.0-1.en.wav"), &leftover)?;

    let controller = common::build_controller(
        english_only(root),
        &MockTranslator::working(),
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    let report = controller.run(&["vid".to_string()]).await;

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(
        common::language_files(root, "vid", "en"),
        vec!["vid.0.en.json", "vid.1.en.json", "vid.2.en.json", "vid.en.srt", "vid.en.wav"]
    );
    Ok(())
}

/// Test that a resumed absolute-timeline run writes the same track as an uninterrupted one
#[tokio::test]
async fn test_run_withAbsoluteTimelineAfterFailure_shouldMatchUninterruptedTrack() -> Result<()> {
    let fresh_dir = common::create_temp_dir()?;
    let fresh_root = fresh_dir.path();
    common::write_transcript(fresh_root, "vid", "fr", common::SAMPLE_SRT)?;

    let controller = common::build_controller(
        with_policy(fresh_root, AlignmentPolicy::AbsoluteTimeline),
        &MockTranslator::working(),
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    assert!(!controller.run(&["vid".to_string()]).await.has_failures());

    let resumed_dir = common::create_temp_dir()?;
    let resumed_root = resumed_dir.path();
    common::write_transcript(resumed_root, "vid", "fr", common::SAMPLE_SRT)?;

    interrupted_run(with_policy(resumed_root, AlignmentPolicy::AbsoluteTimeline)).await;
    let controller = common::build_controller(
        with_policy(resumed_root, AlignmentPolicy::AbsoluteTimeline),
        &MockTranslator::working(),
        &MockSpeechEngine::new(SECS_PER_CHAR),
        Shutdown::new(),
    );
    assert!(!controller.run(&["vid".to_string()]).await.has_failures());

    let fresh_track = fs::read(fresh_root.join("vid/en/vid.en.wav"))?;
    let resumed_track = fs::read(resumed_root.join("vid/en/vid.en.wav"))?;
    assert_eq!(fresh_track, resumed_track);
    // Speech runs past several cue starts, so the track is shorter than the source
    assert!(track_duration(resumed_root)? < 15.0);
    Ok(())
}
