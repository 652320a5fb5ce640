/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;

use cuedub::app_config::{AlignmentPolicy, CacheBackend, Config, LogLevel, TargetLanguage, TranslationProvider};

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_languages, vec!["fr".to_string(), "en".to_string()]);
    assert_eq!(config.target_language("es"), Some(&TargetLanguage::new("es", 239)));
    assert!(config.generate_audio);
    assert_eq!(config.segmentation.max_unit_duration_secs, 6.0);
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.common.max_attempts, 3);
    assert_eq!(config.alignment.policy, AlignmentPolicy::SlotDeficit);
    assert_eq!(config.cache.backend, CacheBackend::Filesystem);
    assert_eq!(config.concurrency.content_items, 1);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test content id filter compilation
#[test]
fn test_content_id_pattern_withFilter_shouldCompileOrReject() {
    let mut config = Config::default();
    assert!(config.content_id_pattern().unwrap().is_none());

    config.content_id_filter = Some("^ep".to_string());
    let pattern = config.content_id_pattern().unwrap().unwrap();
    assert!(pattern.is_match("ep01"));
    assert!(!pattern.is_match("trailer"));

    config.content_id_filter = Some("(unclosed".to_string());
    assert!(config.validate().is_err());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    config.target_languages.push(TargetLanguage::new("zz", 100));
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.target_languages[0].chunk_chars = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.segmentation.max_unit_duration_secs = 0.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.common.retry_backoff_min_ms = 20_000;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.alignment.damping = 1.5;
    assert!(config.validate().is_err());

    // Hosted providers need an API key
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::OpenAI;
    assert!(config.validate().is_err());
    if let Some(provider) = config.translation.available_providers
        .iter_mut()
        .find(|p| p.provider_type == "openai")
    {
        provider.api_key = "sk-1234567890".to_string();
    }
    assert!(config.validate().is_ok());
}

/// Test that a missing file is created with defaults and read back unchanged
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let (created, was_created) = Config::load_or_create(&path)?;
    assert!(was_created);
    assert!(path.is_file());

    let (loaded, was_created) = Config::load_or_create(&path)?;
    assert!(!was_created);
    assert_eq!(loaded.target_languages, created.target_languages);
    assert_eq!(loaded.synthesis.endpoint, created.synthesis.endpoint);
    Ok(())
}

/// Test that a partial file keeps defaults for missing fields
#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{"target_languages": [{"code": "it"}], "alignment": {"policy": "absolute_timeline"}}"#,
    )?;

    let (config, _) = Config::load_or_create(&path)?;
    assert_eq!(config.target_languages, vec![TargetLanguage::with_default_budget("it")]);
    assert_eq!(config.alignment.policy, AlignmentPolicy::AbsoluteTimeline);
    assert_eq!(config.alignment.damping, 0.9);
    assert_eq!(config.segmentation.max_unit_chars, 200);
    Ok(())
}

/// Test system prompt placeholders are filled with language names
#[test]
fn test_system_prompt_for_withCodes_shouldUseLanguageNames() {
    let config = Config::default();
    let prompt = config.translation.system_prompt_for("fr", "de");
    assert!(prompt.contains("French"));
    assert!(prompt.contains("German"));
}
