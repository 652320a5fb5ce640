use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Directory holding one sub-directory per content item
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Source transcript languages, in order of preference
    #[serde(default = "default_source_languages")]
    pub source_languages: Vec<String>,

    /// Only content ids matching this regex are processed
    #[serde(default)]
    pub content_id_filter: Option<String>,

    /// Languages to dub into, each with its synthesis chunk budget
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<TargetLanguage>,

    /// Stop after translation when false
    #[serde(default = "default_true")]
    pub generate_audio: bool,

    /// Cue merging ceilings
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Speech synthesis config
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Timeline alignment config
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Artifact cache config
    #[serde(default)]
    pub cache: CacheConfig,

    /// Parallelism across content items and languages
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Optional log file name pattern (chrono format specifiers are expanded)
    #[serde(default)]
    pub log_file: Option<String>,
}

/// A language to dub into
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TargetLanguage {
    /// Language code passed to translator and speech engine
    pub code: String,

    /// Maximum characters per synthesis request for this language
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
}

impl TargetLanguage {
    pub fn new(code: impl Into<String>, chunk_chars: usize) -> Self {
        Self {
            code: code.into(),
            chunk_chars,
        }
    }

    /// Target using the default chunk budget
    pub fn with_default_budget(code: impl Into<String>) -> Self {
        Self::new(code, default_chunk_chars())
    }
}

/// Ceilings used when merging cues into units
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationConfig {
    /// Soft ceiling on a unit's summed cue duration
    #[serde(default = "default_max_unit_duration_secs")]
    pub max_unit_duration_secs: f64,

    /// Soft ceiling on a unit's text length in characters
    #[serde(default = "default_max_unit_chars")]
    pub max_unit_chars: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_unit_duration_secs: default_max_unit_duration_secs(),
            max_unit_chars: default_max_unit_chars(),
        }
    }
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        let (model, endpoint) = match provider_type {
            TranslationProvider::Ollama => (default_ollama_model(), default_ollama_endpoint()),
            TranslationProvider::OpenAI => (default_openai_model(), default_openai_endpoint()),
            TranslationProvider::Anthropic => (default_anthropic_model(), default_anthropic_endpoint()),
            TranslationProvider::LMStudio => (default_lmstudio_model(), default_lmstudio_endpoint()),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,

    /// Source languages whose digit-only cues are spelled out before translation
    #[serde(default = "default_spell_out_numbers_for")]
    pub spell_out_numbers_for: Vec<String>,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Attempts per unit before the language is abandoned
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lower bound of the randomized wait after a failed attempt
    #[serde(default = "default_retry_backoff_min_ms")]
    pub retry_backoff_min_ms: u64,

    /// Upper bound of the randomized wait after a failed attempt
    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,

    /// Upper bound of the randomized pause after a successful call
    #[serde(default = "default_pacing_max_ms")]
    pub pacing_max_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Units translated concurrently within one language
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_attempts: default_max_attempts(),
            retry_backoff_min_ms: default_retry_backoff_min_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
            pacing_max_ms: default_pacing_max_ms(),
            temperature: default_temperature(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// Speech engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    /// TTS server URL
    #[serde(default = "default_synthesis_endpoint")]
    pub endpoint: String,

    /// Model identifier forwarded to the server
    #[serde(default = "default_synthesis_model")]
    pub model: String,

    /// Device hint forwarded to the server ("cuda", "cpu", ...)
    #[serde(default = "default_device")]
    pub device: String,

    /// Directory holding `sample.<source language>.wav` voice references
    #[serde(default = "default_voice_samples_dir")]
    pub voice_samples_dir: PathBuf,

    /// Speaking rate multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Sampling temperature of the speech model
    #[serde(default = "default_synthesis_temperature")]
    pub temperature: f32,

    /// Attempts per chunk; 1 disables chunk-level retry
    #[serde(default = "default_synthesis_max_attempts")]
    pub max_attempts: u32,

    /// Pause between chunk attempts
    #[serde(default = "default_synthesis_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_synthesis_timeout_secs")]
    pub timeout_secs: u64,

    /// Engine calls allowed in flight across all runs
    #[serde(default = "default_synthesis_concurrency")]
    pub concurrent_requests: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_synthesis_endpoint(),
            model: default_synthesis_model(),
            device: default_device(),
            voice_samples_dir: default_voice_samples_dir(),
            speed: default_speed(),
            temperature: default_synthesis_temperature(),
            max_attempts: default_synthesis_max_attempts(),
            retry_delay_ms: default_synthesis_retry_delay_ms(),
            timeout_secs: default_synthesis_timeout_secs(),
            concurrent_requests: default_synthesis_concurrency(),
        }
    }
}

impl SynthesisConfig {
    /// Voice reference used when dubbing from `source_language`
    pub fn voice_sample_for(&self, source_language: &str) -> PathBuf {
        self.voice_samples_dir.join(format!("sample.{}.wav", source_language))
    }
}

/// Padding policy of the timeline aligner
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Compare each clip with its own cue duration and carry overage forward
    #[default]
    SlotDeficit,
    /// Compare the running cursor with each unit's absolute start offset
    AbsoluteTimeline,
}

/// Timeline alignment configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlignmentConfig {
    #[serde(default)]
    pub policy: AlignmentPolicy,

    /// Fraction of the gap corrected per unit (absolute-timeline policy only)
    #[serde(default = "default_damping")]
    pub damping: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            policy: AlignmentPolicy::default(),
            damping: default_damping(),
        }
    }
}

/// Artifact cache backend
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Files under the translations root
    #[default]
    Filesystem,
    /// A single SQLite database
    Sqlite,
}

/// Artifact cache configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Database path for the sqlite backend; defaults to the user data dir
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

/// Parallelism across independent work
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConcurrencyConfig {
    /// Content items processed at the same time
    #[serde(default = "default_one")]
    pub content_items: usize,

    /// Target languages of one item processed at the same time
    #[serde(default = "default_one")]
    pub languages: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            content_items: 1,
            languages: 1,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("translations")
}

fn default_source_languages() -> Vec<String> {
    vec!["fr".to_string(), "en".to_string()]
}

fn default_target_languages() -> Vec<TargetLanguage> {
    vec![
        TargetLanguage::new("en", 250),
        TargetLanguage::new("es", 239),
        TargetLanguage::new("de", 253),
    ]
}

fn default_chunk_chars() -> usize {
    250
}

fn default_max_unit_duration_secs() -> f64 {
    6.0
}

fn default_max_unit_chars() -> usize {
    200
}

fn default_spell_out_numbers_for() -> Vec<String> {
    vec!["cs".to_string(), "hi".to_string()]
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_min_ms() -> u64 {
    5_000
}

fn default_retry_backoff_max_ms() -> u64 {
    15_000
}

fn default_pacing_max_ms() -> u64 {
    1_000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_one() -> usize {
    1
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional translator. Translate the following spoken transcript text from {source_language} to {target_language}. Reply with the translation only, on a single line.".to_string()
}

fn default_synthesis_endpoint() -> String {
    "http://localhost:5002".to_string()
}

fn default_synthesis_model() -> String {
    "tts_models/multilingual/multi-dataset/xtts_v2".to_string()
}

fn default_device() -> String {
    "cuda".to_string()
}

fn default_voice_samples_dir() -> PathBuf {
    PathBuf::from("Samples")
}

fn default_speed() -> f32 {
    1.05
}

fn default_synthesis_temperature() -> f32 {
    0.81
}

fn default_synthesis_max_attempts() -> u32 {
    2
}

fn default_synthesis_retry_delay_ms() -> u64 {
    2_000
}

fn default_synthesis_timeout_secs() -> u64 {
    300
}

fn default_synthesis_concurrency() -> usize {
    1
}

fn default_damping() -> f64 {
    0.9
}

impl Config {
    /// Load configuration from a JSON file, writing defaults if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok((config, false));
        }

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;

        Ok((config, true))
    }

    /// Validate the configuration for consistency and required values
    /// Compiled `content_id_filter`, if one is set
    pub fn content_id_pattern(&self) -> Result<Option<Regex>> {
        self.content_id_filter
            .as_deref()
            .map(|pattern| Regex::new(pattern).with_context(|| format!("Invalid content_id_filter: {}", pattern)))
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        self.content_id_pattern()?;

        if self.source_languages.is_empty() {
            return Err(anyhow!("At least one source language is required"));
        }
        for code in &self.source_languages {
            crate::language_utils::get_language_name(code)
                .with_context(|| format!("Invalid source language: {}", code))?;
        }

        if self.target_languages.is_empty() {
            return Err(anyhow!("At least one target language is required"));
        }
        for target in &self.target_languages {
            crate::language_utils::get_language_name(&target.code)
                .with_context(|| format!("Invalid target language: {}", target.code))?;
            if target.chunk_chars == 0 {
                return Err(anyhow!("chunk_chars must be positive for {}", target.code));
            }
        }

        if !(self.segmentation.max_unit_duration_secs.is_finite() && self.segmentation.max_unit_duration_secs > 0.0) {
            return Err(anyhow!("max_unit_duration_secs must be a positive number"));
        }
        if self.segmentation.max_unit_chars == 0 {
            return Err(anyhow!("max_unit_chars must be positive"));
        }

        let common = &self.translation.common;
        if common.max_attempts == 0 {
            return Err(anyhow!("translation max_attempts must be at least 1"));
        }
        if common.retry_backoff_min_ms > common.retry_backoff_max_ms {
            return Err(anyhow!("retry_backoff_min_ms must not exceed retry_backoff_max_ms"));
        }
        if self.synthesis.max_attempts == 0 {
            return Err(anyhow!("synthesis max_attempts must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.alignment.damping) {
            return Err(anyhow!("alignment damping must be within 0.0..=1.0"));
        }

        // Validate API key for hosted providers
        match self.translation.provider {
            TranslationProvider::OpenAI | TranslationProvider::Anthropic => {
                if self.translation.get_api_key().is_empty() {
                    return Err(anyhow!(
                        "Translation API key is required for {} provider",
                        self.translation.provider.display_name()
                    ));
                }
            },
            _ => {}
        }

        Ok(())
    }

    /// Target language entry for a code
    pub fn target_language(&self, code: &str) -> Option<&TargetLanguage> {
        self.target_languages.iter().find(|t| t.code == code)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            root_dir: default_root_dir(),
            source_languages: default_source_languages(),
            content_id_filter: None,
            target_languages: default_target_languages(),
            generate_audio: true,
            segmentation: SegmentationConfig::default(),
            translation: TranslationConfig::default(),
            synthesis: SynthesisConfig::default(),
            alignment: AlignmentConfig::default(),
            cache: CacheConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            log_level: LogLevel::default(),
            log_file: None,
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::Ollama => default_ollama_model(),
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::Ollama => default_ollama_endpoint(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Render the system prompt for a language pair
    pub fn system_prompt_for(&self, source_language: &str, target_language: &str) -> String {
        let source_name = crate::language_utils::get_language_name(source_language)
            .unwrap_or_else(|_| source_language.to_string());
        let target_name = crate::language_utils::get_language_name(target_language)
            .unwrap_or_else(|_| target_language.to_string());

        self.common.system_prompt
            .replace("{source_language}", &source_name)
            .replace("{target_language}", &target_name)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
            spell_out_numbers_for: default_spell_out_numbers_for(),
        }
    }
}
