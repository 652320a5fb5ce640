use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::app_config::{Config, TargetLanguage};
use crate::artifacts::{self, ArtifactStore};
use crate::errors::DubError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::pipeline::{LanguageOutcome, LanguagePipeline};
use crate::providers::Translator;
use crate::segmenter::{SegmentationUnit, Segmenter};
use crate::shutdown::Shutdown;
use crate::synthesis::{HttpSpeechEngine, SpeechEngine, SynthesisOrchestrator};
use crate::transcript::{SrtTranscriptSource, TranscriptSource};
use crate::translation::{BatchTranslator, TranslationGateway, TranslationService};

// @module: Batch controller across content items and target languages

/// Result of one (content item, target language) run
#[derive(Debug)]
pub struct LanguageReport {
    pub content_id: String,
    pub language: String,
    pub result: Result<LanguageOutcome, DubError>,
}

/// Why a content item produced no language runs
#[derive(Debug)]
pub struct ItemReport {
    pub content_id: String,
    pub error: DubError,
}

/// Everything a batch did
#[derive(Debug, Default)]
pub struct BatchReport {
    pub languages: Vec<LanguageReport>,
    pub skipped_items: Vec<ItemReport>,
    pub failed_items: Vec<ItemReport>,
}

impl BatchReport {
    /// Language runs that ended in an error
    pub fn failed_languages(&self) -> impl Iterator<Item = &LanguageReport> {
        self.languages.iter().filter(|report| report.result.is_err())
    }

    /// Whether the batch should exit with a failure status
    pub fn has_failures(&self) -> bool {
        !self.failed_items.is_empty() || self.failed_languages().next().is_some()
    }

    fn outcome(&self, content_id: &str, language: &str) -> Option<&Result<LanguageOutcome, DubError>> {
        self.languages
            .iter()
            .find(|r| r.content_id == content_id && r.language == language)
            .map(|r| &r.result)
    }

    /// Outcome of one language run, if it was attempted and succeeded
    pub fn succeeded(&self, content_id: &str, language: &str) -> Option<&LanguageOutcome> {
        self.outcome(content_id, language).and_then(|r| r.as_ref().ok())
    }

    /// Error of one language run, if it was attempted and failed
    pub fn failed(&self, content_id: &str, language: &str) -> Option<&DubError> {
        self.outcome(content_id, language).and_then(|r| r.as_ref().err())
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failed_languages().count();
        write!(
            f,
            "{} language run(s), {} failed; {} item(s) skipped, {} item(s) failed",
            self.languages.len(),
            failed,
            self.skipped_items.len(),
            self.failed_items.len()
        )
    }
}

/// Content item outcome before it is merged into the batch report
enum ItemResult {
    Languages(Vec<LanguageReport>),
    Skipped(ItemReport),
    Failed(ItemReport),
}

/// Main application controller
pub struct Controller {
    config: Config,
    content_filter: Option<Regex>,
    transcripts: Arc<dyn TranscriptSource>,
    pipeline: LanguagePipeline,
    shutdown: Shutdown,
    multi_progress: MultiProgress,
}

impl Controller {
    /// Build a controller with the configured translation provider, speech
    /// engine, transcript directory and artifact store
    pub fn with_config(config: Config, shutdown: Shutdown) -> Result<Self> {
        let translator: Arc<dyn Translator> = Arc::new(
            TranslationService::new(config.translation.clone())
                .context("Failed to create translation service")?,
        );
        let engine: Arc<dyn SpeechEngine> = Arc::new(HttpSpeechEngine::new(&config.synthesis));
        let transcripts: Arc<dyn TranscriptSource> = Arc::new(SrtTranscriptSource::new(&config.root_dir));
        let store = artifacts::open_store(&config.cache, &config.root_dir)
            .context("Failed to open artifact store")?;

        Ok(Self::with_components(config, translator, engine, transcripts, store, shutdown))
    }

    /// Build a controller from explicit components
    pub fn with_components(
        config: Config,
        translator: Arc<dyn Translator>,
        engine: Arc<dyn SpeechEngine>,
        transcripts: Arc<dyn TranscriptSource>,
        store: Arc<dyn ArtifactStore>,
        shutdown: Shutdown,
    ) -> Self {
        let gateway = Arc::new(TranslationGateway::from_config(translator, &config.translation));
        let batch = BatchTranslator::new(gateway, store.clone(), config.translation.common.concurrent_requests);

        let permits = Arc::new(Semaphore::new(config.synthesis.concurrent_requests.max(1)));
        let orchestrator = SynthesisOrchestrator::new(engine, store.clone(), permits, config.synthesis.clone());

        let pipeline = LanguagePipeline::new(
            batch,
            orchestrator,
            store,
            config.alignment.clone(),
            config.generate_audio,
        );

        let content_filter = config.content_id_pattern().unwrap_or_else(|e| {
            warn!("Ignoring content id filter: {:#}", e);
            None
        });

        Self {
            config,
            content_filter,
            transcripts,
            pipeline,
            shutdown,
            multi_progress: MultiProgress::new(),
        }
    }

    /// Hide progress bars, for tests and non-interactive runs
    pub fn without_progress(mut self) -> Self {
        self.multi_progress = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Content items found as subdirectories of the root directory
    pub fn discover_content_ids(&self) -> Result<Vec<String>> {
        FileManager::list_subdirs(&self.config.root_dir)
            .with_context(|| format!("Failed to list content items in {}", self.config.root_dir.display()))
    }

    /// Content ids accepted by the configured filter, in input order
    pub fn filter_content_ids(&self, content_ids: &[String]) -> Vec<String> {
        let Some(filter) = &self.content_filter else {
            return content_ids.to_vec();
        };

        content_ids
            .iter()
            .filter(|id| {
                let keep = filter.is_match(id);
                if !keep {
                    warn!("Skipping {}: it does not match the content id filter {}", id, filter);
                }
                keep
            })
            .cloned()
            .collect()
    }

    /// Dub every content item into every configured target language
    ///
    /// Failures are isolated: a language failure never stops other
    /// languages, an item failure never stops other items.
    pub async fn run(&self, content_ids: &[String]) -> BatchReport {
        let start_time = Instant::now();
        let content_ids = self.filter_content_ids(content_ids);
        let items_bar = self.multi_progress.add(ProgressBar::new(content_ids.len() as u64));
        items_bar.set_style(bar_style("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items"));

        let results: Vec<ItemResult> = stream::iter(&content_ids)
            .map(|content_id| {
                let items_bar = items_bar.clone();
                async move {
                    let result = self.run_item(content_id).await;
                    items_bar.inc(1);
                    result
                }
            })
            .buffer_unordered(self.config.concurrency.content_items.max(1))
            .collect()
            .await;

        items_bar.finish_and_clear();

        let mut report = BatchReport::default();
        for result in results {
            match result {
                ItemResult::Languages(languages) => report.languages.extend(languages),
                ItemResult::Skipped(item) => report.skipped_items.push(item),
                ItemResult::Failed(item) => report.failed_items.push(item),
            }
        }
        report.languages.sort_by(|a, b| (&a.content_id, &a.language).cmp(&(&b.content_id, &b.language)));

        info!("Batch finished in {:.1}s: {}", start_time.elapsed().as_secs_f64(), report);
        report
    }

    async fn run_item(&self, content_id: &str) -> ItemResult {
        let item_error = |error: DubError| ItemReport {
            content_id: content_id.to_string(),
            error,
        };

        if let Err(e) = self.shutdown.check() {
            return ItemResult::Failed(item_error(e));
        }

        let transcript = match self.transcripts.fetch(content_id, &self.config.source_languages).await {
            Ok(transcript) => transcript,
            Err(e) => {
                return match DubError::from(e) {
                    error @ DubError::TranscriptUnavailable { .. } => {
                        warn!("Skipping {}: {}", content_id, error);
                        ItemResult::Skipped(item_error(error))
                    }
                    error => {
                        error!("Cannot process {}: {}", content_id, error);
                        ItemResult::Failed(item_error(error))
                    }
                };
            }
        };

        let segmenter = Segmenter::from_config(&self.config.segmentation);
        let units = match segmenter.segment(&transcript.cues) {
            Ok(units) => units,
            Err(e) => {
                error!("Cannot process {}: {}", content_id, e);
                return ItemResult::Failed(item_error(e));
            }
        };

        info!(
            "{}: {} cues in {} merged into {} units",
            content_id,
            transcript.cues.len(),
            transcript.language,
            units.len()
        );

        let targets: Vec<&TargetLanguage> = self.config.target_languages
            .iter()
            .filter(|target| {
                let same = language_utils::language_codes_match(&target.code, &transcript.language);
                if same {
                    info!("{}: skipping {}, it is the source language", content_id, target.code);
                }
                !same
            })
            .collect();

        let source_language = transcript.language.as_str();
        let units = units.as_slice();

        let reports = stream::iter(targets)
            .map(|target| self.run_language(content_id, source_language, target, units))
            .buffer_unordered(self.config.concurrency.languages.max(1))
            .collect()
            .await;

        ItemResult::Languages(reports)
    }

    async fn run_language(
        &self,
        content_id: &str,
        source_language: &str,
        target: &TargetLanguage,
        units: &[SegmentationUnit],
    ) -> LanguageReport {
        let progress = self.multi_progress.add(ProgressBar::new(units.len() as u64));
        progress.set_style(bar_style("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}"));

        let result = self.pipeline
            .run(content_id, source_language, target, units, &self.shutdown, &progress)
            .await;

        progress.finish_and_clear();

        match &result {
            Ok(outcome) => info!("{}/{}: {}", content_id, target.code, outcome),
            Err(e) => error!("{}/{} failed: {}", content_id, target.code, e),
        }

        LanguageReport {
            content_id: content_id.to_string(),
            language: target.code.clone(),
            result,
        }
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}
