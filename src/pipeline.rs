/*!
 * One (content item, target language) run.
 *
 * The pipeline moves every unit of a language through translation, synthesis
 * and alignment, then assembles the final track. The artifact store is read
 * at every stage boundary, so a rerun picks up at the first missing artifact:
 *
 * 1. an existing track ends the run immediately
 * 2. cached translations are reused, missing ones translated, and the
 *    target-language subtitles are written from them
 * 3. units with an aligned clip are replayed into the timeline cursor
 * 4. remaining units are voiced, aligned and stored one at a time
 * 5. clips are concatenated into the track and then deleted
 */

use indicatif::ProgressBar;
use log::{debug, info};
use std::fmt;
use std::sync::Arc;

use crate::alignment::TimelineAligner;
use crate::app_config::{AlignmentConfig, TargetLanguage};
use crate::artifacts::{ArtifactKey, ArtifactStore};
use crate::assembler::TrackAssembler;
use crate::audio::AudioClip;
use crate::errors::DubError;
use crate::segmenter::SegmentationUnit;
use crate::shutdown::Shutdown;
use crate::synthesis::chunker::chunk_text;
use crate::synthesis::{RunContext, SynthesisOrchestrator};
use crate::transcript::{Cue, Transcript};
use crate::translation::BatchTranslator;
use crate::units::TranslatedUnit;

/// How a language run ended
#[derive(Debug, Clone, PartialEq)]
pub enum LanguageOutcome {
    /// The final track was already present
    AlreadyDubbed,

    /// Audio generation is off; only translations were produced
    Translated { units: usize },

    /// A final track was written
    Dubbed {
        units: usize,
        duration_secs: f64,
        drift_secs: f64,
    },
}

impl fmt::Display for LanguageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyDubbed => write!(f, "already dubbed"),
            Self::Translated { units } => write!(f, "translated {} units", units),
            Self::Dubbed { units, duration_secs, drift_secs } => write!(
                f,
                "dubbed {} units, {:.2}s, drift {:+.2}s",
                units, duration_secs, drift_secs
            ),
        }
    }
}

/// Stages shared by every language run of a batch
pub struct LanguagePipeline {
    translator: BatchTranslator,
    orchestrator: SynthesisOrchestrator,
    assembler: TrackAssembler,
    store: Arc<dyn ArtifactStore>,
    alignment: AlignmentConfig,
    generate_audio: bool,
}

impl LanguagePipeline {
    pub fn new(
        translator: BatchTranslator,
        orchestrator: SynthesisOrchestrator,
        store: Arc<dyn ArtifactStore>,
        alignment: AlignmentConfig,
        generate_audio: bool,
    ) -> Self {
        Self {
            translator,
            orchestrator,
            assembler: TrackAssembler::new(store.clone()),
            store,
            alignment,
            generate_audio,
        }
    }

    /// Run one language of one content item
    pub async fn run(
        &self,
        content_id: &str,
        source_language: &str,
        target: &TargetLanguage,
        units: &[SegmentationUnit],
        shutdown: &Shutdown,
        progress: &ProgressBar,
    ) -> Result<LanguageOutcome, DubError> {
        let language = target.code.as_str();

        if self.generate_audio && self.assembler.track_exists(content_id, language).await? {
            info!("Track for {}/{} already exists, skipping", content_id, language);
            return Ok(LanguageOutcome::AlreadyDubbed);
        }

        progress.set_length(units.len() as u64);
        progress.set_position(0);
        progress.set_message(format!("{}/{} translating", content_id, language));

        let bar = progress.clone();
        let translations = self.translator
            .translate_all(content_id, units, source_language, language, shutdown, move |done, _| {
                bar.set_position(done as u64);
            })
            .await?;

        self.write_subtitles(content_id, language, &translations).await?;

        if !self.generate_audio || translations.is_empty() {
            return Ok(LanguageOutcome::Translated { units: translations.len() });
        }

        let ctx = RunContext {
            content_id,
            source_language,
            target_language: language,
        };

        progress.set_position(0);
        progress.set_message(format!("{}/{} voicing", content_id, language));

        let clips = self.voice_and_align(&ctx, target.chunk_chars, translations, shutdown, progress).await?;
        let drift_secs = clips.drift_secs;

        shutdown.check()?;
        let duration_secs = self.assembler.assemble(content_id, language, &clips.clips).await?;

        Ok(LanguageOutcome::Dubbed {
            units: clips.clips.len(),
            duration_secs,
            drift_secs,
        })
    }

    /// Store the translated units as target-language SRT, once
    async fn write_subtitles(
        &self,
        content_id: &str,
        language: &str,
        translations: &[TranslatedUnit],
    ) -> Result<(), DubError> {
        let key = ArtifactKey::subtitles(content_id, language);
        if translations.is_empty()
            || self.store.has(&key).await.map_err(|e| DubError::storage(format!("checking {}", key), e))?
        {
            return Ok(());
        }

        let subtitles = Transcript {
            content_id: content_id.to_string(),
            language: language.to_string(),
            cues: translations
                .iter()
                .map(|t| Cue::new(t.translated_text.as_str(), t.start_secs(), t.original_duration_secs))
                .collect(),
        };

        self.store.put(&key, subtitles.to_srt().as_bytes()).await
            .map_err(|e| DubError::storage(format!("writing {}", key), e))?;
        debug!("Wrote {} subtitles for {}", language, content_id);
        Ok(())
    }

    /// Produce the aligned clip of every unit in index order
    async fn voice_and_align(
        &self,
        ctx: &RunContext<'_>,
        chunk_chars: usize,
        translations: Vec<TranslatedUnit>,
        shutdown: &Shutdown,
        progress: &ProgressBar,
    ) -> Result<AlignedClips, DubError> {
        let mut aligner = TimelineAligner::from_config(&self.alignment);
        let mut clips = Vec::with_capacity(translations.len());

        for translated in translations {
            shutdown.check()?;

            let unit = translated.index();
            let key = ArtifactKey::clip(ctx.content_id, ctx.target_language, unit);
            let existing = self.store.get(&key).await
                .map_err(|e| DubError::storage(format!("reading {}", key), e))?;

            let clip = match existing {
                Some(bytes) => {
                    let clip = AudioClip::from_wav_bytes(&bytes).map_err(|e| DubError::CacheCorruption {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                    debug!("Reusing aligned clip {} ({:.2}s)", key, clip.duration_secs());
                    aligner.record_existing(&translated, clip.duration_secs());

                    // A run may have stopped between storing the clip and dropping its chunks
                    let chunk_count = chunk_text(&translated.translated_text, chunk_chars).len();
                    self.orchestrator.discard_chunks(ctx, unit, chunk_count).await?;
                    clip
                }
                None => {
                    let synthesized = self.orchestrator.synthesize_unit(ctx, translated, chunk_chars).await?;
                    let chunk_count = synthesized.chunk_count;
                    let aligned = aligner.align(synthesized);

                    let bytes = aligned.clip.to_wav_bytes()?;
                    self.store.put(&key, &bytes).await
                        .map_err(|e| DubError::storage(format!("writing {}", key), e))?;
                    self.orchestrator.discard_chunks(ctx, unit, chunk_count).await?;
                    aligned.clip
                }
            };

            clips.push(clip);
            progress.inc(1);
        }

        let cursor = aligner.cursor();
        debug!(
            "Aligned {}/{}: played {:.2}s over {:.2}s of source",
            ctx.content_id, ctx.target_language, cursor.played_secs, cursor.original_secs
        );

        Ok(AlignedClips {
            clips,
            drift_secs: cursor.drift_secs(),
        })
    }
}

struct AlignedClips {
    clips: Vec<AudioClip>,
    drift_secs: f64,
}
