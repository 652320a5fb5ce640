use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::TranscriptError;
use crate::file_utils::FileManager;
use crate::language_utils;

// @module: Timed transcripts, SRT persistence and transcript sources

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

// @struct: One timed transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    // @field: Spoken text, single line
    pub text: String,

    // @field: Offset from the start of the content
    pub start_secs: f64,

    // @field: How long the cue stays on screen
    pub duration_secs: f64,
}

impl Cue {
    pub fn new(text: impl Into<String>, start_secs: f64, duration_secs: f64) -> Self {
        Self {
            text: text.into(),
            start_secs,
            duration_secs,
        }
    }

    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

/// Source-language transcript of one content item
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub content_id: String,
    pub language: String,
    pub cues: Vec<Cue>,
}

impl Transcript {
    /// Parse SRT content. Multi-line cue text is joined with single spaces;
    /// cues keep their file order.
    pub fn from_srt(content_id: &str, language: &str, content: &str) -> Result<Self> {
        let mut cues = Vec::new();
        let mut timing: Option<(f64, f64)> = None;
        let mut text_lines: Vec<&str> = Vec::new();
        let mut expect_index = true;

        let mut flush = |timing: &mut Option<(f64, f64)>, text_lines: &mut Vec<&str>| {
            if let Some((start, end)) = timing.take() {
                let text = text_lines.join(" ");
                if text.trim().is_empty() {
                    warn!("Skipping empty cue at {:.3}s in {}", start, content_id);
                } else {
                    cues.push(Cue::new(text, start, (end - start).max(0.0)));
                }
            }
            text_lines.clear();
        };

        for (line_number, line) in content.lines().enumerate() {
            let trimmed = line.trim().trim_start_matches('\u{feff}');

            if trimmed.is_empty() {
                flush(&mut timing, &mut text_lines);
                expect_index = true;
                continue;
            }

            if expect_index && timing.is_none() && trimmed.parse::<usize>().is_ok() {
                expect_index = false;
                continue;
            }

            if timing.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    let start = Self::captured_seconds(&caps, 1);
                    let end = Self::captured_seconds(&caps, 5);
                    timing = Some((start, end));
                    expect_index = false;
                    continue;
                }
                warn!("Unexpected text at line {} of {} transcript: {}", line_number + 1, content_id, trimmed);
                continue;
            }

            text_lines.push(trimmed);
        }
        flush(&mut timing, &mut text_lines);

        if cues.is_empty() {
            return Err(anyhow!("No cues found in SRT content for {}", content_id));
        }

        debug!("Parsed {} cues for {} ({})", cues.len(), content_id, language);

        Ok(Self {
            content_id: content_id.to_string(),
            language: language.to_string(),
            cues,
        })
    }

    /// Render the transcript as SRT
    pub fn to_srt(&self) -> String {
        let mut out = String::new();
        for (idx, cue) in self.cues.iter().enumerate() {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                idx + 1,
                format_timestamp(cue.start_secs),
                format_timestamp(cue.end_secs()),
                cue.text
            ));
        }
        out
    }

    fn captured_seconds(caps: &regex::Captures, start_idx: usize) -> f64 {
        let part = |i: usize| -> u64 {
            caps.get(start_idx + i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        let millis = (part(0) * 3600 + part(1) * 60 + part(2)) * 1000 + part(3);
        millis as f64 / 1000.0
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}] ({} cues)", self.content_id, self.language, self.cues.len())
    }
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Where transcripts come from
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript of `content_id` in the first available language of
    /// `preferred_languages`
    async fn fetch(&self, content_id: &str, preferred_languages: &[String]) -> Result<Transcript, TranscriptError>;
}

/// Reads `<root>/<id>/<id>.<lang>.srt` files
pub struct SrtTranscriptSource {
    root: PathBuf,
}

impl SrtTranscriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the cached transcript for a content item and language
    pub fn transcript_path(&self, content_id: &str, language: &str) -> PathBuf {
        self.root.join(content_id).join(format!("{}.{}.srt", content_id, language))
    }

    /// Language segment of `<id>.<lang>.srt`
    fn language_of(path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_string_lossy().to_string();
        stem.rsplit('.').next().map(|s| s.to_string())
    }

    /// Pick the transcript file to use: a single existing file wins, otherwise
    /// the first preferred language that has one
    fn select(&self, content_id: &str, preferred_languages: &[String]) -> Result<Option<(PathBuf, String)>> {
        let dir = self.root.join(content_id);
        let candidates = FileManager::find_files(&dir, &format!("{}.", content_id), "srt")?;

        if candidates.len() == 1 {
            let path = candidates[0].clone();
            if let Some(language) = Self::language_of(&path) {
                return Ok(Some((path, language)));
            }
        }

        for preferred in preferred_languages {
            for path in &candidates {
                if let Some(language) = Self::language_of(path) {
                    if language_utils::language_codes_match(&language, preferred) || &language == preferred {
                        return Ok(Some((path.clone(), language)));
                    }
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl TranscriptSource for SrtTranscriptSource {
    async fn fetch(&self, content_id: &str, preferred_languages: &[String]) -> Result<Transcript, TranscriptError> {
        let unavailable = |reason: String| TranscriptError::Unavailable {
            content_id: content_id.to_string(),
            reason,
        };

        let (path, language) = self.select(content_id, preferred_languages)
            .map_err(|e| unavailable(format!("{:#}", e)))?
            .ok_or_else(|| unavailable(format!(
                "no transcript in {:?} for languages [{}]",
                self.root.join(content_id),
                preferred_languages.join(", ")
            )))?;

        let content = FileManager::read_to_string(&path)
            .map_err(|e| unavailable(format!("{:#}", e)))?;

        Transcript::from_srt(content_id, &language, &content)
            .map_err(|e| TranscriptError::Malformed {
                content_id: content_id.to_string(),
                reason: format!("{:#}", e),
            })
    }
}

/// Keeps a local SRT copy of whatever an upstream source returns
///
/// The local copy is consulted first, so an upstream fetch happens at most
/// once per content item.
pub struct CachingTranscriptSource<S: TranscriptSource> {
    local: SrtTranscriptSource,
    upstream: S,
}

impl<S: TranscriptSource> CachingTranscriptSource<S> {
    pub fn new(root: impl Into<PathBuf>, upstream: S) -> Self {
        Self {
            local: SrtTranscriptSource::new(root),
            upstream,
        }
    }
}

#[async_trait]
impl<S: TranscriptSource> TranscriptSource for CachingTranscriptSource<S> {
    async fn fetch(&self, content_id: &str, preferred_languages: &[String]) -> Result<Transcript, TranscriptError> {
        match self.local.fetch(content_id, preferred_languages).await {
            Ok(transcript) => {
                debug!("Transcript already cached for {} ({})", content_id, transcript.language);
                return Ok(transcript);
            }
            Err(TranscriptError::Unavailable { .. }) => {}
            Err(e) => return Err(e),
        }

        let transcript = self.upstream.fetch(content_id, preferred_languages).await?;
        let path = self.local.transcript_path(content_id, &transcript.language);
        if let Err(e) = FileManager::write_atomic(&path, transcript.to_srt().as_bytes()) {
            warn!("Failed to cache transcript for {}: {:#}", content_id, e);
        }

        Ok(transcript)
    }
}
