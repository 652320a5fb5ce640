use serde::{Deserialize, Serialize};

use crate::audio::AudioClip;
use crate::segmenter::SegmentationUnit;

// @module: Per-unit records flowing between pipeline stages

/// A unit with its translation; persisted as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedUnit {
    #[serde(flatten)]
    pub unit: SegmentationUnit,

    pub translated_text: String,

    /// Duration the voiced clip should occupy on the timeline
    pub original_duration_secs: f64,
}

impl TranslatedUnit {
    pub fn new(unit: SegmentationUnit, translated_text: String) -> Self {
        let original_duration_secs = unit.duration_secs;
        Self {
            unit,
            translated_text,
            original_duration_secs,
        }
    }

    pub fn index(&self) -> usize {
        self.unit.index
    }

    pub fn start_secs(&self) -> f64 {
        self.unit.start_secs
    }
}

/// A translated unit voiced into a single unpadded clip
#[derive(Debug)]
pub struct SynthesizedUnit {
    pub translated: TranslatedUnit,
    pub clip: AudioClip,
    pub actual_duration_secs: f64,
    pub chunk_count: usize,
}

/// A voiced unit after silence padding
#[derive(Debug)]
pub struct AlignedUnit {
    pub translated: TranslatedUnit,
    pub clip: AudioClip,
    pub lead_silence_secs: f64,
    pub trail_silence_secs: f64,
    pub final_duration_secs: f64,
}
