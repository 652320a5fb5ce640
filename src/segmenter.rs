/*!
 * Cue segmentation.
 *
 * Merges consecutive transcript cues into translation/synthesis units bounded
 * by a duration ceiling and a character ceiling. Units partition the cue
 * sequence: every cue lands in exactly one unit, in order.
 */

use serde::{Deserialize, Serialize};

use crate::app_config::SegmentationConfig;
use crate::errors::DubError;
use crate::transcript::Cue;

/// A run of consecutive cues translated and voiced as one piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationUnit {
    /// Position in the unit sequence, from 0
    pub index: usize,

    /// Cue texts joined with single spaces
    pub text: String,

    /// Start offset of the first cue
    pub start_secs: f64,

    /// Sum of the merged cue durations
    pub duration_secs: f64,
}

/// Cue ceilings for one segmentation pass
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    max_duration_secs: f64,
    max_chars: usize,
}

impl Segmenter {
    pub fn new(max_duration_secs: f64, max_chars: usize) -> Self {
        Self {
            max_duration_secs,
            max_chars,
        }
    }

    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self::new(config.max_unit_duration_secs, config.max_unit_chars)
    }

    /// Merge `cues` into units
    ///
    /// A cue that alone exceeds a ceiling still becomes its own unit. Cues must
    /// be ordered by start time with finite, non-negative timing.
    pub fn segment(&self, cues: &[Cue]) -> Result<Vec<SegmentationUnit>, DubError> {
        validate_cues(cues)?;

        let mut units = Vec::new();
        let mut current: Option<SegmentationUnit> = None;

        for (i, cue) in cues.iter().enumerate() {
            let opening = current.is_none();
            let index = units.len();
            let unit = current.get_or_insert_with(|| SegmentationUnit {
                index,
                text: String::new(),
                start_secs: cue.start_secs,
                duration_secs: 0.0,
            });
            if !opening {
                unit.text.push(' ');
            }
            unit.text.push_str(&cue.text);
            unit.duration_secs += cue.duration_secs;

            let close = match cues.get(i + 1) {
                None => true,
                Some(next) => {
                    unit.duration_secs >= self.max_duration_secs
                        || unit.duration_secs + next.duration_secs > self.max_duration_secs
                        || unit.text.chars().count() + 1 + next.text.chars().count() > self.max_chars
                }
            };

            if close {
                if let Some(unit) = current.take() {
                    units.push(unit);
                }
            }
        }

        Ok(units)
    }
}

fn validate_cues(cues: &[Cue]) -> Result<(), DubError> {
    for (i, cue) in cues.iter().enumerate() {
        if !cue.start_secs.is_finite() || cue.start_secs < 0.0 {
            return Err(DubError::MalformedInput(format!(
                "cue {} has invalid start {}", i, cue.start_secs
            )));
        }
        if !cue.duration_secs.is_finite() || cue.duration_secs < 0.0 {
            return Err(DubError::MalformedInput(format!(
                "cue {} has invalid duration {}", i, cue.duration_secs
            )));
        }
        if i > 0 && cue.start_secs < cues[i - 1].start_secs {
            return Err(DubError::MalformedInput(format!(
                "cue {} starts at {} before previous cue at {}",
                i, cue.start_secs, cues[i - 1].start_secs
            )));
        }
    }
    Ok(())
}
