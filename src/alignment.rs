/*!
 * Timeline alignment.
 *
 * Synthesized speech rarely matches the duration of the cues it replaces.
 * The aligner pads each clip with silence so the concatenated track keeps
 * following the source timeline, using one of two policies:
 *
 * - `SlotDeficit` compares each clip with its own cue duration. Overage is
 *   carried forward and absorbs later deficits before any silence is added.
 * - `AbsoluteTimeline` compares the running playback cursor with each unit's
 *   start offset and closes a damped fraction of the gap.
 *
 * Neither policy shortens audio, so a run whose speech is consistently longer
 * than its cues drifts by the accumulated overage.
 */

use log::debug;

use crate::app_config::{AlignmentConfig, AlignmentPolicy};
use crate::units::{AlignedUnit, SynthesizedUnit, TranslatedUnit};

/// Running position of one (content, language) run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimelineCursor {
    /// Seconds of audio emitted so far, padding included
    pub played_secs: f64,

    /// Seconds of source timeline covered so far
    pub original_secs: f64,

    /// Overage not yet absorbed by a later deficit
    pub carry_secs: f64,

    pub units_seen: usize,
}

impl TimelineCursor {
    /// Emitted audio minus covered timeline; positive means the dub runs late
    pub fn drift_secs(&self) -> f64 {
        self.played_secs - self.original_secs
    }
}

/// Silence to insert around one clip
#[derive(Debug, Clone, Copy, PartialEq)]
struct Padding {
    lead_secs: f64,
    trail_secs: f64,
}

impl Padding {
    const NONE: Padding = Padding { lead_secs: 0.0, trail_secs: 0.0 };

    fn split(total_secs: f64) -> Self {
        Self {
            lead_secs: total_secs / 2.0,
            trail_secs: total_secs / 2.0,
        }
    }
}

/// Pads clips of one run in unit order
#[derive(Debug, Clone)]
pub struct TimelineAligner {
    policy: AlignmentPolicy,
    damping: f64,
    cursor: TimelineCursor,
}

impl TimelineAligner {
    pub fn new(policy: AlignmentPolicy, damping: f64) -> Self {
        Self {
            policy,
            damping,
            cursor: TimelineCursor::default(),
        }
    }

    pub fn from_config(config: &AlignmentConfig) -> Self {
        Self::new(config.policy, config.damping)
    }

    pub fn policy(&self) -> AlignmentPolicy {
        self.policy
    }

    pub fn cursor(&self) -> TimelineCursor {
        self.cursor
    }

    /// Pad a freshly synthesized clip and advance the cursor
    pub fn align(&mut self, synthesized: SynthesizedUnit) -> AlignedUnit {
        let SynthesizedUnit {
            translated,
            mut clip,
            actual_duration_secs,
            ..
        } = synthesized;

        let padding = match self.policy {
            AlignmentPolicy::SlotDeficit => {
                self.slot_deficit_padding(actual_duration_secs, translated.original_duration_secs)
            }
            AlignmentPolicy::AbsoluteTimeline => self.absolute_timeline_padding(translated.start_secs()),
        };

        let (lead_secs, trail_secs) = clip.pad(padding.lead_secs, padding.trail_secs);
        let final_duration_secs = clip.duration_secs();

        self.cursor.played_secs += final_duration_secs;
        self.cursor.original_secs += translated.original_duration_secs;
        self.cursor.units_seen += 1;

        debug!(
            "Unit {} aligned: actual {:.3}s, original {:.3}s, lead {:.3}s, trail {:.3}s, carry {:.3}s, drift {:+.3}s",
            translated.index(),
            actual_duration_secs,
            translated.original_duration_secs,
            lead_secs,
            trail_secs,
            self.cursor.carry_secs,
            self.cursor.drift_secs()
        );

        AlignedUnit {
            translated,
            clip,
            lead_silence_secs: lead_secs,
            trail_silence_secs: trail_secs,
            final_duration_secs,
        }
    }

    /// Account for a clip produced by an earlier run
    ///
    /// Carry is rebuilt as the overall overage, which equals the carry the
    /// slot-deficit policy would hold at this point.
    pub fn record_existing(&mut self, translated: &TranslatedUnit, final_duration_secs: f64) {
        self.cursor.played_secs += final_duration_secs;
        self.cursor.original_secs += translated.original_duration_secs;
        self.cursor.carry_secs = (self.cursor.played_secs - self.cursor.original_secs).max(0.0);
        self.cursor.units_seen += 1;
    }

    fn slot_deficit_padding(&mut self, actual_secs: f64, original_secs: f64) -> Padding {
        if actual_secs > original_secs {
            self.cursor.carry_secs += actual_secs - original_secs;
            return Padding::NONE;
        }

        let deficit = original_secs - actual_secs;
        if deficit <= self.cursor.carry_secs {
            self.cursor.carry_secs -= deficit;
            return Padding::NONE;
        }

        let silence = deficit - self.cursor.carry_secs;
        self.cursor.carry_secs = 0.0;
        Padding::split(silence)
    }

    fn absolute_timeline_padding(&mut self, unit_start_secs: f64) -> Padding {
        let gap = unit_start_secs - self.cursor.played_secs;
        if gap <= 0.0 {
            return Padding::NONE;
        }

        let mut correction = gap * self.damping;
        if self.cursor.units_seen == 0 {
            correction /= 2.0;
        }
        Padding::split(correction)
    }
}
