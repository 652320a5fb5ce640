/*!
 * Convergence tests for timeline alignment
 */

use cuedub::alignment::TimelineAligner;
use cuedub::app_config::AlignmentPolicy;
use cuedub::audio::AudioClip;
use cuedub::segmenter::SegmentationUnit;
use cuedub::units::{SynthesizedUnit, TranslatedUnit};

const RATE: u32 = 8_000;

/// Back-to-back units of `slot` seconds, voiced at `ratio` of their slot
fn run_aligner(policy: AlignmentPolicy, units: usize, slot: f64, ratio: f64) -> (TimelineAligner, f64) {
    let mut aligner = TimelineAligner::new(policy, 0.9);
    let mut silence = 0.0;

    for index in 0..units {
        let unit = SegmentationUnit {
            index,
            text: format!("unit {}", index),
            start_secs: index as f64 * slot,
            duration_secs: slot,
        };
        let translated = TranslatedUnit::new(unit, format!("unité {}", index));
        let clip = AudioClip::silence(slot * ratio, 1, RATE);
        let aligned = aligner.align(SynthesizedUnit {
            actual_duration_secs: clip.duration_secs(),
            translated,
            clip,
            chunk_count: 1,
        });
        silence += aligned.lead_silence_secs + aligned.trail_silence_secs;
    }

    (aligner, silence)
}

/// Test that faster speech keeps drift under one unit for both policies
#[test]
fn test_align_withFasterSpeech_shouldStayWithinOneUnit() {
    let slot = 2.0;
    for policy in [AlignmentPolicy::SlotDeficit, AlignmentPolicy::AbsoluteTimeline] {
        let (aligner, _) = run_aligner(policy, 50, slot, 0.8);
        let drift = aligner.cursor().drift_secs().abs();
        assert!(drift < slot, "{:?} drifted {:.3}s", policy, drift);
    }
}

/// Test that slower speech inserts no silence and drifts by the overage
#[test]
fn test_align_withSlowerSpeech_shouldDriftByOverage() {
    let slot = 2.0;
    let units = 20;
    let overage = units as f64 * slot * 0.2;

    for policy in [AlignmentPolicy::SlotDeficit, AlignmentPolicy::AbsoluteTimeline] {
        let (aligner, silence) = run_aligner(policy, units, slot, 1.2);
        assert_eq!(silence, 0.0, "{:?} inserted silence", policy);
        assert!((aligner.cursor().drift_secs() - overage).abs() < 1e-3);
    }
}

/// Test that slot-deficit keeps the played time on the timeline for faster speech
#[test]
fn test_align_withSlotDeficitAndFasterSpeech_shouldHaveNoDrift() {
    let (aligner, silence) = run_aligner(AlignmentPolicy::SlotDeficit, 10, 1.6, 0.625);
    assert!((silence - 6.0).abs() < 1e-3);
    assert!(aligner.cursor().drift_secs().abs() < 1e-3);
}
