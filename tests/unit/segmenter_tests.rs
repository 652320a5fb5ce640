/*!
 * Tests for cue merging
 */

use cuedub::errors::DubError;
use cuedub::segmenter::{SegmentationUnit, Segmenter};
use cuedub::transcript::{Cue, Transcript};

use crate::common;

fn assert_partition(cues: &[Cue], units: &[SegmentationUnit]) {
    for (position, unit) in units.iter().enumerate() {
        assert_eq!(unit.index, position);
    }

    let cue_text = cues.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
    let unit_text = units.iter().map(|u| u.text.as_str()).collect::<Vec<_>>().join(" ");
    assert_eq!(unit_text, cue_text);

    let cue_secs: f64 = cues.iter().map(|c| c.duration_secs).sum();
    let unit_secs: f64 = units.iter().map(|u| u.duration_secs).sum();
    assert!((cue_secs - unit_secs).abs() < 1e-9);
}

/// Test that units cover every cue exactly once for several ceilings
#[test]
fn test_segment_withVariousCeilings_shouldPartitionCues() {
    let transcript = Transcript::from_srt("vid", "fr", common::SAMPLE_SRT).unwrap();

    for (max_secs, max_chars) in [(1.0, 10), (3.0, 30), (6.0, 60), (30.0, 500)] {
        let units = Segmenter::new(max_secs, max_chars).segment(&transcript.cues).unwrap();
        assert_partition(&transcript.cues, &units);
    }
}

/// Test that unit starts come from the first merged cue
#[test]
fn test_segment_withMergedCues_shouldKeepFirstStart() {
    let transcript = Transcript::from_srt("vid", "fr", common::SAMPLE_SRT).unwrap();
    let units = Segmenter::new(6.0, 60).segment(&transcript.cues).unwrap();

    for unit in &units {
        assert!(transcript.cues.iter().any(|c| c.start_secs == unit.start_secs));
        assert!(unit.duration_secs <= 6.0);
        assert!(unit.text.chars().count() <= 60);
    }
    assert_eq!(units[0].start_secs, 0.0);
}

/// Test the two-cue scenario merging into one unit
#[test]
fn test_segment_withHiThere_shouldMergeIntoOneUnit() {
    let cues = vec![Cue::new("hi", 0.0, 2.0), Cue::new("there", 2.0, 1.5)];
    let units = Segmenter::new(6.0, 50).segment(&cues).unwrap();

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].text, "hi there");
    assert_eq!(units[0].start_secs, 0.0);
    assert!((units[0].duration_secs - 3.5).abs() < 1e-9);
}

/// Test that a cue over both ceilings still forms its own unit
#[test]
fn test_segment_withOversizedCue_shouldKeepItAlone() {
    let long = "word ".repeat(30).trim_end().to_string();
    let cues = vec![
        Cue::new("short", 0.0, 1.0),
        Cue::new(long.clone(), 1.0, 10.0),
        Cue::new("tail", 11.0, 1.0),
    ];
    let units = Segmenter::new(6.0, 50).segment(&cues).unwrap();

    assert_eq!(units.len(), 3);
    assert_eq!(units[1].text, long);
    assert_partition(&cues, &units);
}

/// Test that empty input yields no units
#[test]
fn test_segment_withNoCues_shouldReturnEmpty() {
    assert!(Segmenter::new(6.0, 50).segment(&[]).unwrap().is_empty());
}

/// Test that unordered cues are rejected as malformed
#[test]
fn test_segment_withUnorderedCues_shouldFailMalformed() {
    let cues = vec![Cue::new("b", 5.0, 1.0), Cue::new("a", 1.0, 1.0)];
    assert!(matches!(
        Segmenter::new(6.0, 50).segment(&cues),
        Err(DubError::MalformedInput(_))
    ));
}
