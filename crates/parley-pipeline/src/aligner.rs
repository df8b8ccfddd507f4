//! Speaker assignment by maximum temporal overlap.

use parley_core::{DiarizationResult, Segment, UNKNOWN_SPEAKER};

/// Label every segment with the speaker whose turn overlaps it the most.
///
/// Ties go to the earliest turn in diarization order. A segment that touches
/// no turn gets [`UNKNOWN_SPEAKER`]. An empty diarization leaves segments
/// untouched.
pub fn merge(diarization: &DiarizationResult, segments: &mut [Segment]) {
    if diarization.is_empty() {
        return;
    }
    for segment in segments {
        segment.speaker = Some(best_speaker(diarization, segment.start, segment.end).to_string());
    }
}

fn best_speaker(diarization: &DiarizationResult, start: f64, end: f64) -> &str {
    let mut best: Option<(&str, f64)> = None;
    for turn in &diarization.segments {
        let overlap = turn.overlap(start, end);
        if overlap > 0.0 && best.is_none_or(|(_, b)| overlap > b) {
            best = Some((turn.speaker.as_str(), overlap));
        }
    }
    best.map_or(UNKNOWN_SPEAKER, |(speaker, _)| speaker)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use parley_core::SpeakerSegment;

    use super::*;

    fn diarization(turns: &[(f64, f64, &str)]) -> DiarizationResult {
        DiarizationResult {
            segments: turns
                .iter()
                .map(|&(s, e, who)| SpeakerSegment::new(s, e, who))
                .collect(),
            num_speakers: 2,
        }
    }

    #[test]
    fn largest_overlap_wins() {
        let d = diarization(&[(0.0, 7.0, "1"), (7.0, 20.0, "2")]);
        let mut segs = vec![Segment::new(0, 5.0, 10.0, "x")];
        merge(&d, &mut segs);
        assert_eq!(segs[0].speaker.as_deref(), Some("2"));
    }

    #[test]
    fn tie_goes_to_first_turn() {
        let d = diarization(&[(0.0, 5.0, "1"), (5.0, 10.0, "2")]);
        let mut segs = vec![Segment::new(0, 3.0, 7.0, "x")];
        merge(&d, &mut segs);
        assert_eq!(segs[0].speaker.as_deref(), Some("1"));
    }

    #[test]
    fn no_overlap_is_unknown() {
        let d = diarization(&[(0.0, 5.0, "1")]);
        let mut segs = vec![
            Segment::new(0, 5.0, 8.0, "touching"),
            Segment::new(1, 20.0, 25.0, "far"),
        ];
        merge(&d, &mut segs);
        assert!(segs.iter().all(|s| s.speaker.as_deref() == Some(UNKNOWN_SPEAKER)));
    }

    #[test]
    fn equal_overlap_on_both_sides_picks_earlier_speaker() {
        let d = diarization(&[(1.0, 3.0, "A"), (3.0, 5.0, "B")]);
        let mut segs = vec![Segment::new(0, 2.0, 4.0, "x")];
        merge(&d, &mut segs);
        assert_eq!(segs[0].speaker.as_deref(), Some("A"));
    }

    #[test]
    fn segment_after_last_turn_is_unknown() {
        let d = diarization(&[(0.0, 5.0, "A")]);
        let mut segs = vec![Segment::new(0, 10.0, 11.0, "x")];
        merge(&d, &mut segs);
        assert_eq!(segs[0].speaker.as_deref(), Some("unknown"));
    }

    #[test]
    fn empty_diarization_is_noop() {
        let mut segs = vec![Segment::new(0, 0.0, 1.0, "x")];
        merge(&DiarizationResult::default(), &mut segs);
        assert!(segs[0].speaker.is_none());
    }

    #[test]
    fn every_segment_is_labelled() {
        let d = diarization(&[(0.0, 30.0, "1"), (30.0, 60.0, "2")]);
        let mut segs: Vec<Segment> = (0..6)
            .map(|i| Segment::new(i, f64::from(i) * 10.0, f64::from(i) * 10.0 + 10.0, "x"))
            .collect();
        merge(&d, &mut segs);
        let labels: Vec<_> = segs.iter().map(|s| s.speaker.clone().unwrap()).collect();
        assert_eq!(labels, vec!["1", "1", "1", "2", "2", "2"]);
    }
}
