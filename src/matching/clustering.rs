use crate::domain::models::{FrameEvent, MatchInterval};

pub const DEFAULT_MERGE_GAP_SECS: f64 = 2.0;

/// Folds ordered frame events into match intervals.
///
/// An event closer than `merge_gap` seconds to the end of the current interval
/// extends it and raises its confidence; anything further away starts a new one.
/// A fade over a matching shot therefore counts as one match, not dozens.
pub fn cluster(events: &[FrameEvent], merge_gap: f64) -> Vec<MatchInterval> {
    events.iter().fold(Vec::<MatchInterval>::new(), |mut intervals, event| {
        match intervals.last_mut() {
            Some(current) if event.pts_time - current.end < merge_gap => {
                current.end = current.end.max(event.pts_time);
                current.confidence = current.confidence.max(event.confidence);
            }
            _ => intervals.push(MatchInterval::at(event)),
        }
        intervals
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pts_time: f64, confidence: f64) -> FrameEvent {
        FrameEvent {
            frame_index: (pts_time * 24.0) as u64,
            pts_time,
            confidence,
        }
    }

    #[test]
    fn test_close_events_merge() {
        let intervals = cluster(&[event(10.0, 88.0), event(11.0, 95.0)], 2.0);
        assert_eq!(
            intervals,
            vec![MatchInterval {
                confidence: 95.0,
                start: 10.0,
                end: 11.0
            }]
        );
    }

    #[test]
    fn test_distant_events_split() {
        let intervals = cluster(&[event(10.0, 88.0), event(15.0, 95.0)], 2.0);
        assert_eq!(
            intervals,
            vec![
                MatchInterval {
                    confidence: 88.0,
                    start: 10.0,
                    end: 10.0
                },
                MatchInterval {
                    confidence: 95.0,
                    start: 15.0,
                    end: 15.0
                },
            ]
        );
    }

    #[test]
    fn test_gap_is_measured_from_interval_end() {
        // Each step is under the gap, so the chain keeps growing past it.
        let events: Vec<FrameEvent> = (0..6).map(|i| event(i as f64 * 1.5, 90.0)).collect();
        let intervals = cluster(&events, 2.0);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start, 0.0);
        assert_eq!(intervals[0].end, 7.5);
    }

    #[test]
    fn test_gap_equal_to_threshold_splits() {
        let intervals = cluster(&[event(1.0, 90.0), event(3.0, 90.0)], 2.0);
        assert_eq!(intervals.len(), 2);
    }

    #[test]
    fn test_confidence_keeps_maximum() {
        let intervals = cluster(
            &[event(1.0, 99.0), event(1.5, 86.0), event(2.0, 91.0)],
            2.0,
        );
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].confidence, 99.0);
        assert_eq!(intervals[0].end, 2.0);
    }

    #[test]
    fn test_intervals_are_ordered_and_disjoint() {
        let events = [
            event(0.0, 90.0),
            event(0.5, 90.0),
            event(4.0, 90.0),
            event(9.0, 90.0),
            event(10.9, 90.0),
            event(30.0, 90.0),
        ];
        let intervals = cluster(&events, 2.0);
        assert_eq!(intervals.len(), 4);
        for interval in &intervals {
            assert!(interval.start <= interval.end);
        }
        for pair in intervals.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn test_configurable_gap() {
        let events = [event(0.0, 90.0), event(5.0, 90.0)];
        assert_eq!(cluster(&events, 2.0).len(), 2);
        assert_eq!(cluster(&events, 6.0).len(), 1);
    }

    #[test]
    fn test_no_events() {
        assert!(cluster(&[], DEFAULT_MERGE_GAP_SECS).is_empty());
    }
}
