use crate::document::TimeRange;
use crate::locator::{LocatedSegment, SegmentRef};

/// Planned placement for one text-to-speech segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub at: SegmentRef,
    pub name: String,
    pub old_start: i64,
    pub new_start: i64,
    pub duration: i64,
    pub changed: bool,
}

/// Back-to-back placement of all text-to-speech segments, in timeline order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepackPlan {
    pub entries: Vec<PlanEntry>,
}

impl RepackPlan {
    pub fn total_clips(&self) -> usize {
        self.entries.len()
    }

    /// Sum of clip durations in microseconds.
    pub fn total_duration(&self) -> i64 {
        self.entries
            .iter()
            .fold(0_i64, |total, entry| total.saturating_add(entry.duration))
    }

    /// Returns true when at least one clip would move.
    pub fn will_modify(&self) -> bool {
        self.entries.iter().any(|entry| entry.changed)
    }

    pub fn moved_clips(&self) -> usize {
        self.entries.iter().filter(|entry| entry.changed).count()
    }

    /// Start of the packed block, equal to the earliest original start.
    pub fn anchor(&self) -> Option<i64> {
        self.entries.first().map(|entry| entry.new_start)
    }
}

/// Packs segments back to back, starting at the earliest current start.
///
/// Segments keep their chronological order; equal starts keep scan order.
/// Only gaps and overlaps between neighbours change.
///
/// # Example
/// ```
/// use organizer::document::TimeRange;
/// use organizer::locator::{LocatedSegment, SegmentRef};
/// use organizer::planner::plan_repack;
///
/// let clip = |segment_index, start| LocatedSegment {
///     at: SegmentRef { track_index: 0, segment_index },
///     material_id: "tts".to_owned(),
///     name: "line".to_owned(),
///     timerange: TimeRange { start, duration: 1_000 },
/// };
///
/// let plan = plan_repack(&[clip(0, 9_000), clip(1, 2_000)]);
/// let starts: Vec<i64> = plan.entries.iter().map(|entry| entry.new_start).collect();
/// assert_eq!(starts, vec![2_000, 3_000]);
/// ```
pub fn plan_repack(segments: &[LocatedSegment]) -> RepackPlan {
    let mut ordered: Vec<&LocatedSegment> = segments.iter().collect();
    ordered.sort_by_key(|segment| segment.timerange.start);

    let mut cursor = ordered
        .first()
        .map(|segment| segment.timerange.start)
        .unwrap_or(0);
    let entries = ordered
        .into_iter()
        .map(|segment| {
            let TimeRange { start, duration } = segment.timerange;
            let entry = PlanEntry {
                at: segment.at,
                name: segment.name.clone(),
                old_start: start,
                new_start: cursor,
                duration,
                changed: start != cursor,
            };
            cursor = cursor.saturating_add(duration);
            entry
        })
        .collect();

    RepackPlan { entries }
}

#[cfg(test)]
mod tests {
    use super::plan_repack;
    use crate::document::TimeRange;
    use crate::locator::{LocatedSegment, SegmentRef};

    fn clip(track_index: usize, segment_index: usize, start: i64, duration: i64) -> LocatedSegment {
        LocatedSegment {
            at: SegmentRef {
                track_index,
                segment_index,
            },
            material_id: format!("t{track_index}-{segment_index}"),
            name: format!("clip {track_index}/{segment_index}"),
            timerange: TimeRange { start, duration },
        }
    }

    #[test]
    fn empty_input_yields_empty_plan() {
        let plan = plan_repack(&[]);
        assert_eq!(plan.total_clips(), 0);
        assert!(!plan.will_modify());
        assert_eq!(plan.anchor(), None);
    }

    #[test]
    fn scattered_clips_are_packed_from_earliest_start() {
        let plan = plan_repack(&[
            clip(0, 0, 5_000_000, 2_000_000),
            clip(1, 0, 1_000_000, 2_000_000),
            clip(1, 1, 3_000_000, 2_000_000),
        ]);

        let starts: Vec<i64> = plan.entries.iter().map(|entry| entry.new_start).collect();
        assert_eq!(starts, vec![1_000_000, 3_000_000, 5_000_000]);
        assert_eq!(plan.entries[0].at.track_index, 1);
        assert_eq!(plan.entries[2].at.track_index, 0);
        assert_eq!(plan.total_duration(), 6_000_000);
        assert!(!plan.will_modify());
    }

    #[test]
    fn gaps_and_overlaps_are_closed_without_reordering() {
        let plan = plan_repack(&[
            clip(0, 0, 1_000, 500),
            clip(0, 1, 1_200, 300),
            clip(0, 2, 9_000, 100),
        ]);

        for pair in plan.entries.windows(2) {
            assert_eq!(pair[1].new_start, pair[0].new_start + pair[0].duration);
        }
        assert_eq!(plan.anchor(), Some(1_000));
        assert_eq!(
            plan.entries.iter().map(|entry| entry.old_start).collect::<Vec<_>>(),
            vec![1_000, 1_200, 9_000]
        );
        assert_eq!(plan.moved_clips(), 2);
        assert!(plan.will_modify());
    }

    #[test]
    fn equal_starts_keep_scan_order() {
        let plan = plan_repack(&[clip(1, 4, 700, 10), clip(0, 2, 700, 20), clip(0, 0, 100, 5)]);

        let refs: Vec<(usize, usize)> = plan
            .entries
            .iter()
            .map(|entry| (entry.at.track_index, entry.at.segment_index))
            .collect();
        assert_eq!(refs, vec![(0, 0), (1, 4), (0, 2)]);
        assert_eq!(plan.entries[1].new_start, 105);
        assert_eq!(plan.entries[2].new_start, 115);
    }

    #[test]
    fn replanning_an_applied_plan_moves_nothing() {
        let first = plan_repack(&[clip(0, 0, 40, 10), clip(0, 1, 0, 10), clip(1, 0, 90, 10)]);
        let packed: Vec<_> = first
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| clip(0, index, entry.new_start, entry.duration))
            .collect();

        let second = plan_repack(&packed);
        assert!(!second.will_modify());
    }
}
