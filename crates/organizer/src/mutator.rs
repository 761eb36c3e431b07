use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde_json::{Number, Value};
use tracing::{debug, info};

use crate::document::{
    AUDIO_TRACK_TYPE, ProjectDocument, segment_material_id, segment_start_number,
    set_segment_start,
};
use crate::error::{OrganizerError, Result};
use crate::locator::{SegmentRef, TtsScan};
use crate::planner::RepackPlan;

/// What a reorganization did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationSummary {
    pub master_track: usize,
    pub relocated: usize,
    pub moved: usize,
    /// Always true once segments were merged, even when no start changed.
    pub modified: bool,
}

/// Picks the track receiving every text-to-speech segment: the first audio
/// track in document order.
pub fn select_master_track(doc: &ProjectDocument) -> Option<usize> {
    doc.tracks()
        .find(|track| track.is_audio())
        .map(|track| track.index())
}

/// Moves all text-to-speech segments onto the master track at their planned
/// starts, then sorts the master track by start.
///
/// Non-TTS segments stay on their tracks in their original order. The plan
/// must describe exactly the TTS segments currently in `doc`; otherwise
/// `StalePlan` is returned and the document is left untouched.
pub fn apply_plan(
    doc: &mut ProjectDocument,
    scan: &TtsScan,
    plan: &RepackPlan,
) -> Result<MutationSummary> {
    if plan.entries.is_empty() {
        return Err(OrganizerError::NoTtsSegments);
    }
    let master_track = select_master_track(doc).ok_or(OrganizerError::NoAudioTrack)?;

    let present = tts_positions(doc, scan);
    let planned: BTreeSet<SegmentRef> = plan.entries.iter().map(|entry| entry.at).collect();
    if planned.len() != plan.entries.len() || planned != present {
        return Err(OrganizerError::StalePlan {
            planned: plan.entries.len(),
            found: present.len(),
        });
    }

    let tracks = doc
        .tracks_mut()
        .ok_or_else(|| OrganizerError::invalid_schema("tracks is not an array"))?;

    let mut lifted = HashMap::<SegmentRef, Value>::with_capacity(plan.entries.len());
    for (track_index, track) in tracks.iter_mut().enumerate() {
        if !is_audio_track(track) {
            continue;
        }
        let Some(segments) = track.get_mut("segments").and_then(Value::as_array_mut) else {
            continue;
        };

        let mut kept = Vec::with_capacity(segments.len());
        for (segment_index, segment) in std::mem::take(segments).into_iter().enumerate() {
            if is_tts_segment(&segment, scan) {
                lifted.insert(
                    SegmentRef {
                        track_index,
                        segment_index,
                    },
                    segment,
                );
            } else {
                kept.push(segment);
            }
        }
        *segments = kept;
    }

    let mut repacked = Vec::with_capacity(plan.entries.len());
    for entry in &plan.entries {
        let mut segment = lifted.remove(&entry.at).ok_or(OrganizerError::StalePlan {
            planned: plan.entries.len(),
            found: present.len(),
        })?;
        set_segment_start(&mut segment, entry.new_start)?;
        debug!(
            name = %entry.name,
            old_start = entry.old_start,
            new_start = entry.new_start,
            duration = entry.duration,
            "segment repacked"
        );
        repacked.push(segment);
    }

    let master = tracks
        .get_mut(master_track)
        .and_then(|track| track.as_object_mut())
        .ok_or(OrganizerError::NoAudioTrack)?;
    let segments = master
        .entry("segments")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(segments) = segments.as_array_mut() else {
        return Err(OrganizerError::invalid_schema("master track segments is not an array"));
    };
    segments.extend(repacked);
    // Stable: segments without a numeric start keep their relative order at the end.
    segments.sort_by(|a, b| compare_starts(segment_start_number(a), segment_start_number(b)));

    let summary = MutationSummary {
        master_track,
        relocated: plan.entries.len(),
        moved: plan.moved_clips(),
        modified: true,
    };
    info!(
        master_track,
        relocated = summary.relocated,
        moved = summary.moved,
        "tts segments merged onto master track"
    );
    Ok(summary)
}

fn tts_positions(doc: &ProjectDocument, scan: &TtsScan) -> BTreeSet<SegmentRef> {
    doc.tracks()
        .filter(|track| track.is_audio())
        .flat_map(|track| {
            let track_index = track.index();
            track
                .segments()
                .filter(move |segment| {
                    segment
                        .material_id()
                        .is_some_and(|id| scan.is_tts_material(id))
                })
                .map(move |segment| SegmentRef {
                    track_index,
                    segment_index: segment.index(),
                })
        })
        .collect()
}

/// Orders integer starts exactly and mixed or fractional starts by value.
fn compare_starts(a: Option<&Number>, b: Option<&Number>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn is_audio_track(track: &Value) -> bool {
    track.get("type").and_then(Value::as_str) == Some(AUDIO_TRACK_TYPE)
}

fn is_tts_segment(segment: &Value, scan: &TtsScan) -> bool {
    segment_material_id(segment).is_some_and(|id| scan.is_tts_material(id))
}
