use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use tracing::debug;

use crate::document::{ProjectDocument, TimeRange};
use crate::error::{OrganizerError, Result};

/// Display name used for materials without one.
pub const DEFAULT_CLIP_NAME: &str = "Unnamed clip";

/// Position of one segment inside the document's track list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentRef {
    pub track_index: usize,
    pub segment_index: usize,
}

/// A text-to-speech segment found on an audio track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSegment {
    pub at: SegmentRef,
    pub material_id: String,
    pub name: String,
    pub timerange: TimeRange,
}

/// Text-to-speech content of a project, in track scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TtsScan {
    pub material_ids: BTreeSet<String>,
    pub names_by_id: HashMap<String, String>,
    pub segments: Vec<LocatedSegment>,
}

/// Why a valid project needs no reorganization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NothingToDo {
    NoTtsMaterials,
    NoTtsSegments,
}

/// Result of scanning a project for text-to-speech segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(TtsScan),
    NothingToDo(NothingToDo),
}

impl NothingToDo {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoTtsMaterials => "no text-to-speech audio found in this project",
            Self::NoTtsSegments => "no text-to-speech segments found on the audio tracks",
        }
    }
}

impl Display for NothingToDo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl TtsScan {
    pub fn is_tts_material(&self, material_id: &str) -> bool {
        self.material_ids.contains(material_id)
    }
}

/// Collects text-to-speech materials and the audio-track segments using them.
///
/// Materials without a string `id` are ignored. A TTS segment whose
/// `target_timerange` lacks an integer `start` or `duration` fails with
/// `InvalidSchema`, since it cannot be placed.
pub fn locate_tts_segments(doc: &ProjectDocument) -> Result<ScanOutcome> {
    let mut scan = TtsScan::default();

    for material in doc.audio_materials().filter(|material| material.is_tts()) {
        let Some(id) = material.id() else {
            continue;
        };
        let name = material
            .name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CLIP_NAME);
        scan.material_ids.insert(id.to_owned());
        scan.names_by_id.insert(id.to_owned(), name.to_owned());
    }

    if scan.material_ids.is_empty() {
        return Ok(ScanOutcome::NothingToDo(NothingToDo::NoTtsMaterials));
    }

    for track in doc.tracks().filter(|track| track.is_audio()) {
        for segment in track.segments() {
            let Some(material_id) = segment.material_id() else {
                continue;
            };
            if !scan.is_tts_material(material_id) {
                continue;
            }

            let timerange = segment.timerange().ok_or_else(|| {
                OrganizerError::invalid_schema(format!(
                    "tracks[{}].segments[{}].target_timerange needs integer start and duration",
                    track.index(),
                    segment.index()
                ))
            })?;
            let name = scan
                .names_by_id
                .get(material_id)
                .cloned()
                .unwrap_or_else(|| DEFAULT_CLIP_NAME.to_owned());

            scan.segments.push(LocatedSegment {
                at: SegmentRef {
                    track_index: track.index(),
                    segment_index: segment.index(),
                },
                material_id: material_id.to_owned(),
                name,
                timerange,
            });
        }
    }

    debug!(
        tts_materials = scan.material_ids.len(),
        tts_segments = scan.segments.len(),
        "tts scan finished"
    );

    if scan.segments.is_empty() {
        return Ok(ScanOutcome::NothingToDo(NothingToDo::NoTtsSegments));
    }
    Ok(ScanOutcome::Found(scan))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{DEFAULT_CLIP_NAME, NothingToDo, ScanOutcome, SegmentRef, locate_tts_segments};
    use crate::document::ProjectDocument;
    use crate::error::OrganizerError;

    fn doc(value: Value) -> ProjectDocument {
        ProjectDocument::parse(value.to_string().as_bytes()).expect("fixture must be valid json")
    }

    #[test]
    fn project_without_tts_materials_reports_nothing_to_do() {
        let project = doc(json!({
            "materials": {"audios": [{"id": "music", "type": "extract_music"}]},
            "tracks": [{"type": "audio", "segments": [
                {"material_id": "music", "target_timerange": {"start": 0, "duration": 10}}
            ]}]
        }));

        let outcome = locate_tts_segments(&project).expect("scan should succeed");
        assert_eq!(outcome, ScanOutcome::NothingToDo(NothingToDo::NoTtsMaterials));
    }

    #[test]
    fn unreferenced_tts_materials_report_no_segments() {
        let project = doc(json!({
            "materials": {"audios": [{"id": "t1", "type": "text_to_audio", "name": "intro"}]},
            "tracks": [{"type": "video", "segments": [
                {"material_id": "t1", "target_timerange": {"start": 0, "duration": 10}}
            ]}]
        }));

        let outcome = locate_tts_segments(&project).expect("scan should succeed");
        assert_eq!(outcome, ScanOutcome::NothingToDo(NothingToDo::NoTtsSegments));
    }

    #[test]
    fn scan_follows_track_then_segment_order_and_defaults_names() {
        let project = doc(json!({
            "materials": {"audios": [
                {"id": "t1", "type": "text_to_audio", "name": "first"},
                {"id": "t2", "type": "text_to_audio", "name": ""},
                {"id": "m", "type": "music"}
            ]},
            "tracks": [
                {"type": "audio", "segments": [
                    {"material_id": "m", "target_timerange": {"start": 0, "duration": 1}},
                    {"material_id": "t2", "target_timerange": {"start": 50, "duration": 5}}
                ]},
                {"type": "audio", "segments": [
                    {"material_id": "t1", "target_timerange": {"start": 10, "duration": 5}}
                ]}
            ]
        }));

        let ScanOutcome::Found(scan) = locate_tts_segments(&project).expect("scan should succeed")
        else {
            panic!("tts segments must be found");
        };

        assert_eq!(scan.segments.len(), 2);
        assert_eq!(
            scan.segments[0].at,
            SegmentRef {
                track_index: 0,
                segment_index: 1
            }
        );
        assert_eq!(scan.segments[0].name, DEFAULT_CLIP_NAME);
        assert_eq!(scan.segments[1].name, "first");
        assert_eq!(scan.segments[1].timerange.start, 10);
    }

    #[test]
    fn tts_segment_without_integer_start_is_invalid() {
        let project = doc(json!({
            "materials": {"audios": [{"id": "t1", "type": "text_to_audio"}]},
            "tracks": [{"type": "audio", "segments": [
                {"material_id": "t1", "target_timerange": {"start": "soon", "duration": 1}}
            ]}]
        }));

        let result = locate_tts_segments(&project);
        assert!(matches!(result, Err(OrganizerError::InvalidSchema { .. })));
    }
}
