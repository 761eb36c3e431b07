//! Project document access.
//!
//! The editor owns the project schema, so the document is kept as an
//! order-preserving JSON tree. Only the paths the organizer understands are
//! read through the narrow views below; everything else is carried through
//! untouched.

use serde_json::{Map, Number, Value};

use crate::error::{OrganizerError, Result};

/// Track `type` selecting tracks the organizer may edit.
pub const AUDIO_TRACK_TYPE: &str = "audio";
/// Material `type` marking text-to-speech output.
pub const TTS_MATERIAL_TYPE: &str = "text_to_audio";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Root object of one editing project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDocument {
    root: Map<String, Value>,
}

/// Placement of a segment on the timeline, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub duration: i64,
}

/// Read-only view over one entry of `materials.audios`.
#[derive(Debug, Clone, Copy)]
pub struct MaterialView<'a> {
    fields: &'a Map<String, Value>,
}

/// Read-only view over one entry of `tracks`.
#[derive(Debug, Clone, Copy)]
pub struct TrackView<'a> {
    index: usize,
    fields: &'a Map<String, Value>,
}

/// Read-only view over one entry of a track's `segments`.
#[derive(Debug, Clone, Copy)]
pub struct SegmentView<'a> {
    index: usize,
    value: &'a Value,
}

impl ProjectDocument {
    /// Parses project bytes.
    ///
    /// Fails with `InvalidSchema` when the input is not JSON or its root is
    /// not an object.
    ///
    /// # Example
    /// ```
    /// use organizer::ProjectDocument;
    ///
    /// let doc = ProjectDocument::parse(br#"{"b":1,"a":{"x":[]}}"#).expect("valid json");
    /// assert_eq!(doc.to_bytes().expect("serialize"), br#"{"b":1,"a":{"x":[]}}"#);
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(strip_bom(bytes))
            .map_err(|err| OrganizerError::invalid_schema(err.to_string()))?;
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(OrganizerError::invalid_schema(format!(
                "expected a JSON object at the root, found {}",
                kind_name(&other)
            ))),
        }
    }

    /// Encodes the document compactly, keeping key order.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.root).map_err(|source| OrganizerError::Serialization { source })
    }

    /// Returns the raw root object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Iterates `materials.audios` object entries in document order.
    pub fn audio_materials(&self) -> impl Iterator<Item = MaterialView<'_>> {
        self.root
            .get("materials")
            .and_then(|materials| materials.get("audios"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(|fields| MaterialView { fields })
    }

    /// Iterates `tracks` object entries, keeping their index in the array.
    pub fn tracks(&self) -> impl Iterator<Item = TrackView<'_>> {
        self.root
            .get("tracks")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
            .filter_map(|(index, track)| track.as_object().map(|fields| TrackView { index, fields }))
    }

    pub(crate) fn tracks_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.root.get_mut("tracks").and_then(Value::as_array_mut)
    }
}

impl<'a> MaterialView<'a> {
    pub fn id(&self) -> Option<&'a str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<&'a str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn is_tts(&self) -> bool {
        self.kind() == Some(TTS_MATERIAL_TYPE)
    }
}

impl<'a> TrackView<'a> {
    /// Position of the track in the document's `tracks` array.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> Option<&'a str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    pub fn is_audio(&self) -> bool {
        self.kind() == Some(AUDIO_TRACK_TYPE)
    }

    /// Iterates segment entries, keeping their index in the array.
    pub fn segments(self) -> impl Iterator<Item = SegmentView<'a>> {
        self.fields
            .get("segments")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(index, value)| SegmentView { index, value })
    }
}

impl<'a> SegmentView<'a> {
    /// Position of the segment in its track's `segments` array.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn material_id(&self) -> Option<&'a str> {
        segment_material_id(self.value)
    }

    /// Returns the target time range when both fields are integers.
    pub fn timerange(&self) -> Option<TimeRange> {
        let range = self.value.get("target_timerange")?;
        Some(TimeRange {
            start: range.get("start")?.as_i64()?,
            duration: range.get("duration")?.as_i64()?,
        })
    }
}

pub(crate) fn segment_material_id(segment: &Value) -> Option<&str> {
    segment.get("material_id").and_then(Value::as_str)
}

/// `target_timerange.start` as any JSON number, integer or not.
pub(crate) fn segment_start_number(segment: &Value) -> Option<&Number> {
    match segment.get("target_timerange")?.get("start")? {
        Value::Number(number) => Some(number),
        _ => None,
    }
}

pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Overwrites `target_timerange.start`, leaving sibling fields in place.
pub(crate) fn set_segment_start(segment: &mut Value, start: i64) -> Result<()> {
    let range = segment
        .get_mut("target_timerange")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| OrganizerError::invalid_schema("segment has no target_timerange object"))?;
    range.insert("start".to_owned(), Value::from(start));
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
