//! Canvas data types
//!
//! Drawing elements and the wire envelope that carries them:
//!
//! ```json
//! {"type": "line", "data": {"points": [{"x": 0, "y": 0}], "color": "#000", "lineWidth": 2}}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

use super::error::{CanvasError, CanvasResult};

/// Treat an explicit `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A point on the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default, deserialize_with = "null_as_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A freehand stroke
///
/// Missing or `null` fields decode to their zero value; fields of the wrong
/// type are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    /// Points in drawing order
    #[serde(default, deserialize_with = "null_as_default")]
    pub points: Vec<Point>,
    /// CSS color, e.g. `#000` or `rgb(0, 0, 0)`
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
    /// Stroke width in pixels
    #[serde(default, deserialize_with = "null_as_default")]
    pub line_width: i64,
}

impl Line {
    pub fn new(points: Vec<Point>, color: impl Into<String>, line_width: i64) -> Self {
        Self {
            points,
            color: color.into(),
            line_width,
        }
    }
}

/// Kinds of drawing element the canvas understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Line,
}

impl ElementKind {
    /// Wire tag used in the envelope's `type` field
    pub const fn tag(self) -> &'static str {
        match self {
            ElementKind::Line => "line",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "line" => Some(ElementKind::Line),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One accepted element of the shared drawing
#[derive(Debug, Clone, PartialEq)]
pub enum DrawingElement {
    Line(Line),
}

impl DrawingElement {
    pub fn kind(&self) -> ElementKind {
        match self {
            DrawingElement::Line(_) => ElementKind::Line,
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        match self {
            DrawingElement::Line(line) => Some(line),
        }
    }

    /// Decode a payload of the given kind
    ///
    /// A `null` payload decodes to the kind's empty element.
    pub fn from_payload(kind: ElementKind, payload: &RawValue) -> CanvasResult<Self> {
        match kind {
            ElementKind::Line => serde_json::from_str::<Option<Line>>(payload.get())
                .map(|line| DrawingElement::Line(line.unwrap_or_default()))
                .map_err(|source| CanvasError::InvalidPayload {
                    kind: kind.tag(),
                    source,
                }),
        }
    }
}

/// Wire wrapper separating an element's kind from its payload
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    /// Left undecoded until the kind is known
    pub data: Box<RawValue>,
}

impl Envelope {
    pub fn parse(frame: &[u8]) -> CanvasResult<Self> {
        serde_json::from_slice(frame).map_err(CanvasError::Envelope)
    }

    /// Decode the payload according to the envelope's kind
    pub fn into_element(self) -> CanvasResult<DrawingElement> {
        let kind = ElementKind::from_tag(&self.kind).ok_or(CanvasError::UnknownKind(self.kind))?;
        DrawingElement::from_payload(kind, &self.data)
    }
}

/// Parse a raw inbound frame into a drawing element
pub fn decode_frame(frame: &[u8]) -> CanvasResult<DrawingElement> {
    Envelope::parse(frame)?.into_element()
}
