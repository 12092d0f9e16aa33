//! Stored canvas format: `Document` ⇄ design record.
//!
//! The backing store keeps a design as a record with the canvas dimensions
//! next to a `canvasData` field. `canvasData` is a JSON *string* holding the
//! background and the ordered object list, each object a flat attribute map
//! tagged by `type` (`"i-text"`, `"image"`, `"path"`, or a shape tag such as
//! `"rect"`). Older rows may hold an already-parsed object instead of a
//! string, so decoding accepts both; encoding always emits a string.
//!
//! Decoding is strict about the things a design cannot exist without (valid
//! JSON, positive dimensions) and lenient about individual objects: an
//! object that cannot be decoded is logged and skipped so the rest of the
//! design still loads.

use crate::id::ObjectId;
use crate::model::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use thiserror::Error;

/// Version written into every encoded payload.
pub const CANVAS_FORMAT_VERSION: &str = "1";

/// A stored payload could not be turned into a `Document`.
///
/// Every variant is a flavour of "malformed document": callers recover by
/// substituting a blank canvas.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("canvas data is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("canvas data has an unexpected shape: {0}")]
    InvalidStructure(String),
    #[error("design has no width/height")]
    MissingDimensions,
    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },
    #[error("duplicate object id `{0}`")]
    DuplicateId(String),
    #[error("unknown object type `{0}`")]
    UnknownObjectType(String),
    #[error("`{kind}` object is missing `{field}`")]
    MissingField { kind: String, field: &'static str },
    #[error("failed to encode canvas data: {0}")]
    Encode(String),
}

// ─── Design record ───────────────────────────────────────────────────────

/// `canvasData` as found in the store: a JSON string, or a legacy
/// pre-parsed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanvasPayload {
    Encoded(String),
    Parsed(serde_json::Value),
}

impl CanvasPayload {
    /// Parse-if-string, then read the canvas body.
    pub fn parse(&self) -> Result<CanvasData, CodecError> {
        let value = match self {
            CanvasPayload::Encoded(text) => serde_json::from_str::<serde_json::Value>(text)
                .map_err(|e| CodecError::InvalidJson(e.to_string()))?,
            CanvasPayload::Parsed(value) => value.clone(),
        };
        serde_json::from_value(value).map_err(|e| CodecError::InvalidStructure(e.to_string()))
    }
}

/// One design as exchanged with the document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignRecord {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_data: Option<CanvasPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Milliseconds since the Unix epoch, maintained by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
}

/// The body of `canvasData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasData {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Kept as raw values so one bad entry does not sink the whole list.
    #[serde(default)]
    pub objects: Vec<serde_json::Value>,
}

fn default_version() -> String {
    CANVAS_FORMAT_VERSION.to_string()
}

// ─── Wire objects ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
enum WireFilter {
    Grayscale,
    Sepia,
    Invert,
    Blur {
        #[serde(default)]
        blur: f32,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum WireWeight {
    Numeric(u16),
    Named(String),
}

fn one() -> f32 {
    1.0
}

fn is_one(v: &f32) -> bool {
    *v == 1.0
}

fn is_zero(v: &f32) -> bool {
    *v == 0.0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Flat attribute map of one stored object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    #[serde(default)]
    left: f32,
    #[serde(default)]
    top: f32,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    scale_x: f32,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    scale_y: f32,
    #[serde(default, skip_serializing_if = "is_zero")]
    angle: f32,
    #[serde(default, skip_serializing_if = "is_false")]
    flip_x: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    flip_y: bool,
    #[serde(default = "one")]
    opacity: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stroke: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    stroke_width: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stroke_dash_array: Option<Vec<f32>>,

    // Shape geometry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rx: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ry: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x1: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y1: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x2: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y2: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,

    // Text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_weight: Option<WireWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    char_spacing: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    padding: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_align: Option<String>,

    // Image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    src: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    filters: Vec<WireFilter>,

    // Freehand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    brush_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    brush_width: Option<f32>,
}

// ─── Field decoding ──────────────────────────────────────────────────────

/// `""`, `"transparent"` and absent colors all mean "no paint".
fn parse_color(value: Option<&str>) -> Option<Color> {
    let raw = value?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("transparent") {
        return None;
    }
    let color = Color::from_hex(raw);
    if color.is_none() {
        log::warn!("unsupported color `{raw}`, dropping");
    }
    color
}

fn parse_weight(weight: Option<&WireWeight>) -> u16 {
    match weight {
        None => FontSpec::NORMAL,
        Some(WireWeight::Numeric(n)) => *n,
        Some(WireWeight::Named(name)) => match name.as_str() {
            "bold" | "bolder" => FontSpec::BOLD,
            "normal" | "" => FontSpec::NORMAL,
            "lighter" => 300,
            other => other.parse().unwrap_or(FontSpec::NORMAL),
        },
    }
}

fn emit_weight(weight: u16) -> WireWeight {
    match weight {
        FontSpec::NORMAL => WireWeight::Named("normal".into()),
        FontSpec::BOLD => WireWeight::Named("bold".into()),
        n => WireWeight::Numeric(n),
    }
}

fn parse_font_style(style: Option<&str>) -> FontStyle {
    match style {
        Some("italic") => FontStyle::Italic,
        Some("oblique") => FontStyle::Oblique,
        _ => FontStyle::Normal,
    }
}

fn emit_font_style(style: FontStyle) -> &'static str {
    match style {
        FontStyle::Normal => "normal",
        FontStyle::Italic => "italic",
        FontStyle::Oblique => "oblique",
    }
}

fn parse_align(align: Option<&str>) -> TextAlign {
    match align {
        Some("center") => TextAlign::Center,
        Some("right") => TextAlign::Right,
        Some("justify") => TextAlign::Justify,
        _ => TextAlign::Left,
    }
}

fn emit_align(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
        TextAlign::Right => "right",
        TextAlign::Justify => "justify",
    }
}

fn parse_filters(filters: &[WireFilter]) -> SmallVec<[ImageFilter; 1]> {
    filters
        .iter()
        .filter_map(|f| match f {
            WireFilter::Grayscale => Some(ImageFilter::Grayscale),
            WireFilter::Sepia => Some(ImageFilter::Sepia),
            WireFilter::Invert => Some(ImageFilter::Invert),
            WireFilter::Blur { blur } => Some(ImageFilter::Blur { amount: *blur }),
            WireFilter::Unsupported => {
                log::warn!("dropping unsupported image filter");
                None
            }
        })
        .collect()
}

fn emit_filter(filter: &ImageFilter) -> WireFilter {
    match filter {
        ImageFilter::Grayscale => WireFilter::Grayscale,
        ImageFilter::Sepia => WireFilter::Sepia,
        ImageFilter::Invert => WireFilter::Invert,
        ImageFilter::Blur { amount } => WireFilter::Blur { blur: *amount },
    }
}

fn require<T: Copy>(value: Option<T>, kind: &str, field: &'static str) -> Result<T, CodecError> {
    value.ok_or_else(|| CodecError::MissingField {
        kind: kind.to_string(),
        field,
    })
}

// ─── Object decode / encode ──────────────────────────────────────────────

fn decode_kind(wire: &mut WireObject) -> Result<ObjectKind, CodecError> {
    let tag = wire.kind.as_str();
    let shape = |g| Ok(ObjectKind::Shape(g));
    match tag {
        "i-text" | "text" | "textbox" => {
            let content = wire.text.take().ok_or_else(|| CodecError::MissingField {
                kind: tag.to_string(),
                field: "text",
            })?;
            let defaults = FontSpec::default();
            Ok(ObjectKind::Text(TextAttrs {
                content,
                font: FontSpec {
                    family: wire.font_family.take().unwrap_or(defaults.family),
                    size: wire.font_size.unwrap_or(defaults.size),
                    weight: parse_weight(wire.font_weight.as_ref()),
                    style: parse_font_style(wire.font_style.as_deref()),
                },
                underline: wire.underline.unwrap_or(false),
                letter_spacing: wire.char_spacing.unwrap_or(0.0),
                background: parse_color(wire.background_color.as_deref()),
                padding: wire.padding.unwrap_or(0.0),
                align: parse_align(wire.text_align.as_deref()),
            }))
        }
        "image" => {
            let src = wire.src.take().ok_or_else(|| CodecError::MissingField {
                kind: tag.to_string(),
                field: "src",
            })?;
            Ok(ObjectKind::Image(ImageAttrs {
                src,
                width: wire.width.unwrap_or(0.0),
                height: wire.height.unwrap_or(0.0),
                filters: parse_filters(&wire.filters),
            }))
        }
        "path" => {
            if let Some(points) = wire.points.take() {
                let brush = Brush {
                    color: parse_color(wire.brush_color.as_deref())
                        .or_else(|| parse_color(wire.stroke.as_deref()))
                        .unwrap_or(Color::BLACK),
                    width: wire.brush_width.unwrap_or(wire.stroke_width),
                };
                Ok(ObjectKind::Freehand(FreehandAttrs { points, brush }))
            } else if let Some(data) = wire.path.take() {
                shape(ShapeGeometry::Outline { data })
            } else {
                Err(CodecError::MissingField {
                    kind: tag.to_string(),
                    field: "points",
                })
            }
        }
        "outline" => {
            let data = wire.path.take().ok_or_else(|| CodecError::MissingField {
                kind: tag.to_string(),
                field: "path",
            })?;
            shape(ShapeGeometry::Outline { data })
        }
        "rect" => shape(ShapeGeometry::Rect {
            width: require(wire.width, tag, "width")?,
            height: require(wire.height, tag, "height")?,
        }),
        "triangle" => shape(ShapeGeometry::Triangle {
            width: require(wire.width, tag, "width")?,
            height: require(wire.height, tag, "height")?,
        }),
        "circle" => shape(ShapeGeometry::Circle {
            radius: require(wire.radius, tag, "radius")?,
        }),
        "ellipse" => shape(ShapeGeometry::Ellipse {
            rx: require(wire.rx, tag, "rx")?,
            ry: require(wire.ry, tag, "ry")?,
        }),
        "line" => shape(ShapeGeometry::Line {
            x1: require(wire.x1, tag, "x1")?,
            y1: require(wire.y1, tag, "y1")?,
            x2: require(wire.x2, tag, "x2")?,
            y2: require(wire.y2, tag, "y2")?,
        }),
        "polygon" => {
            let points = wire.points.take().ok_or_else(|| CodecError::MissingField {
                kind: tag.to_string(),
                field: "points",
            })?;
            shape(ShapeGeometry::Polygon { points })
        }
        other => Err(CodecError::UnknownObjectType(other.to_string())),
    }
}

fn decode_object(value: serde_json::Value) -> Result<VisualObject, CodecError> {
    let mut wire: WireObject =
        serde_json::from_value(value).map_err(|e| CodecError::InvalidStructure(e.to_string()))?;
    let kind = decode_kind(&mut wire)?;
    let id = match wire.id.as_deref() {
        Some(id) if !id.is_empty() => ObjectId::intern(id),
        _ => ObjectId::with_prefix(kind.id_prefix()),
    };
    let fill = match kind {
        ObjectKind::Shape(_) | ObjectKind::Text(_) => parse_color(wire.fill.as_deref()),
        ObjectKind::Image(_) | ObjectKind::Freehand(_) => None,
    };
    Ok(VisualObject {
        id,
        kind,
        transform: Transform {
            left: wire.left,
            top: wire.top,
            scale_x: wire.scale_x,
            scale_y: wire.scale_y,
            angle: wire.angle,
            flip_x: wire.flip_x,
            flip_y: wire.flip_y,
        },
        opacity: wire.opacity.clamp(0.0, 1.0),
        stroke: Stroke {
            color: parse_color(wire.stroke.as_deref()),
            width: wire.stroke_width,
            dash: wire.stroke_dash_array.unwrap_or_default().into(),
        },
        fill,
    })
}

fn encode_object(object: &VisualObject) -> WireObject {
    let t = &object.transform;
    let mut wire = WireObject {
        kind: String::new(),
        id: Some(object.id.to_string()),
        left: t.left,
        top: t.top,
        scale_x: t.scale_x,
        scale_y: t.scale_y,
        angle: t.angle,
        flip_x: t.flip_x,
        flip_y: t.flip_y,
        opacity: object.opacity,
        fill: object.fill.map(|c| c.to_hex()),
        stroke: object.stroke.color.map(|c| c.to_hex()),
        stroke_width: object.stroke.width,
        stroke_dash_array: (!object.stroke.dash.is_empty())
            .then(|| object.stroke.dash.to_vec()),
        ..Default::default()
    };

    match &object.kind {
        ObjectKind::Shape(geometry) => {
            wire.kind = geometry.tag().to_string();
            match geometry {
                ShapeGeometry::Rect { width, height }
                | ShapeGeometry::Triangle { width, height } => {
                    wire.width = Some(*width);
                    wire.height = Some(*height);
                }
                ShapeGeometry::Circle { radius } => wire.radius = Some(*radius),
                ShapeGeometry::Ellipse { rx, ry } => {
                    wire.rx = Some(*rx);
                    wire.ry = Some(*ry);
                }
                ShapeGeometry::Line { x1, y1, x2, y2 } => {
                    wire.x1 = Some(*x1);
                    wire.y1 = Some(*y1);
                    wire.x2 = Some(*x2);
                    wire.y2 = Some(*y2);
                }
                ShapeGeometry::Polygon { points } => wire.points = Some(points.clone()),
                ShapeGeometry::Outline { data } => wire.path = Some(data.clone()),
            }
        }
        ObjectKind::Text(text) => {
            wire.kind = "i-text".into();
            wire.text = Some(text.content.clone());
            wire.font_family = Some(text.font.family.clone());
            wire.font_size = Some(text.font.size);
            wire.font_weight = Some(emit_weight(text.font.weight));
            wire.font_style = Some(emit_font_style(text.font.style).into());
            wire.underline = Some(text.underline);
            wire.char_spacing = Some(text.letter_spacing);
            wire.background_color = text.background.map(|c| c.to_hex());
            wire.padding = Some(text.padding);
            wire.text_align = Some(emit_align(text.align).into());
        }
        ObjectKind::Image(image) => {
            wire.kind = "image".into();
            wire.src = Some(image.src.clone());
            wire.width = Some(image.width);
            wire.height = Some(image.height);
            wire.filters = image.filters.iter().map(emit_filter).collect();
        }
        ObjectKind::Freehand(path) => {
            wire.kind = "path".into();
            wire.points = Some(path.points.clone());
            wire.brush_color = Some(path.brush.color.to_hex());
            wire.brush_width = Some(path.brush.width);
        }
    }
    wire
}

// ─── Document decode / encode ────────────────────────────────────────────

/// Decode a stored design into a `Document`.
///
/// Dimensions come from the record. A record without `canvasData` is a
/// valid, empty design. Objects that fail to decode are skipped; objects
/// whose ID was already used are given a fresh one.
pub fn decode_document(record: &DesignRecord) -> Result<Document, CodecError> {
    let (width, height) = match (record.width, record.height) {
        (Some(w), Some(h)) => (w, h),
        _ => return Err(CodecError::MissingDimensions),
    };
    check_dimensions(width, height)?;

    let mut doc = Document::blank(width, height);
    doc.id = record.id.clone();
    if let Some(name) = record.name.as_ref().filter(|n| !n.is_empty()) {
        doc.name = name.clone();
    }

    let Some(payload) = &record.canvas_data else {
        log::debug!("design {:?} has no canvas data", record.id);
        return Ok(doc);
    };
    let data = payload.parse()?;
    // Absent stays absent; painting falls back to white.
    doc.background = parse_color(data.background.as_deref());

    let mut seen = HashSet::with_capacity(data.objects.len());
    for (index, value) in data.objects.into_iter().enumerate() {
        match decode_object(value) {
            Ok(mut object) => {
                if !seen.insert(object.id) {
                    let fresh = ObjectId::with_prefix(object.kind.id_prefix());
                    log::warn!("duplicate object id `{}` at {index}, renamed to `{fresh}`", object.id);
                    object.id = fresh;
                    seen.insert(fresh);
                }
                doc.objects.push(object);
            }
            Err(e) => log::warn!("skipping object {index}: {e}"),
        }
    }
    Ok(doc)
}

/// Decode, substituting a blank white canvas if the payload is malformed.
///
/// The blank keeps the record's ID and name and, when they are valid, its
/// dimensions; otherwise `fallback` dimensions are used. The decode error is
/// returned alongside so the caller can report it.
pub fn decode_document_or_blank(
    record: &DesignRecord,
    fallback: (f32, f32),
) -> (Document, Option<CodecError>) {
    match decode_document(record) {
        Ok(doc) => (doc, None),
        Err(e) => {
            log::warn!("malformed design {:?}: {e}; loading blank canvas", record.id);
            let (width, height) = match (record.width, record.height) {
                (Some(w), Some(h)) if check_dimensions(w, h).is_ok() => (w, h),
                _ => fallback,
            };
            let mut doc = Document::blank(width, height);
            doc.id = record.id.clone();
            if let Some(name) = record.name.as_ref().filter(|n| !n.is_empty()) {
                doc.name = name.clone();
            }
            (doc, Some(e))
        }
    }
}

/// Encode the canvas body as the JSON string stored in `canvasData`.
pub fn encode_canvas_data(doc: &Document) -> Result<String, CodecError> {
    let objects = doc
        .objects
        .iter()
        .map(|o| serde_json::to_value(encode_object(o)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    let data = CanvasData {
        version: CANVAS_FORMAT_VERSION.to_string(),
        background: doc.background.map(|c| c.to_hex()),
        objects,
    };
    serde_json::to_string(&data).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Encode a whole design record ready for the store.
pub fn encode_document(
    doc: &Document,
    category: Option<String>,
) -> Result<DesignRecord, CodecError> {
    doc.validate()?;
    Ok(DesignRecord {
        id: doc.id.clone(),
        name: Some(doc.name.clone()),
        width: Some(doc.width),
        height: Some(doc.height),
        canvas_data: Some(CanvasPayload::Encoded(encode_canvas_data(doc)?)),
        category,
        updated_at: None,
    })
}

// ─── Construction instructions ───────────────────────────────────────────

/// One step of rebuilding a live scene from a document, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneInstruction {
    Resize { width: f32, height: f32 },
    Background(Color),
    /// Insert on top of everything inserted so far.
    Insert(VisualObject),
}

impl Document {
    /// The ordered steps that reconstruct this document on a live surface:
    /// dimensions, background, then objects bottom to top.
    pub fn instructions(&self) -> Vec<SceneInstruction> {
        let mut steps = Vec::with_capacity(self.objects.len() + 2);
        steps.push(SceneInstruction::Resize {
            width: self.width,
            height: self.height,
        });
        steps.push(SceneInstruction::Background(self.effective_background()));
        steps.extend(self.objects.iter().cloned().map(SceneInstruction::Insert));
        steps
    }
}

/// Decode a stored design straight into construction instructions.
pub fn deserialize(record: &DesignRecord) -> Result<Vec<SceneInstruction>, CodecError> {
    decode_document(record).map(|doc| doc.instructions())
}
