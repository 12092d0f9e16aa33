//! Scene document model for Artboard designs.
//!
//! A design is a flat, ordered list of visual objects painted bottom to top:
//! index 0 is the back-most object. Every object carries an `ObjectId` that
//! is unique within its document and stays attached to the object for its
//! whole lifetime, so the live rendering surface can key its own parallel
//! representation by the same IDs.

use crate::codec::CodecError;
use crate::id::ObjectId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Colors ──────────────────────────────────────────────────────────────

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let short = |i: usize| hex_val(bytes[i]).map(|v| v * 17);
        let long = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);

        match bytes.len() {
            3 => Some(Self::rgb(short(0)?, short(1)?, short(2)?)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgb(long(0)?, long(2)?, long(4)?)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Lowercase `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Placement of an object on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub left: f32,
    pub top: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Rotation in degrees.
    pub angle: f32,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }
}

impl Transform {
    pub fn at(left: f32, top: f32) -> Self {
        Self {
            left,
            top,
            ..Default::default()
        }
    }
}

// ─── Stroke ──────────────────────────────────────────────────────────────

/// Outline of an object. An empty dash pattern draws a solid line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Option<Color>,
    pub width: f32,
    pub dash: SmallVec<[f32; 2]>,
}

// ─── Text ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    pub weight: u16, // 100..900
    pub style: FontStyle,
}

impl FontSpec {
    pub const NORMAL: u16 = 400;
    pub const BOLD: u16 = 700;

    pub fn is_bold(&self) -> bool {
        self.weight >= Self::BOLD
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Arial".into(),
            size: 24.0,
            weight: Self::NORMAL,
            style: FontStyle::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextAttrs {
    pub content: String,
    pub font: FontSpec,
    pub underline: bool,
    /// Tracking in thousandths of an em.
    pub letter_spacing: f32,
    pub background: Option<Color>,
    pub padding: f32,
    pub align: TextAlign,
}

// ─── Images ──────────────────────────────────────────────────────────────

/// A non-destructive image filter. Filters apply in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImageFilter {
    Grayscale,
    Sepia,
    Invert,
    /// Blur strength in `0.0..=1.0`.
    Blur { amount: f32 },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageAttrs {
    /// Source reference (URL or data URI).
    pub src: String,
    /// Natural (unscaled) width of the bitmap.
    pub width: f32,
    pub height: f32,
    pub filters: SmallVec<[ImageFilter; 1]>,
}

// ─── Freehand ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub color: Color,
    pub width: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FreehandAttrs {
    pub points: Vec<Point>,
    pub brush: Brush,
}

// ─── Shapes ──────────────────────────────────────────────────────────────

/// Geometry of a vector shape, relative to the object's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeometry {
    Rect { width: f32, height: f32 },
    Circle { radius: f32 },
    Ellipse { rx: f32, ry: f32 },
    Triangle { width: f32, height: f32 },
    Line { x1: f32, y1: f32, x2: f32, y2: f32 },
    Polygon { points: Vec<Point> },
    /// Closed or open SVG path outline (arrows, hearts, connectors).
    Outline { data: String },
}

impl ShapeGeometry {
    /// Type tag used by the stored canvas format.
    pub fn tag(&self) -> &'static str {
        match self {
            ShapeGeometry::Rect { .. } => "rect",
            ShapeGeometry::Circle { .. } => "circle",
            ShapeGeometry::Ellipse { .. } => "ellipse",
            ShapeGeometry::Triangle { .. } => "triangle",
            ShapeGeometry::Line { .. } => "line",
            ShapeGeometry::Polygon { .. } => "polygon",
            ShapeGeometry::Outline { .. } => "outline",
        }
    }

    /// Unscaled bounding extents.
    pub fn extents(&self) -> (f32, f32) {
        match self {
            ShapeGeometry::Rect { width, height } | ShapeGeometry::Triangle { width, height } => {
                (*width, *height)
            }
            ShapeGeometry::Circle { radius } => (radius * 2.0, radius * 2.0),
            ShapeGeometry::Ellipse { rx, ry } => (rx * 2.0, ry * 2.0),
            ShapeGeometry::Line { x1, y1, x2, y2 } => ((x2 - x1).abs(), (y2 - y1).abs()),
            ShapeGeometry::Polygon { points } => points_extents(points),
            // Outline bounds need a path parser; the renderer owns that.
            ShapeGeometry::Outline { .. } => (0.0, 0.0),
        }
    }
}

fn points_extents(points: &[Point]) -> (f32, f32) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    (max_x - min_x, max_y - min_y)
}

// ─── Visual objects ──────────────────────────────────────────────────────

/// Variant-specific payload of a visual object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Shape(ShapeGeometry),
    Text(TextAttrs),
    Image(ImageAttrs),
    Freehand(FreehandAttrs),
}

/// Field-less discriminant of [`ObjectKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectVariant {
    Shape,
    Text,
    Image,
    Freehand,
}

impl ObjectKind {
    pub fn variant(&self) -> ObjectVariant {
        match self {
            ObjectKind::Shape(_) => ObjectVariant::Shape,
            ObjectKind::Text(_) => ObjectVariant::Text,
            ObjectKind::Image(_) => ObjectVariant::Image,
            ObjectKind::Freehand(_) => ObjectVariant::Freehand,
        }
    }

    /// Prefix used when generating IDs for new objects of this kind.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ObjectKind::Shape(geometry) => geometry.tag(),
            ObjectKind::Text(_) => "text",
            ObjectKind::Image(_) => "image",
            ObjectKind::Freehand(_) => "path",
        }
    }
}

/// One entry of a design's paint list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub transform: Transform,
    /// `0.0..=1.0`.
    pub opacity: f32,
    pub stroke: Stroke,
    /// Only meaningful for shapes and text.
    pub fill: Option<Color>,
}

impl VisualObject {
    pub fn new(id: ObjectId, kind: ObjectKind) -> Self {
        Self {
            id,
            kind,
            transform: Transform::default(),
            opacity: 1.0,
            stroke: Stroke::default(),
            fill: None,
        }
    }

    /// Create an object with a freshly generated, type-prefixed ID.
    pub fn with_generated_id(kind: ObjectKind) -> Self {
        let id = ObjectId::with_prefix(kind.id_prefix());
        Self::new(id, kind)
    }

    pub fn variant(&self) -> ObjectVariant {
        self.kind.variant()
    }

    /// Unscaled extents. Text extents depend on font metrics and are
    /// approximated from the font size.
    pub fn extents(&self) -> (f32, f32) {
        match &self.kind {
            ObjectKind::Shape(geometry) => geometry.extents(),
            ObjectKind::Text(text) => {
                let longest = text
                    .content
                    .lines()
                    .map(|l| l.chars().count())
                    .max()
                    .unwrap_or(0);
                let lines = text.content.lines().count().max(1);
                (
                    longest as f32 * text.font.size * 0.5 + text.padding * 2.0,
                    lines as f32 * text.font.size * 1.16 + text.padding * 2.0,
                )
            }
            ObjectKind::Image(image) => (image.width, image.height),
            ObjectKind::Freehand(path) => points_extents(&path.points),
        }
    }

    /// Extents after applying the object's scale.
    pub fn scaled_extents(&self) -> (f32, f32) {
        let (w, h) = self.extents();
        (w * self.transform.scale_x, h * self.transform.scale_y)
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// A complete design: canvas dimensions, background, and paint list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store key. `None` until the design has been persisted once.
    pub id: Option<String>,
    pub name: String,
    pub width: f32,
    pub height: f32,
    /// `None` renders as white.
    pub background: Option<Color>,
    /// Paint order, bottom first.
    pub objects: Vec<VisualObject>,
}

impl Document {
    pub const DEFAULT_NAME: &'static str = "Untitled Design";

    /// An empty white canvas.
    pub fn blank(width: f32, height: f32) -> Self {
        Self {
            id: None,
            name: Self::DEFAULT_NAME.to_string(),
            width,
            height,
            background: Some(Color::WHITE),
            objects: Vec::new(),
        }
    }

    /// Background as painted: white when unset.
    pub fn effective_background(&self) -> Color {
        self.background.unwrap_or(Color::WHITE)
    }

    /// Check the structural invariants: positive finite dimensions and
    /// unique object IDs.
    pub fn validate(&self) -> Result<(), CodecError> {
        check_dimensions(self.width, self.height)?;
        let mut seen = std::collections::HashSet::with_capacity(self.objects.len());
        for object in &self.objects {
            if !seen.insert(object.id) {
                return Err(CodecError::DuplicateId(object.id.to_string()));
            }
        }
        Ok(())
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&VisualObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut VisualObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    /// Append on top of the paint order. Rejects a duplicate ID.
    pub fn push(&mut self, object: VisualObject) -> Result<(), CodecError> {
        if self.get(object.id).is_some() {
            return Err(CodecError::DuplicateId(object.id.to_string()));
        }
        self.objects.push(object);
        Ok(())
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<VisualObject> {
        let idx = self.index_of(id)?;
        Some(self.objects.remove(idx))
    }

    /// Move an object to the top of the paint order.
    /// Returns true if the order changed.
    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let last = self.objects.len().saturating_sub(1);
        match self.index_of(id) {
            Some(pos) => move_within(&mut self.objects, pos, last),
            None => false,
        }
    }

    /// Move an object to the bottom of the paint order.
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(pos) => move_within(&mut self.objects, pos, 0),
            None => false,
        }
    }

    /// Swap an object with the one above it.
    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos + 1 < self.objects.len() => {
                move_within(&mut self.objects, pos, pos + 1)
            }
            _ => false,
        }
    }

    /// Swap an object with the one below it.
    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos > 0 => move_within(&mut self.objects, pos, pos - 1),
            _ => false,
        }
    }
}

/// Move the element at `from` to `to`, shifting the rest. Returns true if
/// anything moved.
pub fn move_within<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from == to || from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

pub(crate) fn check_dimensions(width: f32, height: f32) -> Result<(), CodecError> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(())
    } else {
        Err(CodecError::InvalidDimensions { width, height })
    }
}
