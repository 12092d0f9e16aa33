//! Typed property edits applied to a single visual object.
//!
//! Each variant corresponds to one attribute the properties panel can set.
//! [`ObjectProperty::from_name_value`] accepts the panel's untyped
//! `(name, value)` pairs using the stored format's attribute names.

use ab_core::{Color, FontStyle, ImageFilter, ObjectKind, VisualObject};
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::SurfaceError;

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProperty {
    Opacity(f32),
    Left(f32),
    Top(f32),
    ScaleX(f32),
    ScaleY(f32),
    Angle(f32),
    FlipX(bool),
    FlipY(bool),
    Fill(Option<Color>),
    Stroke(Option<Color>),
    StrokeWidth(f32),
    StrokeDashArray(SmallVec<[f32; 2]>),
    Text(String),
    FontSize(f32),
    FontFamily(String),
    FontWeight(u16),
    FontStyle(FontStyle),
    Underline(bool),
    LetterSpacing(f32),
    TextBackground(Option<Color>),
    Filters(SmallVec<[ImageFilter; 1]>),
}

impl ObjectProperty {
    /// Attribute name in the stored canvas format.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectProperty::Opacity(_) => "opacity",
            ObjectProperty::Left(_) => "left",
            ObjectProperty::Top(_) => "top",
            ObjectProperty::ScaleX(_) => "scaleX",
            ObjectProperty::ScaleY(_) => "scaleY",
            ObjectProperty::Angle(_) => "angle",
            ObjectProperty::FlipX(_) => "flipX",
            ObjectProperty::FlipY(_) => "flipY",
            ObjectProperty::Fill(_) => "fill",
            ObjectProperty::Stroke(_) => "stroke",
            ObjectProperty::StrokeWidth(_) => "strokeWidth",
            ObjectProperty::StrokeDashArray(_) => "strokeDashArray",
            ObjectProperty::Text(_) => "text",
            ObjectProperty::FontSize(_) => "fontSize",
            ObjectProperty::FontFamily(_) => "fontFamily",
            ObjectProperty::FontWeight(_) => "fontWeight",
            ObjectProperty::FontStyle(_) => "fontStyle",
            ObjectProperty::Underline(_) => "underline",
            ObjectProperty::LetterSpacing(_) => "charSpacing",
            ObjectProperty::TextBackground(_) => "backgroundColor",
            ObjectProperty::Filters(_) => "filters",
        }
    }

    /// Parse an untyped edit. Returns `None` for unknown names or values of
    /// the wrong type.
    pub fn from_name_value(name: &str, value: &Value) -> Option<Self> {
        let number = || value.as_f64().map(|v| v as f32);
        let color = || match value {
            Value::Null => Some(None),
            Value::String(s) if s.is_empty() || s == "transparent" => Some(None),
            Value::String(s) => Color::from_hex(s).map(Some),
            _ => None,
        };
        Some(match name {
            "opacity" => ObjectProperty::Opacity(number()?),
            "left" => ObjectProperty::Left(number()?),
            "top" => ObjectProperty::Top(number()?),
            "scaleX" => ObjectProperty::ScaleX(number()?),
            "scaleY" => ObjectProperty::ScaleY(number()?),
            "angle" => ObjectProperty::Angle(number()?),
            "flipX" => ObjectProperty::FlipX(value.as_bool()?),
            "flipY" => ObjectProperty::FlipY(value.as_bool()?),
            "fill" => ObjectProperty::Fill(color()?),
            "stroke" => ObjectProperty::Stroke(color()?),
            "strokeWidth" => ObjectProperty::StrokeWidth(number()?),
            "strokeDashArray" => ObjectProperty::StrokeDashArray(match value {
                Value::Null => SmallVec::new(),
                Value::Array(items) => items
                    .iter()
                    .map(|v| v.as_f64().map(|v| v as f32))
                    .collect::<Option<_>>()?,
                _ => return None,
            }),
            "text" => ObjectProperty::Text(value.as_str()?.to_string()),
            "fontSize" => ObjectProperty::FontSize(number()?),
            "fontFamily" => ObjectProperty::FontFamily(value.as_str()?.to_string()),
            "fontWeight" => ObjectProperty::FontWeight(match value {
                Value::String(s) if s == "bold" => ab_core::FontSpec::BOLD,
                Value::String(s) if s == "normal" => ab_core::FontSpec::NORMAL,
                Value::String(s) => s.parse().ok()?,
                _ => value.as_u64()? as u16,
            }),
            "fontStyle" => ObjectProperty::FontStyle(match value.as_str()? {
                "normal" => FontStyle::Normal,
                "italic" => FontStyle::Italic,
                "oblique" => FontStyle::Oblique,
                _ => return None,
            }),
            "underline" => ObjectProperty::Underline(value.as_bool()?),
            "charSpacing" => ObjectProperty::LetterSpacing(number()?),
            "backgroundColor" => ObjectProperty::TextBackground(color()?),
            _ => return None,
        })
    }

    /// Write this property into `object`. Returns true if the object
    /// changed; setting a value it already holds is a no-op.
    pub fn apply(&self, object: &mut VisualObject) -> Result<bool, SurfaceError> {
        let variant = object.variant();
        let mismatch = || SurfaceError::PropertyMismatch {
            property: self.name(),
            variant,
        };
        let changed = match (self, &mut object.kind) {
            (ObjectProperty::Opacity(v), _) => set(&mut object.opacity, v.clamp(0.0, 1.0)),
            (ObjectProperty::Left(v), _) => set(&mut object.transform.left, *v),
            (ObjectProperty::Top(v), _) => set(&mut object.transform.top, *v),
            (ObjectProperty::ScaleX(v), _) => set(&mut object.transform.scale_x, *v),
            (ObjectProperty::ScaleY(v), _) => set(&mut object.transform.scale_y, *v),
            (ObjectProperty::Angle(v), _) => set(&mut object.transform.angle, *v),
            (ObjectProperty::FlipX(v), _) => set(&mut object.transform.flip_x, *v),
            (ObjectProperty::FlipY(v), _) => set(&mut object.transform.flip_y, *v),
            (ObjectProperty::Fill(v), ObjectKind::Shape(_) | ObjectKind::Text(_)) => {
                set(&mut object.fill, *v)
            }
            (ObjectProperty::Stroke(v), _) => set(&mut object.stroke.color, *v),
            (ObjectProperty::StrokeWidth(v), _) => set(&mut object.stroke.width, v.max(0.0)),
            (ObjectProperty::StrokeDashArray(v), _) => set(&mut object.stroke.dash, v.clone()),
            (ObjectProperty::Text(v), ObjectKind::Text(text)) => set(&mut text.content, v.clone()),
            (ObjectProperty::FontSize(v), ObjectKind::Text(text)) => set(&mut text.font.size, *v),
            (ObjectProperty::FontFamily(v), ObjectKind::Text(text)) => {
                set(&mut text.font.family, v.clone())
            }
            (ObjectProperty::FontWeight(v), ObjectKind::Text(text)) => {
                set(&mut text.font.weight, *v)
            }
            (ObjectProperty::FontStyle(v), ObjectKind::Text(text)) => set(&mut text.font.style, *v),
            (ObjectProperty::Underline(v), ObjectKind::Text(text)) => set(&mut text.underline, *v),
            (ObjectProperty::LetterSpacing(v), ObjectKind::Text(text)) => {
                set(&mut text.letter_spacing, *v)
            }
            (ObjectProperty::TextBackground(v), ObjectKind::Text(text)) => {
                set(&mut text.background, *v)
            }
            (ObjectProperty::Filters(v), ObjectKind::Image(image)) => {
                set(&mut image.filters, v.clone())
            }
            _ => return Err(mismatch()),
        };
        Ok(changed)
    }
}

fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
