//! Named shape presets offered by the elements panel.
//!
//! Each preset produces a fresh `VisualObject` with a generated ID and the
//! preset's default geometry, filled black unless the shape is stroke-only.

use crate::model::*;
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapePreset {
    Rectangle,
    Square,
    Circle,
    Ellipse,
    Triangle,
    Line,
    Star,
    Pentagon,
    Hexagon,
    Octagon,
    Arrow,
    DoubleArrow,
    ElbowConnector,
    Heart,
}

const ARROW: &str = "M 20,40 L 150,40 L 150,20 L 200,50 L 150,80 L 150,60 L 20,60 z";
const DOUBLE_ARROW: &str =
    "M 20,40 L 180,40 L 180,20 L 220,50 L 180,80 L 180,60 L 20,60 L 20,80 L 0,50 L 20,20 z";
const ELBOW: &str = "M 20,20 L 20,80 L 80,80";
const HEART: &str = "M 50,30 C 50,25 45,15 30,15 C 10,15 10,40 10,40 C 10,55 30,75 50,90 \
                     C 70,75 90,55 90,40 C 90,40 90,15 70,15 C 55,15 50,25 50,30 z";

impl ShapePreset {
    pub const ALL: [ShapePreset; 14] = [
        ShapePreset::Rectangle,
        ShapePreset::Square,
        ShapePreset::Circle,
        ShapePreset::Ellipse,
        ShapePreset::Triangle,
        ShapePreset::Line,
        ShapePreset::Star,
        ShapePreset::Pentagon,
        ShapePreset::Hexagon,
        ShapePreset::Octagon,
        ShapePreset::Arrow,
        ShapePreset::DoubleArrow,
        ShapePreset::ElbowConnector,
        ShapePreset::Heart,
    ];

    /// Look up a preset by its panel key (`"rectangle"`, `"doubleArrow"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapePreset::Rectangle => "rectangle",
            ShapePreset::Square => "square",
            ShapePreset::Circle => "circle",
            ShapePreset::Ellipse => "ellipse",
            ShapePreset::Triangle => "triangle",
            ShapePreset::Line => "line",
            ShapePreset::Star => "star",
            ShapePreset::Pentagon => "pentagon",
            ShapePreset::Hexagon => "hexagon",
            ShapePreset::Octagon => "octagon",
            ShapePreset::Arrow => "arrow",
            ShapePreset::DoubleArrow => "doubleArrow",
            ShapePreset::ElbowConnector => "elbowConnector",
            ShapePreset::Heart => "heart",
        }
    }

    pub fn geometry(self) -> ShapeGeometry {
        match self {
            ShapePreset::Rectangle => ShapeGeometry::Rect {
                width: 100.0,
                height: 60.0,
            },
            ShapePreset::Square => ShapeGeometry::Rect {
                width: 80.0,
                height: 80.0,
            },
            ShapePreset::Circle => ShapeGeometry::Circle { radius: 50.0 },
            ShapePreset::Ellipse => ShapeGeometry::Ellipse { rx: 60.0, ry: 30.0 },
            ShapePreset::Triangle => ShapeGeometry::Triangle {
                width: 80.0,
                height: 80.0,
            },
            ShapePreset::Line => ShapeGeometry::Line {
                x1: 50.0,
                y1: 50.0,
                x2: 200.0,
                y2: 50.0,
            },
            ShapePreset::Star => ShapeGeometry::Polygon {
                points: star_points(5, 30.0, 15.0),
            },
            ShapePreset::Pentagon => ShapeGeometry::Polygon {
                points: regular_polygon(5, 30.0, -PI / 2.0),
            },
            ShapePreset::Hexagon => ShapeGeometry::Polygon {
                points: regular_polygon(6, 30.0, 0.0),
            },
            ShapePreset::Octagon => ShapeGeometry::Polygon {
                points: regular_polygon(8, 30.0, 0.0),
            },
            ShapePreset::Arrow => outline(ARROW),
            ShapePreset::DoubleArrow => outline(DOUBLE_ARROW),
            ShapePreset::ElbowConnector => outline(ELBOW),
            ShapePreset::Heart => outline(HEART),
        }
    }

    /// Stroke-only presets have no fill and a 5px black stroke.
    pub fn is_stroke_only(self) -> bool {
        matches!(self, ShapePreset::Line | ShapePreset::ElbowConnector)
    }

    /// Build a new object for this preset at `(left, top)`.
    pub fn build(self, left: f32, top: f32) -> VisualObject {
        let mut object = VisualObject::with_generated_id(ObjectKind::Shape(self.geometry()));
        object.transform = Transform::at(left, top);
        if self.is_stroke_only() {
            object.stroke.color = Some(Color::BLACK);
            object.stroke.width = 5.0;
        } else {
            object.fill = Some(Color::BLACK);
        }
        object
    }
}

fn outline(data: &str) -> ShapeGeometry {
    ShapeGeometry::Outline { data: data.into() }
}

fn regular_polygon(sides: usize, radius: f32, start_angle: f32) -> Vec<Point> {
    let center = Point::new(50.0, 50.0);
    (0..sides)
        .map(|i| {
            let angle = (i as f32 * 2.0 * PI) / sides as f32 + start_angle;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

fn star_points(points: usize, outer: f32, inner: f32) -> Vec<Point> {
    let center = Point::new(50.0, 50.0);
    (0..points * 2)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            let angle = (i as f32 * PI) / points as f32;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for preset in ShapePreset::ALL {
            assert_eq!(ShapePreset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(ShapePreset::from_name("blob"), None);
    }

    #[test]
    fn star_alternates_radii() {
        let ShapeGeometry::Polygon { points } = ShapePreset::Star.geometry() else {
            panic!("star should be a polygon");
        };
        assert_eq!(points.len(), 10);
        let dist = |p: &Point| ((p.x - 50.0).powi(2) + (p.y - 50.0).powi(2)).sqrt();
        assert!((dist(&points[0]) - 30.0).abs() < 1e-3);
        assert!((dist(&points[1]) - 15.0).abs() < 1e-3);
    }

    #[test]
    fn line_is_stroke_only() {
        let line = ShapePreset::Line.build(100.0, 100.0);
        assert_eq!(line.fill, None);
        assert_eq!(line.stroke.width, 5.0);
        assert!(line.id.as_str().starts_with("line-"));

        let rect = ShapePreset::Rectangle.build(100.0, 100.0);
        assert_eq!(rect.fill, Some(Color::BLACK));
        assert_eq!(rect.transform.left, 100.0);
    }
}
