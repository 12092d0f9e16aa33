//! Free-drawing brush state.
//!
//! The surface does the actual stroking; this type only tracks which brush
//! should be active so toggles and panel edits produce the right
//! [`BrushSettings`] to hand to [`RenderSurface::set_free_drawing`].
//!
//! [`RenderSurface::set_free_drawing`]: crate::surface::RenderSurface::set_free_drawing

use ab_core::{Brush, Color};

use crate::config::EditorConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushSettings {
    pub color: Color,
    pub width: f32,
    /// `0.0..=1.0`, applied to the finished stroke.
    pub opacity: f32,
}

impl BrushSettings {
    pub fn brush(&self) -> Brush {
        Brush {
            color: self.color,
            width: self.width,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawingBrush {
    drawing: bool,
    erasing: bool,
    pen: BrushSettings,
    eraser: BrushSettings,
}

impl DrawingBrush {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            drawing: false,
            erasing: false,
            pen: BrushSettings {
                color: config.brush(),
                width: config.brush_width,
                opacity: 1.0,
            },
            eraser: BrushSettings {
                color: config.background(),
                width: config.eraser_width,
                opacity: 1.0,
            },
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_erasing(&self) -> bool {
        self.drawing && self.erasing
    }

    /// Settings the surface should draw with, or `None` when drawing is off.
    pub fn active(&self) -> Option<BrushSettings> {
        match (self.drawing, self.erasing) {
            (false, _) => None,
            (true, false) => Some(self.pen),
            (true, true) => Some(self.eraser),
        }
    }

    pub fn pen(&self) -> BrushSettings {
        self.pen
    }

    /// Switch free drawing on or off. Turning it off also leaves eraser
    /// mode.
    pub fn toggle_drawing(&mut self) -> Option<BrushSettings> {
        self.drawing = !self.drawing;
        if !self.drawing {
            self.erasing = false;
        }
        self.active()
    }

    /// Swap between pen and eraser. Enabling the eraser turns drawing on.
    pub fn toggle_erase(&mut self) -> Option<BrushSettings> {
        self.erasing = !self.erasing;
        if self.erasing {
            self.drawing = true;
        }
        self.active()
    }

    /// Update the pen. Values left as `None` keep their current setting.
    pub fn update(
        &mut self,
        color: Option<Color>,
        width: Option<f32>,
        opacity: Option<f32>,
    ) -> Option<BrushSettings> {
        if let Some(color) = color {
            self.pen.color = color;
        }
        if let Some(width) = width {
            self.pen.width = width.max(1.0);
        }
        if let Some(opacity) = opacity {
            self.pen.opacity = opacity.clamp(0.0, 1.0);
        }
        self.active()
    }
}
