//! Selection ↔ properties panel sync.
//!
//! Tracks what is selected on the surface and keeps a [`PropertyForm`]
//! decoded from it. Edits from the panel go back to the surface as
//! [`ObjectProperty`] writes; an edit that does not change anything is not
//! reported as a modification.

use ab_core::{
    Color, FontSpec, FontStyle, ImageFilter, ObjectId, ObjectKind, ObjectVariant, VisualObject,
};
use smallvec::SmallVec;

use crate::error::SceneError;
use crate::property::ObjectProperty;
use crate::surface::{RenderSurface, SurfaceEvent, SurfaceEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    NoSelection,
    Selected {
        id: ObjectId,
        variant: ObjectVariant,
    },
}

// ─── Form values ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl BorderStyle {
    /// `[5, 5]` is dashed, `[2, 2]` is dotted, anything else is solid.
    pub fn from_dash(dash: &[f32]) -> Self {
        match dash {
            [a, b] if *a == 5.0 && *b == 5.0 => BorderStyle::Dashed,
            [a, b] if *a == 2.0 && *b == 2.0 => BorderStyle::Dotted,
            _ => BorderStyle::Solid,
        }
    }

    pub fn dash(self) -> SmallVec<[f32; 2]> {
        match self {
            BorderStyle::Solid => SmallVec::new(),
            BorderStyle::Dashed => SmallVec::from_slice(&[5.0, 5.0]),
            BorderStyle::Dotted => SmallVec::from_slice(&[2.0, 2.0]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterChoice {
    #[default]
    None,
    Grayscale,
    Sepia,
    Invert,
    Blur,
}

impl FilterChoice {
    pub fn name(self) -> &'static str {
        match self {
            FilterChoice::None => "none",
            FilterChoice::Grayscale => "grayscale",
            FilterChoice::Sepia => "sepia",
            FilterChoice::Invert => "invert",
            FilterChoice::Blur => "blur",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            FilterChoice::None,
            FilterChoice::Grayscale,
            FilterChoice::Sepia,
            FilterChoice::Invert,
            FilterChoice::Blur,
        ]
        .into_iter()
        .find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextForm {
    pub content: String,
    pub font_family: String,
    pub font_size: f32,
    pub color: Option<Color>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub letter_spacing: f32,
    pub background: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageForm {
    pub filter: FilterChoice,
    /// Blur strength in percent, `0..=100`.
    pub blur: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantForm {
    Text(TextForm),
    Image(ImageForm),
    Path,
    Shape { fill: Option<Color> },
}

/// The panel's view of the selected object.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyForm {
    /// Percent, `0..=100`.
    pub opacity: u8,
    pub width: f32,
    pub height: f32,
    pub border_color: Option<Color>,
    pub border_width: f32,
    pub border_style: BorderStyle,
    pub details: VariantForm,
}

impl PropertyForm {
    pub fn read(object: &VisualObject) -> Self {
        let (width, height) = object.scaled_extents();
        let details = match &object.kind {
            ObjectKind::Text(text) => VariantForm::Text(TextForm {
                content: text.content.clone(),
                font_family: text.font.family.clone(),
                font_size: text.font.size,
                color: object.fill,
                bold: text.font.is_bold(),
                italic: text.font.style == FontStyle::Italic,
                underline: text.underline,
                letter_spacing: text.letter_spacing,
                background: text.background,
            }),
            ObjectKind::Image(image) => VariantForm::Image(read_filter(&image.filters)),
            ObjectKind::Freehand(_) => VariantForm::Path,
            ObjectKind::Shape(_) => VariantForm::Shape { fill: object.fill },
        };
        Self {
            opacity: opacity_percent(object.opacity),
            width: width.round(),
            height: height.round(),
            border_color: object.stroke.color,
            border_width: object.stroke.width,
            border_style: BorderStyle::from_dash(&object.stroke.dash),
            details,
        }
    }
}

/// A zero opacity reads as fully opaque, as the panel has always shown it.
fn opacity_percent(opacity: f32) -> u8 {
    match (opacity.clamp(0.0, 1.0) * 100.0).round() as u8 {
        0 => 100,
        pct => pct,
    }
}

/// Only the first filter of the chain is shown.
fn read_filter(filters: &[ImageFilter]) -> ImageForm {
    match filters.first() {
        None => ImageForm {
            filter: FilterChoice::None,
            blur: 0,
        },
        Some(ImageFilter::Grayscale) => ImageForm {
            filter: FilterChoice::Grayscale,
            blur: 0,
        },
        Some(ImageFilter::Sepia) => ImageForm {
            filter: FilterChoice::Sepia,
            blur: 0,
        },
        Some(ImageFilter::Invert) => ImageForm {
            filter: FilterChoice::Invert,
            blur: 0,
        },
        Some(ImageFilter::Blur { amount }) => ImageForm {
            filter: FilterChoice::Blur,
            blur: (amount.clamp(0.0, 1.0) * 100.0).round() as u8,
        },
    }
}

// ─── Sync ────────────────────────────────────────────────────────────────

/// Result of a panel edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    NoSelection,
    Unchanged,
    /// The surface changed; the session should be marked modified.
    Applied,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionSync {
    state: SelectionState,
    form: Option<PropertyForm>,
}

impl SelectionSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn selected(&self) -> Option<ObjectId> {
        match self.state {
            SelectionState::Selected { id, .. } => Some(id),
            SelectionState::NoSelection => None,
        }
    }

    pub fn form(&self) -> Option<&PropertyForm> {
        self.form.as_ref()
    }

    /// React to a surface selection or modification event.
    pub fn on_event<S: RenderSurface>(&mut self, surface: &S, event: &SurfaceEvent) {
        match event.kind {
            SurfaceEventKind::SelectionCreated | SurfaceEventKind::SelectionUpdated => {
                self.refresh(surface)
            }
            SurfaceEventKind::SelectionCleared => self.clear(),
            SurfaceEventKind::ObjectModified | SurfaceEventKind::ObjectRemoved
                if event.target.is_some() && event.target == self.selected() =>
            {
                self.refresh(surface)
            }
            _ => {}
        }
    }

    /// Re-read the form from the surface's active object.
    pub fn refresh<S: RenderSurface>(&mut self, surface: &S) {
        match surface.active_object().and_then(|id| surface.to_plain(id)) {
            Some(object) => {
                self.state = SelectionState::Selected {
                    id: object.id,
                    variant: object.variant(),
                };
                self.form = Some(PropertyForm::read(&object));
            }
            None => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.state = SelectionState::NoSelection;
        self.form = None;
    }

    /// Write one property to the selected object. Without a selection this
    /// is a no-op.
    pub fn apply_property<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        property: ObjectProperty,
    ) -> Result<EditOutcome, SceneError> {
        let Some(id) = self.selected() else {
            return Ok(EditOutcome::NoSelection);
        };
        if !surface.set_property(id, &property)? {
            return Ok(EditOutcome::Unchanged);
        }
        log::trace!("set {} on {id}", property.name());
        surface.request_render();
        self.refresh(&*surface);
        Ok(EditOutcome::Applied)
    }

    fn selected_object<S: RenderSurface>(&self, surface: &S) -> Option<VisualObject> {
        self.selected().and_then(|id| surface.to_plain(id))
    }

    /// Set opacity from a panel percentage.
    pub fn set_opacity<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        percent: u8,
    ) -> Result<EditOutcome, SceneError> {
        let opacity = f32::from(percent.min(100)) / 100.0;
        self.apply_property(surface, ObjectProperty::Opacity(opacity))
    }

    pub fn set_border_style<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        style: BorderStyle,
    ) -> Result<EditOutcome, SceneError> {
        self.apply_property(surface, ObjectProperty::StrokeDashArray(style.dash()))
    }

    pub fn flip_horizontal<S: RenderSurface>(
        &mut self,
        surface: &mut S,
    ) -> Result<EditOutcome, SceneError> {
        let Some(object) = self.selected_object(surface) else {
            return Ok(EditOutcome::NoSelection);
        };
        let flipped = !object.transform.flip_x;
        self.apply_property(surface, ObjectProperty::FlipX(flipped))
    }

    pub fn flip_vertical<S: RenderSurface>(
        &mut self,
        surface: &mut S,
    ) -> Result<EditOutcome, SceneError> {
        let Some(object) = self.selected_object(surface) else {
            return Ok(EditOutcome::NoSelection);
        };
        let flipped = !object.transform.flip_y;
        self.apply_property(surface, ObjectProperty::FlipY(flipped))
    }

    pub fn toggle_bold<S: RenderSurface>(
        &mut self,
        surface: &mut S,
    ) -> Result<EditOutcome, SceneError> {
        let Some(form) = self.text_form() else {
            return Ok(EditOutcome::NoSelection);
        };
        let weight = if form.bold {
            FontSpec::NORMAL
        } else {
            FontSpec::BOLD
        };
        self.apply_property(surface, ObjectProperty::FontWeight(weight))
    }

    pub fn toggle_italic<S: RenderSurface>(
        &mut self,
        surface: &mut S,
    ) -> Result<EditOutcome, SceneError> {
        let Some(form) = self.text_form() else {
            return Ok(EditOutcome::NoSelection);
        };
        let style = if form.italic {
            FontStyle::Normal
        } else {
            FontStyle::Italic
        };
        self.apply_property(surface, ObjectProperty::FontStyle(style))
    }

    pub fn toggle_underline<S: RenderSurface>(
        &mut self,
        surface: &mut S,
    ) -> Result<EditOutcome, SceneError> {
        let Some(form) = self.text_form() else {
            return Ok(EditOutcome::NoSelection);
        };
        let underline = !form.underline;
        self.apply_property(surface, ObjectProperty::Underline(underline))
    }

    fn text_form(&self) -> Option<&TextForm> {
        match &self.form.as_ref()?.details {
            VariantForm::Text(text) => Some(text),
            _ => None,
        }
    }

    fn image_form(&self) -> Option<ImageForm> {
        match &self.form.as_ref()?.details {
            VariantForm::Image(image) => Some(*image),
            _ => None,
        }
    }

    /// Replace the image's filter chain with `choice`. Blur uses the blur
    /// strength currently shown in the panel.
    pub fn set_filter<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        choice: FilterChoice,
    ) -> Result<EditOutcome, SceneError> {
        let Some(image) = self.image_form() else {
            return Ok(EditOutcome::NoSelection);
        };
        let filters: SmallVec<[ImageFilter; 1]> = match choice {
            FilterChoice::None => SmallVec::new(),
            FilterChoice::Grayscale => SmallVec::from_elem(ImageFilter::Grayscale, 1),
            FilterChoice::Sepia => SmallVec::from_elem(ImageFilter::Sepia, 1),
            FilterChoice::Invert => SmallVec::from_elem(ImageFilter::Invert, 1),
            FilterChoice::Blur => SmallVec::from_elem(
                ImageFilter::Blur {
                    amount: f32::from(image.blur) / 100.0,
                },
                1,
            ),
        };
        self.apply_property(surface, ObjectProperty::Filters(filters))
    }

    /// Change blur strength. Only has an effect while the blur filter is
    /// selected.
    pub fn set_blur<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        percent: u8,
    ) -> Result<EditOutcome, SceneError> {
        let Some(image) = self.image_form() else {
            return Ok(EditOutcome::NoSelection);
        };
        if image.filter != FilterChoice::Blur {
            return Ok(EditOutcome::Unchanged);
        }
        let amount = f32::from(percent.min(100)) / 100.0;
        let filters = SmallVec::from_elem(ImageFilter::Blur { amount }, 1);
        self.apply_property(surface, ObjectProperty::Filters(filters))
    }

    pub fn bring_to_front<S: RenderSurface>(
        &mut self,
        surface: &mut S,
    ) -> Result<EditOutcome, SceneError> {
        self.reorder(surface, S::bring_to_front)
    }

    pub fn send_to_back<S: RenderSurface>(
        &mut self,
        surface: &mut S,
    ) -> Result<EditOutcome, SceneError> {
        self.reorder(surface, S::send_to_back)
    }

    fn reorder<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        op: fn(&mut S, ObjectId) -> Result<bool, crate::error::SurfaceError>,
    ) -> Result<EditOutcome, SceneError> {
        let Some(id) = self.selected() else {
            return Ok(EditOutcome::NoSelection);
        };
        if !op(surface, id)? {
            return Ok(EditOutcome::Unchanged);
        }
        surface.request_render();
        Ok(EditOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;
    use ab_core::{ImageAttrs, ShapePreset, TextAttrs};

    fn select(
        surface: &mut MemorySurface,
        sync: &mut SelectionSync,
        object: VisualObject,
    ) -> ObjectId {
        let id = object.id;
        surface.add(object).unwrap();
        surface.set_active_object(id).unwrap();
        sync.refresh(&*surface);
        id
    }

    fn image(filters: &[ImageFilter]) -> VisualObject {
        VisualObject::with_generated_id(ObjectKind::Image(ImageAttrs {
            src: "cat.png".into(),
            width: 200.0,
            height: 100.0,
            filters: SmallVec::from_slice(filters),
        }))
    }

    #[test]
    fn border_style_decoding() {
        assert_eq!(BorderStyle::from_dash(&[5.0, 5.0]), BorderStyle::Dashed);
        assert_eq!(BorderStyle::from_dash(&[2.0, 2.0]), BorderStyle::Dotted);
        assert_eq!(BorderStyle::from_dash(&[]), BorderStyle::Solid);
        assert_eq!(BorderStyle::from_dash(&[4.0, 1.0]), BorderStyle::Solid);
        for style in [BorderStyle::Solid, BorderStyle::Dashed, BorderStyle::Dotted] {
            assert_eq!(BorderStyle::from_dash(&style.dash()), style);
        }
    }

    #[test]
    fn opacity_reads_as_percent() {
        assert_eq!(opacity_percent(0.5), 50);
        assert_eq!(opacity_percent(1.0), 100);
        assert_eq!(opacity_percent(0.0), 100);
        assert_eq!(opacity_percent(0.004), 100);
    }

    #[test]
    fn blur_reads_as_percent() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        let mut sync = SelectionSync::new();
        select(&mut surface, &mut sync, image(&[ImageFilter::Blur { amount: 0.3 }]));
        assert_eq!(
            sync.form().unwrap().details,
            VariantForm::Image(ImageForm {
                filter: FilterChoice::Blur,
                blur: 30
            })
        );
    }

    #[test]
    fn only_first_filter_is_shown() {
        let form = read_filter(&[ImageFilter::Sepia, ImageFilter::Blur { amount: 0.9 }]);
        assert_eq!(form.filter, FilterChoice::Sepia);
        assert_eq!(form.blur, 0);
    }

    #[test]
    fn edits_without_selection_are_noops() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        let mut sync = SelectionSync::new();
        let renders = surface.render_count();
        assert_eq!(
            sync.apply_property(&mut surface, ObjectProperty::Opacity(0.2)),
            Ok(EditOutcome::NoSelection)
        );
        assert_eq!(sync.toggle_bold(&mut surface), Ok(EditOutcome::NoSelection));
        assert_eq!(sync.bring_to_front(&mut surface), Ok(EditOutcome::NoSelection));
        assert_eq!(surface.render_count(), renders);
    }

    #[test]
    fn repeated_value_renders_once() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        let mut sync = SelectionSync::new();
        select(&mut surface, &mut sync, ShapePreset::Circle.build(0.0, 0.0));
        let renders = surface.render_count();

        let fill = Some(Color::rgb(0, 128, 0));
        assert_eq!(
            sync.apply_property(&mut surface, ObjectProperty::Fill(fill)),
            Ok(EditOutcome::Applied)
        );
        assert_eq!(
            sync.apply_property(&mut surface, ObjectProperty::Fill(fill)),
            Ok(EditOutcome::Unchanged)
        );
        assert_eq!(surface.render_count(), renders + 1);
        assert_eq!(
            sync.form().unwrap().details,
            VariantForm::Shape { fill }
        );
    }

    #[test]
    fn text_toggles_flip_state() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        let mut sync = SelectionSync::new();
        let text = VisualObject::with_generated_id(ObjectKind::Text(TextAttrs {
            content: "Hello".into(),
            ..Default::default()
        }));
        select(&mut surface, &mut sync, text);

        sync.toggle_bold(&mut surface).unwrap();
        sync.toggle_italic(&mut surface).unwrap();
        sync.toggle_underline(&mut surface).unwrap();
        let VariantForm::Text(form) = &sync.form().unwrap().details else {
            panic!("expected text form");
        };
        assert!(form.bold && form.italic && form.underline);

        sync.toggle_bold(&mut surface).unwrap();
        let VariantForm::Text(form) = &sync.form().unwrap().details else {
            panic!("expected text form");
        };
        assert!(!form.bold);
    }

    #[test]
    fn filter_change_replaces_chain() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        let mut sync = SelectionSync::new();
        let id = select(
            &mut surface,
            &mut sync,
            image(&[ImageFilter::Sepia, ImageFilter::Invert]),
        );

        // Blur strength is ignored while another filter is active.
        assert_eq!(sync.set_blur(&mut surface, 40), Ok(EditOutcome::Unchanged));

        sync.set_filter(&mut surface, FilterChoice::Blur).unwrap();
        sync.set_blur(&mut surface, 40).unwrap();
        let ObjectKind::Image(attrs) = surface.to_plain(id).unwrap().kind else {
            panic!("expected image");
        };
        assert_eq!(attrs.filters.as_slice(), &[ImageFilter::Blur { amount: 0.4 }]);

        sync.set_filter(&mut surface, FilterChoice::None).unwrap();
        let ObjectKind::Image(attrs) = surface.to_plain(id).unwrap().kind else {
            panic!("expected image");
        };
        assert!(attrs.filters.is_empty());
    }

    #[test]
    fn arrangement() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        let mut sync = SelectionSync::new();
        let a = select(&mut surface, &mut sync, ShapePreset::Rectangle.build(0.0, 0.0));
        let b = ShapePreset::Circle.build(0.0, 0.0);
        let c = ShapePreset::Triangle.build(0.0, 0.0);
        let (b_id, c_id) = (b.id, c.id);
        surface.add(b).unwrap();
        surface.add(c).unwrap();

        assert_eq!(sync.bring_to_front(&mut surface), Ok(EditOutcome::Applied));
        assert_eq!(surface.object_ids(), [b_id, c_id, a]);
        assert_eq!(sync.bring_to_front(&mut surface), Ok(EditOutcome::Unchanged));
        assert_eq!(sync.send_to_back(&mut surface), Ok(EditOutcome::Applied));
        assert_eq!(surface.object_ids(), [a, b_id, c_id]);
    }

    #[test]
    fn user_edit_of_selection_refreshes_form() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        let mut sync = SelectionSync::new();
        let id = select(&mut surface, &mut sync, ShapePreset::Square.build(0.0, 0.0));
        surface.user_modify(id, |o| o.transform.scale_x = 2.0).unwrap();
        sync.on_event(
            &surface,
            &SurfaceEvent {
                kind: SurfaceEventKind::ObjectModified,
                target: Some(id),
            },
        );
        assert_eq!(sync.form().unwrap().width, 160.0);

        surface.user_deselect();
        sync.on_event(
            &surface,
            &SurfaceEvent {
                kind: SurfaceEventKind::SelectionCleared,
                target: Some(id),
            },
        );
        assert_eq!(sync.state(), SelectionState::NoSelection);
        assert!(sync.form().is_none());
    }

    #[test]
    fn flip_toggles() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        let mut sync = SelectionSync::new();
        let id = select(&mut surface, &mut sync, ShapePreset::Arrow.build(0.0, 0.0));
        sync.flip_horizontal(&mut surface).unwrap();
        sync.flip_vertical(&mut surface).unwrap();
        let t = surface.to_plain(id).unwrap().transform;
        assert!(t.flip_x && t.flip_y);
        sync.flip_horizontal(&mut surface).unwrap();
        assert!(!surface.to_plain(id).unwrap().transform.flip_x);
    }
}
