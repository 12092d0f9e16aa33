//! The rendering surface seam.
//!
//! A rendering surface is the live, interactive canvas: it owns its own
//! representation of the visual objects, hit-testing, and user gestures.
//! The editor only talks to it through [`RenderSurface`], keyed by the same
//! [`ObjectId`]s the document uses.
//!
//! Surfaces are single-threaded; listeners are plain `FnMut` boxes invoked
//! synchronously while the surface handles an event.

use std::future::Future;

use ab_core::{Color, ObjectId, VisualObject};

use crate::brush::BrushSettings;
use crate::error::SurfaceError;
use crate::property::ObjectProperty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceEventKind {
    ObjectAdded,
    ObjectModified,
    ObjectRemoved,
    PathCreated,
    SelectionCreated,
    SelectionUpdated,
    SelectionCleared,
}

impl SurfaceEventKind {
    /// Events that change the persisted content of the scene.
    pub const SCENE_CHANGES: [SurfaceEventKind; 4] = [
        SurfaceEventKind::ObjectAdded,
        SurfaceEventKind::ObjectModified,
        SurfaceEventKind::ObjectRemoved,
        SurfaceEventKind::PathCreated,
    ];

    pub const SELECTION: [SurfaceEventKind; 3] = [
        SurfaceEventKind::SelectionCreated,
        SurfaceEventKind::SelectionUpdated,
        SurfaceEventKind::SelectionCleared,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SurfaceEventKind::ObjectAdded => "object:added",
            SurfaceEventKind::ObjectModified => "object:modified",
            SurfaceEventKind::ObjectRemoved => "object:removed",
            SurfaceEventKind::PathCreated => "path:created",
            SurfaceEventKind::SelectionCreated => "selection:created",
            SurfaceEventKind::SelectionUpdated => "selection:updated",
            SurfaceEventKind::SelectionCleared => "selection:cleared",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceEvent {
    pub kind: SurfaceEventKind,
    /// The object the event is about, when there is one.
    pub target: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

pub type Listener = Box<dyn FnMut(&SurfaceEvent)>;

/// A live canvas the editor can drive.
///
/// Programmatic mutations (`set_property`, reordering, `set_dimensions`,
/// `set_background`) do not emit `object:modified`; only user gestures do.
/// `add` and `remove` emit `object:added` / `object:removed` as a real
/// canvas would.
pub trait RenderSurface {
    fn dimensions(&self) -> (f32, f32);
    fn set_dimensions(&mut self, width: f32, height: f32);
    fn background(&self) -> Color;
    fn set_background(&mut self, color: Color);

    /// Remove every object.
    fn clear(&mut self);
    /// Add on top of the paint order.
    fn add(&mut self, object: VisualObject) -> Result<(), SurfaceError>;
    fn remove(&mut self, id: ObjectId) -> Result<VisualObject, SurfaceError>;

    /// Object IDs in paint order, bottom first.
    fn object_ids(&self) -> Vec<ObjectId>;
    /// Serialize one object to its plain representation.
    fn to_plain(&self, id: ObjectId) -> Option<VisualObject>;

    /// Returns true if the object changed.
    fn set_property(
        &mut self,
        id: ObjectId,
        property: &ObjectProperty,
    ) -> Result<bool, SurfaceError>;
    fn bring_to_front(&mut self, id: ObjectId) -> Result<bool, SurfaceError>;
    fn send_to_back(&mut self, id: ObjectId) -> Result<bool, SurfaceError>;

    fn active_object(&self) -> Option<ObjectId>;
    /// Select an object. Emits `selection:created` or `selection:updated`.
    fn set_active_object(&mut self, id: ObjectId) -> Result<(), SurfaceError>;
    /// Emits `selection:cleared` if something was selected.
    fn discard_active_object(&mut self);

    /// `None` turns free drawing off.
    fn set_free_drawing(&mut self, brush: Option<BrushSettings>);

    fn request_render(&mut self);

    fn subscribe(
        &mut self,
        kind: SurfaceEventKind,
        listener: Listener,
    ) -> Result<SubscriptionId, SurfaceError>;
    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), SurfaceError>;

    /// Release the surface. Further calls may fail with
    /// [`SurfaceError::Disposed`].
    fn dispose(&mut self) -> Result<(), SurfaceError>;
}

/// Asynchronously produces a rendering surface, e.g. once the host view has
/// been laid out.
pub trait SurfaceFactory {
    type Surface: RenderSurface;

    fn acquire(&self) -> impl Future<Output = Result<Self::Surface, SurfaceError>>;
}
