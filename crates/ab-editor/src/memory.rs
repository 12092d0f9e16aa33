//! Headless in-memory rendering surface.
//!
//! Keeps objects in paint order and dispatches listener callbacks exactly
//! like an interactive canvas would, so the editor can run without a
//! window. The `user_*` methods stand in for pointer gestures.

use std::time::Duration;

use ab_core::{Color, FreehandAttrs, ObjectId, ObjectKind, Point, VisualObject, move_within};

use crate::brush::BrushSettings;
use crate::error::SurfaceError;
use crate::property::ObjectProperty;
use crate::surface::{
    Listener, RenderSurface, SubscriptionId, SurfaceEvent, SurfaceEventKind, SurfaceFactory,
};

pub struct MemorySurface {
    width: f32,
    height: f32,
    background: Color,
    objects: Vec<VisualObject>,
    active: Option<ObjectId>,
    free_drawing: Option<BrushSettings>,
    listeners: Vec<(SubscriptionId, SurfaceEventKind, Listener)>,
    next_subscription: u64,
    renders: usize,
    disposed: bool,
    /// Test hooks: make teardown steps fail.
    pub fail_unsubscribe: bool,
    pub fail_dispose: bool,
    /// Refuse subscriptions beyond this many listeners.
    pub listener_limit: Option<usize>,
}

impl MemorySurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            background: Color::WHITE,
            objects: Vec::new(),
            active: None,
            free_drawing: None,
            listeners: Vec::new(),
            next_subscription: 0,
            renders: 0,
            disposed: false,
            fail_unsubscribe: false,
            fail_dispose: false,
            listener_limit: None,
        }
    }

    /// Number of render requests so far.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn free_drawing(&self) -> Option<BrushSettings> {
        self.free_drawing
    }

    pub fn objects(&self) -> &[VisualObject] {
        &self.objects
    }

    fn emit(&mut self, kind: SurfaceEventKind, target: Option<ObjectId>) {
        let event = SurfaceEvent { kind, target };
        log::trace!("surface event {} {:?}", kind.name(), target);
        for (_, listening, listener) in self.listeners.iter_mut() {
            if *listening == kind {
                listener(&event);
            }
        }
    }

    fn index_of(&self, id: ObjectId) -> Result<usize, SurfaceError> {
        self.objects
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| SurfaceError::UnknownObject(id.to_string()))
    }

    fn live(&self) -> Result<(), SurfaceError> {
        if self.disposed {
            Err(SurfaceError::Disposed)
        } else {
            Ok(())
        }
    }

    // ─── Simulated user gestures ─────────────────────────────────────────

    /// The user edits an object directly (drag, resize, inline text edit).
    /// Emits one `object:modified`.
    pub fn user_modify(
        &mut self,
        id: ObjectId,
        edit: impl FnOnce(&mut VisualObject),
    ) -> Result<(), SurfaceError> {
        self.live()?;
        let idx = self.index_of(id)?;
        edit(&mut self.objects[idx]);
        self.emit(SurfaceEventKind::ObjectModified, Some(id));
        self.renders += 1;
        Ok(())
    }

    /// The user clicks an object.
    pub fn user_select(&mut self, id: ObjectId) -> Result<(), SurfaceError> {
        self.set_active_object(id)
    }

    /// The user clicks empty canvas.
    pub fn user_deselect(&mut self) {
        self.discard_active_object();
    }

    /// The user finishes a brush stroke. The surface coalesces the stroke
    /// into a single `path:created`.
    pub fn user_draw(&mut self, points: Vec<Point>) -> Result<ObjectId, SurfaceError> {
        self.live()?;
        let brush = self
            .free_drawing
            .ok_or_else(|| SurfaceError::Backend("free drawing is off".into()))?;
        let mut object = VisualObject::with_generated_id(ObjectKind::Freehand(FreehandAttrs {
            points,
            brush: brush.brush(),
        }));
        object.opacity = brush.opacity;
        object.stroke.color = Some(brush.color);
        object.stroke.width = brush.width;
        let id = object.id;
        self.objects.push(object);
        self.emit(SurfaceEventKind::PathCreated, Some(id));
        self.renders += 1;
        Ok(id)
    }
}

impl RenderSurface for MemorySurface {
    fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn set_dimensions(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    fn background(&self) -> Color {
        self.background
    }

    fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    fn clear(&mut self) {
        self.active = None;
        let removed: Vec<ObjectId> = self.objects.drain(..).map(|o| o.id).collect();
        for id in removed {
            self.emit(SurfaceEventKind::ObjectRemoved, Some(id));
        }
    }

    fn add(&mut self, object: VisualObject) -> Result<(), SurfaceError> {
        self.live()?;
        if self.objects.iter().any(|o| o.id == object.id) {
            return Err(SurfaceError::DuplicateId(object.id.to_string()));
        }
        let id = object.id;
        self.objects.push(object);
        self.emit(SurfaceEventKind::ObjectAdded, Some(id));
        Ok(())
    }

    fn remove(&mut self, id: ObjectId) -> Result<VisualObject, SurfaceError> {
        self.live()?;
        let idx = self.index_of(id)?;
        let object = self.objects.remove(idx);
        if self.active == Some(id) {
            self.active = None;
        }
        self.emit(SurfaceEventKind::ObjectRemoved, Some(id));
        Ok(object)
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    fn to_plain(&self, id: ObjectId) -> Option<VisualObject> {
        self.objects.iter().find(|o| o.id == id).cloned()
    }

    fn set_property(
        &mut self,
        id: ObjectId,
        property: &ObjectProperty,
    ) -> Result<bool, SurfaceError> {
        self.live()?;
        let idx = self.index_of(id)?;
        property.apply(&mut self.objects[idx])
    }

    fn bring_to_front(&mut self, id: ObjectId) -> Result<bool, SurfaceError> {
        let idx = self.index_of(id)?;
        let last = self.objects.len() - 1;
        Ok(move_within(&mut self.objects, idx, last))
    }

    fn send_to_back(&mut self, id: ObjectId) -> Result<bool, SurfaceError> {
        let idx = self.index_of(id)?;
        Ok(move_within(&mut self.objects, idx, 0))
    }

    fn active_object(&self) -> Option<ObjectId> {
        self.active
    }

    fn set_active_object(&mut self, id: ObjectId) -> Result<(), SurfaceError> {
        self.live()?;
        self.index_of(id)?;
        let kind = match self.active {
            Some(current) if current == id => return Ok(()),
            Some(_) => SurfaceEventKind::SelectionUpdated,
            None => SurfaceEventKind::SelectionCreated,
        };
        self.active = Some(id);
        self.emit(kind, Some(id));
        Ok(())
    }

    fn discard_active_object(&mut self) {
        if let Some(previous) = self.active.take() {
            self.emit(SurfaceEventKind::SelectionCleared, Some(previous));
        }
    }

    fn set_free_drawing(&mut self, brush: Option<BrushSettings>) {
        self.free_drawing = brush;
    }

    fn request_render(&mut self) {
        self.renders += 1;
    }

    fn subscribe(
        &mut self,
        kind: SurfaceEventKind,
        listener: Listener,
    ) -> Result<SubscriptionId, SurfaceError> {
        self.live()?;
        if self.listener_limit.is_some_and(|limit| self.listeners.len() >= limit) {
            return Err(SurfaceError::Backend("listener limit reached".into()));
        }
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, kind, listener));
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), SurfaceError> {
        if self.fail_unsubscribe {
            return Err(SurfaceError::Backend("listener removal failed".into()));
        }
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _, _)| *sub != id);
        if self.listeners.len() == before {
            return Err(SurfaceError::UnknownSubscription(id));
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), SurfaceError> {
        if self.fail_dispose {
            return Err(SurfaceError::Backend("teardown failed".into()));
        }
        self.live()?;
        self.disposed = true;
        self.objects.clear();
        self.active = None;
        Ok(())
    }
}

/// Produces [`MemorySurface`]s after an optional delay, standing in for a
/// host view that needs time to lay out.
#[derive(Debug, Clone)]
pub struct MemorySurfaceFactory {
    pub width: f32,
    pub height: f32,
    pub delay: Duration,
    /// When set, acquisition fails with this message.
    pub failure: Option<String>,
}

impl MemorySurfaceFactory {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            delay: Duration::ZERO,
            failure: None,
        }
    }
}

impl SurfaceFactory for MemorySurfaceFactory {
    type Surface = MemorySurface;

    async fn acquire(&self) -> Result<MemorySurface, SurfaceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(message) => Err(SurfaceError::Backend(message.clone())),
            None => Ok(MemorySurface::new(self.width, self.height)),
        }
    }
}
