//! Scene adapter: Document ↔ live rendering surface.
//!
//! - **Document → Surface**: [`SceneAdapter::materialize`] clears the
//!   surface and replays the document's construction instructions. Change
//!   listeners are muted for the duration, so loading a design never looks
//!   like a user edit.
//!
//! - **Surface → Document**: [`SceneAdapter::capture_snapshot`] reads the
//!   live objects back in paint order. Change notifications flow through the
//!   single `on_scene_changed` callback registered at construction.
//!
//! The adapter owns the surface. Dropping back to the detached state goes
//! through [`SceneAdapter::dispose`], which never fails.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use ab_core::{
    Document, ImageAttrs, ObjectId, ObjectKind, SceneInstruction, ShapePreset, TextAttrs,
    Transform, VisualObject,
};
use smallvec::SmallVec;

use crate::config::EditorConfig;
use crate::error::{SceneError, SurfaceError};
use crate::surface::{
    RenderSurface, SubscriptionId, SurfaceEvent, SurfaceEventKind, SurfaceFactory,
};

pub type SceneCallback = Rc<dyn Fn(&SurfaceEvent)>;

/// Which teardown step failed during [`SceneAdapter::dispose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalStep {
    RemoveListener,
    DisposeSurface,
}

pub struct SceneAdapter<S: RenderSurface> {
    surface: Option<S>,
    init_attempted: bool,
    subscriptions: SmallVec<[SubscriptionId; 8]>,
    on_scene_changed: SceneCallback,
    on_selection: Option<SceneCallback>,
    /// Raised while the adapter itself is rebuilding the scene.
    suppressed: Rc<Cell<bool>>,
}

/// Clears the suppression flag on drop, so an early return out of
/// `materialize` cannot leave listeners muted.
struct Suppress(Rc<Cell<bool>>);

impl Suppress {
    fn new(flag: &Rc<Cell<bool>>) -> Self {
        flag.set(true);
        Self(Rc::clone(flag))
    }
}

impl Drop for Suppress {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S: RenderSurface> SceneAdapter<S> {
    pub fn new(on_scene_changed: impl Fn(&SurfaceEvent) + 'static) -> Self {
        Self {
            surface: None,
            init_attempted: false,
            subscriptions: SmallVec::new(),
            on_scene_changed: Rc::new(on_scene_changed),
            on_selection: None,
            suppressed: Rc::new(Cell::new(false)),
        }
    }

    /// Also forward selection events. Must be set before a surface is
    /// attached.
    pub fn with_selection_listener(mut self, listener: impl Fn(&SurfaceEvent) + 'static) -> Self {
        self.on_selection = Some(Rc::new(listener));
        self
    }

    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    pub fn init_attempted(&self) -> bool {
        self.init_attempted
    }

    pub fn surface(&self) -> Result<&S, SceneError> {
        self.surface.as_ref().ok_or(SceneError::SurfaceNotReady)
    }

    pub fn surface_mut(&mut self) -> Result<&mut S, SceneError> {
        self.surface.as_mut().ok_or(SceneError::SurfaceNotReady)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Acquire a surface from `factory`, giving up after `timeout`.
    ///
    /// Only the first call does anything; later calls fail with
    /// [`SceneError::AlreadyInitializing`] until [`dispose`](Self::dispose)
    /// resets the adapter.
    pub async fn initialize<F>(&mut self, factory: &F, timeout: Duration) -> Result<(), SceneError>
    where
        F: SurfaceFactory<Surface = S>,
    {
        if self.init_attempted {
            return Err(SceneError::AlreadyInitializing);
        }
        self.init_attempted = true;

        let surface = match tokio::time::timeout(timeout, factory.acquire()).await {
            Ok(Ok(surface)) => surface,
            Ok(Err(e)) => {
                log::error!("failed to create rendering surface: {e}");
                return Err(SceneError::SurfaceUnavailable(e.to_string()));
            }
            Err(_) => {
                log::error!("rendering surface not ready after {timeout:?}");
                return Err(SceneError::SurfaceUnavailable(format!(
                    "timed out after {timeout:?}"
                )));
            }
        };
        self.attach(surface)
    }

    /// Take ownership of a ready surface and register the change listeners.
    pub fn attach(&mut self, mut surface: S) -> Result<(), SceneError> {
        if self.surface.is_some() {
            return Err(SceneError::AlreadyInitializing);
        }
        self.init_attempted = true;

        let mut subscriptions: SmallVec<[SubscriptionId; 8]> = SmallVec::new();
        let result = (|| {
            for kind in SurfaceEventKind::SCENE_CHANGES {
                let callback = Rc::clone(&self.on_scene_changed);
                let suppressed = Rc::clone(&self.suppressed);
                let listener = Box::new(move |event: &SurfaceEvent| {
                    if !suppressed.get() {
                        callback(event);
                    }
                });
                subscriptions.push(surface.subscribe(kind, listener)?);
            }
            if let Some(on_selection) = &self.on_selection {
                for kind in SurfaceEventKind::SELECTION {
                    let callback = Rc::clone(on_selection);
                    let listener = Box::new(move |event: &SurfaceEvent| callback(event));
                    subscriptions.push(surface.subscribe(kind, listener)?);
                }
            }
            Ok::<_, SurfaceError>(())
        })();

        if let Err(e) = result {
            log::error!("failed to register surface listeners: {e}");
            for sub in subscriptions {
                if let Err(e) = surface.unsubscribe(sub) {
                    log::warn!("cannot remove listener {sub:?} after failed attach: {e}");
                }
            }
            if let Err(e) = surface.dispose() {
                log::warn!("surface teardown after failed attach: {e}");
            }
            return Err(e.into());
        }

        log::debug!("surface attached with {} listeners", subscriptions.len());
        self.subscriptions = subscriptions;
        self.surface = Some(surface);
        Ok(())
    }

    /// Remove the listeners and release the surface. Each step is attempted
    /// even if an earlier one fails; failures are logged and returned for
    /// inspection, never propagated.
    pub fn dispose(&mut self) -> Vec<(DisposalStep, SurfaceError)> {
        let mut failures = Vec::new();
        if let Some(mut surface) = self.surface.take() {
            for sub in self.subscriptions.drain(..) {
                if let Err(e) = surface.unsubscribe(sub) {
                    log::error!("failed to remove surface listener {sub:?}: {e}");
                    failures.push((DisposalStep::RemoveListener, e));
                }
            }
            if let Err(e) = surface.dispose() {
                log::error!("failed to dispose rendering surface: {e}");
                failures.push((DisposalStep::DisposeSurface, e));
            }
        }
        self.subscriptions.clear();
        self.suppressed.set(false);
        self.init_attempted = false;
        failures
    }

    // ─── Document → Surface ──────────────────────────────────────────────

    /// Replace the surface contents with `doc`. No change notifications are
    /// emitted.
    pub fn materialize(&mut self, doc: &Document) -> Result<(), SceneError> {
        doc.validate()?;
        let suppressed = Rc::clone(&self.suppressed);
        let surface = self.surface_mut()?;
        let _mute = Suppress::new(&suppressed);

        surface.discard_active_object();
        surface.clear();
        for step in doc.instructions() {
            match step {
                SceneInstruction::Resize { width, height } => surface.set_dimensions(width, height),
                SceneInstruction::Background(color) => surface.set_background(color),
                SceneInstruction::Insert(object) => surface.add(object)?,
            }
        }
        surface.request_render();
        log::debug!(
            "materialized {:?} with {} objects",
            doc.id,
            doc.objects.len()
        );
        Ok(())
    }

    // ─── Surface → Document ──────────────────────────────────────────────

    /// Read the live scene back into a document carrying `id` and `name`.
    pub fn capture_snapshot(&self, id: Option<&str>, name: &str) -> Result<Document, SceneError> {
        let surface = self.surface()?;
        let (width, height) = surface.dimensions();
        let objects = surface
            .object_ids()
            .into_iter()
            .filter_map(|id| surface.to_plain(id))
            .collect();
        Ok(Document {
            id: id.map(str::to_string),
            name: name.to_string(),
            width,
            height,
            background: Some(surface.background()),
            objects,
        })
    }

    // ─── Insertion helpers ───────────────────────────────────────────────

    /// Add `object` on top and make it the active selection.
    pub fn insert(&mut self, object: VisualObject) -> Result<ObjectId, SceneError> {
        let surface = self.surface_mut()?;
        let id = object.id;
        surface.add(object)?;
        surface.set_active_object(id)?;
        surface.request_render();
        Ok(id)
    }

    pub fn add_shape(
        &mut self,
        preset: ShapePreset,
        config: &EditorConfig,
    ) -> Result<ObjectId, SceneError> {
        self.insert(preset.build(config.insert_x, config.insert_y))
    }

    /// Add a text object. `background` also adds padding around the glyphs.
    pub fn add_text(
        &mut self,
        content: &str,
        background: Option<ab_core::Color>,
        config: &EditorConfig,
    ) -> Result<ObjectId, SceneError> {
        let text = TextAttrs {
            content: content.to_string(),
            background,
            padding: if background.is_some() { 10.0 } else { 0.0 },
            ..Default::default()
        };
        let mut object = VisualObject::with_generated_id(ObjectKind::Text(text));
        object.transform = Transform::at(config.insert_x, config.insert_y);
        object.fill = Some(ab_core::Color::BLACK);
        self.insert(object)
    }

    /// Add an image whose natural size is `width`×`height`, scaled down to
    /// fit the configured maximum dimension.
    pub fn add_image(
        &mut self,
        src: &str,
        width: f32,
        height: f32,
        config: &EditorConfig,
    ) -> Result<ObjectId, SceneError> {
        let longest = width.max(height);
        let scale = if longest > config.max_image_dimension {
            config.max_image_dimension / longest
        } else {
            1.0
        };
        let mut object = VisualObject::with_generated_id(ObjectKind::Image(ImageAttrs {
            src: src.to_string(),
            width,
            height,
            filters: SmallVec::new(),
        }));
        object.transform = Transform {
            scale_x: scale,
            scale_y: scale,
            ..Transform::at(config.insert_x, config.insert_y)
        };
        self.insert(object)
    }

    /// Duplicate the active object, offset by `offset` on both axes, and
    /// select the copy. Returns `None` when nothing is selected.
    pub fn clone_selected(&mut self, offset: f32) -> Result<Option<ObjectId>, SceneError> {
        let surface = self.surface()?;
        let Some(mut copy) = surface.active_object().and_then(|id| surface.to_plain(id)) else {
            return Ok(None);
        };
        copy.id = ObjectId::with_prefix(copy.kind.id_prefix());
        copy.transform.left += offset;
        copy.transform.top += offset;
        self.insert(copy).map(Some)
    }

    /// Remove the active object. Returns the removed ID, if any.
    pub fn delete_selected(&mut self) -> Result<Option<ObjectId>, SceneError> {
        let surface = self.surface_mut()?;
        let Some(id) = surface.active_object() else {
            return Ok(None);
        };
        surface.discard_active_object();
        surface.remove(id)?;
        surface.request_render();
        Ok(Some(id))
    }
}
