//! The editor facade.
//!
//! `Editor` owns one session and everything attached to it: the scene
//! adapter (and through it the surface), selection sync, the autosave
//! orchestrator, the loader, the brush, the store and the credential
//! provider. Surface listeners never touch the editor directly; they push
//! [`EditorEvent`]s onto a channel that [`Editor::process_events`] drains.
//!
//! A host loop looks like:
//!
//! ```ignore
//! loop {
//!     editor.process_events();
//!     match editor.next_save_deadline() {
//!         Some(deadline) => {
//!             tokio::time::sleep_until(deadline).await;
//!             editor.run_due_save().await;
//!         }
//!         None => wait_for_input().await,
//!     }
//! }
//! ```
//!
//! `run_due_save` holds the editor until the store answers. A host that
//! keeps taking input meanwhile splits it: [`Editor::begin_due_save`]
//! hands out a [`SaveRequest`] that owns what the request needs, and
//! [`Editor::complete_save`] applies the [`SaveResponse`].

use std::rc::Rc;

use ab_core::{Color, DesignRecord, Document, ObjectId, ShapePreset};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::adapter::SceneAdapter;
use crate::brush::{BrushSettings, DrawingBrush};
use crate::config::EditorConfig;
use crate::error::{LoadError, SceneError, StoreError};
use crate::loader::{DesignLoader, LoadReport};
use crate::persistence::{PersistenceOrchestrator, SaveOutcome, SaveTicket};
use crate::property::ObjectProperty;
use crate::selection::{BorderStyle, EditOutcome, FilterChoice, SelectionSync};
use crate::session::{EditMode, EditorSession};
use crate::store::{Credential, CredentialProvider, DocumentStore};
use crate::surface::{RenderSurface, SurfaceEvent, SurfaceFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// Added, modified, removed, or path created.
    Scene(SurfaceEvent),
    Selection(SurfaceEvent),
}

/// A begun save, detached from the editor.
pub struct SaveRequest<St> {
    ticket: SaveTicket,
    store: Rc<St>,
    credential: Result<Credential, StoreError>,
}

impl<St: DocumentStore> SaveRequest<St> {
    pub fn ticket(&self) -> &SaveTicket {
        &self.ticket
    }

    pub async fn send(self) -> SaveResponse {
        let result = match &self.credential {
            Ok(credential) => self.store.save(credential, self.ticket.record.clone()).await,
            Err(e) => Err(e.clone()),
        };
        SaveResponse {
            ticket: self.ticket,
            result,
        }
    }
}

/// The store's answer to a [`SaveRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveResponse {
    ticket: SaveTicket,
    result: Result<DesignRecord, StoreError>,
}

impl SaveResponse {
    pub fn ticket(&self) -> &SaveTicket {
        &self.ticket
    }

    pub fn result(&self) -> &Result<DesignRecord, StoreError> {
        &self.result
    }
}

pub struct Editor<S, St, C>
where
    S: RenderSurface,
    St: DocumentStore,
    C: CredentialProvider,
{
    config: EditorConfig,
    session: EditorSession,
    adapter: SceneAdapter<S>,
    selection: SelectionSync,
    persistence: PersistenceOrchestrator,
    loader: DesignLoader,
    brush: DrawingBrush,
    store: Rc<St>,
    credentials: C,
    events: mpsc::UnboundedReceiver<EditorEvent>,
}

impl<S, St, C> Editor<S, St, C>
where
    S: RenderSurface,
    St: DocumentStore,
    C: CredentialProvider,
{
    /// Create a mounted editor with a fresh session and no surface.
    pub fn new(config: EditorConfig, store: St, credentials: C) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let scene_tx = tx.clone();
        let adapter = SceneAdapter::new(move |event| {
            let _ = scene_tx.send(EditorEvent::Scene(*event));
        })
        .with_selection_listener(move |event| {
            let _ = tx.send(EditorEvent::Selection(*event));
        });

        let mut editor = Self {
            session: EditorSession::new(config.default_name.clone()),
            selection: SelectionSync::new(),
            persistence: PersistenceOrchestrator::new(config.save_debounce()),
            loader: DesignLoader::new(),
            brush: DrawingBrush::new(&config),
            adapter,
            config,
            store: Rc::new(store),
            credentials,
            events,
        };
        editor.mount();
        editor
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn selection(&self) -> &SelectionSync {
        &self.selection
    }

    pub fn persistence(&self) -> &PersistenceOrchestrator {
        &self.persistence
    }

    pub fn loader(&self) -> &DesignLoader {
        &self.loader
    }

    pub fn brush(&self) -> &DrawingBrush {
        &self.brush
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn adapter(&self) -> &SceneAdapter<S> {
        &self.adapter
    }

    pub fn surface(&self) -> Result<&S, SceneError> {
        self.adapter.surface()
    }

    /// Direct surface access, e.g. for host input handling. Events the
    /// surface emits are picked up by the next `process_events`.
    pub fn surface_mut(&mut self) -> Result<&mut S, SceneError> {
        self.adapter.surface_mut()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    pub fn mount(&mut self) {
        self.session.reset();
        log::debug!("editor mounted");
    }

    pub async fn initialize_surface<F>(&mut self, factory: &F) -> Result<(), SceneError>
    where
        F: SurfaceFactory<Surface = S>,
    {
        self.adapter
            .initialize(factory, self.config.surface_timeout())
            .await
    }

    pub fn attach_surface(&mut self, surface: S) -> Result<(), SceneError> {
        self.adapter.attach(surface)
    }

    /// Open design `id`. Switching from another document cancels its
    /// pending save and starts from a clean session.
    pub async fn open(&mut self, id: &str) -> Result<LoadReport, LoadError> {
        if self.session.document_id() != Some(id) {
            if self.persistence.cancel_pending() {
                log::debug!("dropped pending save of {:?}", self.session.document_id());
            }
            self.session.reset();
            self.loader.reset();
            self.selection.clear();
            self.session.set_document_id(id);
            self.show_blank();
        }
        let result = self
            .loader
            .load(
                id,
                &mut self.session,
                &mut self.adapter,
                &*self.store,
                &self.credentials,
                &self.config,
            )
            .await;
        if let Err(LoadError::Scene(SceneError::SurfaceNotReady)) = &result {
            log::debug!("surface not ready; load of {id} deferred");
        }
        self.process_events();
        result
    }

    /// Clear the scene so nothing of the previous design is shown, or
    /// saved, under the next ID.
    fn show_blank(&mut self) {
        let (width, height) = self.config.fallback_dimensions();
        let mut blank = Document::blank(width, height);
        blank.background = Some(self.config.background());
        match self.adapter.materialize(&blank) {
            Ok(()) | Err(SceneError::SurfaceNotReady) => {}
            Err(e) => log::warn!("cannot clear scene: {e}"),
        }
    }

    /// Cancel any pending save, release the surface, and reset the session.
    pub fn unmount(&mut self) {
        self.persistence.cancel_pending();
        let failures = self.adapter.dispose();
        if !failures.is_empty() {
            log::debug!("{} teardown steps failed", failures.len());
        }
        self.loader.reset();
        self.selection.clear();
        while self.events.try_recv().is_ok() {}
        self.session.reset();
        log::debug!("editor unmounted");
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Drain queued surface events. Returns how many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            handled += 1;
            match event {
                EditorEvent::Scene(change) => {
                    self.mark_modified();
                    if let Ok(surface) = self.adapter.surface() {
                        self.selection.on_event(surface, &change);
                    }
                }
                EditorEvent::Selection(change) => {
                    if let Ok(surface) = self.adapter.surface() {
                        self.selection.on_event(surface, &change);
                    }
                }
            }
            self.session.selected_object = self.selection.selected();
        }
        handled
    }

    /// Record an edit. Without an active, loaded document this is logged
    /// and ignored.
    pub fn mark_modified(&mut self) {
        // The orchestrator logs the refusal.
        let _ = self
            .persistence
            .mark_modified(&mut self.session, Instant::now());
    }

    // ─── Saving ──────────────────────────────────────────────────────────

    pub fn next_save_deadline(&self) -> Option<Instant> {
        self.persistence.next_deadline()
    }

    /// Run the autosave if its quiet window has elapsed.
    pub async fn run_due_save(&mut self) -> Option<SaveOutcome> {
        let request = self.begin_due_save()?;
        Some(self.complete_save(request.send().await))
    }

    /// Save immediately, skipping any pending quiet window.
    pub async fn save_now(&mut self) -> Option<SaveOutcome> {
        self.persistence.cancel_pending();
        let request = self.begin_save()?;
        Some(self.complete_save(request.send().await))
    }

    /// Begin the autosave if its quiet window has elapsed.
    pub fn begin_due_save(&mut self) -> Option<SaveRequest<St>> {
        if !self.persistence.poll_due(Instant::now()) {
            return None;
        }
        self.begin_save()
    }

    /// Snapshot the scene for sending. `None` when nothing can be sent,
    /// including while another save is in flight.
    pub fn begin_save(&mut self) -> Option<SaveRequest<St>> {
        let ticket = self
            .persistence
            .begin_flush(&mut self.session, &self.adapter)?;
        Some(SaveRequest {
            ticket,
            store: Rc::clone(&self.store),
            credential: self.credentials.require(),
        })
    }

    pub fn complete_save(&mut self, response: SaveResponse) -> SaveOutcome {
        self.persistence.complete_flush(
            &mut self.session,
            &response.ticket,
            response.result,
            Instant::now(),
        )
    }

    /// Handle events and run autosaves until nothing is pending.
    pub async fn run_until_idle(&mut self) -> Vec<SaveOutcome> {
        let mut outcomes = Vec::new();
        loop {
            self.process_events();
            let Some(deadline) = self.next_save_deadline() else {
                break;
            };
            tokio::time::sleep_until(deadline).await;
            if let Some(outcome) = self.run_due_save().await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    // ─── Session ─────────────────────────────────────────────────────────

    pub fn set_edit_mode(&mut self, mode: EditMode) {
        self.session.edit_mode = mode;
    }

    /// Rename the open design. Saved with the next autosave.
    pub fn rename(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() || name == self.session.document_name() {
            return;
        }
        self.session.set_document_name(name);
        self.mark_modified();
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.persistence.set_category(category);
    }

    // ─── Properties panel ────────────────────────────────────────────────

    fn edit(
        &mut self,
        op: impl FnOnce(&mut SelectionSync, &mut S) -> Result<EditOutcome, SceneError>,
    ) -> Result<EditOutcome, SceneError> {
        let surface = self.adapter.surface_mut()?;
        let outcome = op(&mut self.selection, surface)?;
        if outcome == EditOutcome::Applied {
            self.mark_modified();
        }
        Ok(outcome)
    }

    pub fn apply_property(&mut self, property: ObjectProperty) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.apply_property(surface, property))
    }

    pub fn set_opacity(&mut self, percent: u8) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.set_opacity(surface, percent))
    }

    pub fn set_border_style(&mut self, style: BorderStyle) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.set_border_style(surface, style))
    }

    pub fn flip_horizontal(&mut self) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.flip_horizontal(surface))
    }

    pub fn flip_vertical(&mut self) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.flip_vertical(surface))
    }

    pub fn toggle_bold(&mut self) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.toggle_bold(surface))
    }

    pub fn toggle_italic(&mut self) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.toggle_italic(surface))
    }

    pub fn toggle_underline(&mut self) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.toggle_underline(surface))
    }

    pub fn set_filter(&mut self, filter: FilterChoice) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.set_filter(surface, filter))
    }

    pub fn set_blur(&mut self, percent: u8) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.set_blur(surface, percent))
    }

    pub fn bring_to_front(&mut self) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.bring_to_front(surface))
    }

    pub fn send_to_back(&mut self) -> Result<EditOutcome, SceneError> {
        self.edit(|sync, surface| sync.send_to_back(surface))
    }

    // ─── Insertion ───────────────────────────────────────────────────────
    //
    // The surface reports each insertion or removal itself, so these only
    // drain the queue; they never mark the session modified directly.

    pub fn add_shape(&mut self, preset: ShapePreset) -> Result<ObjectId, SceneError> {
        let id = self.adapter.add_shape(preset, &self.config)?;
        self.process_events();
        Ok(id)
    }

    pub fn add_text(
        &mut self,
        content: &str,
        background: Option<Color>,
    ) -> Result<ObjectId, SceneError> {
        let id = self.adapter.add_text(content, background, &self.config)?;
        self.process_events();
        Ok(id)
    }

    pub fn add_image(
        &mut self,
        src: &str,
        width: f32,
        height: f32,
    ) -> Result<ObjectId, SceneError> {
        let id = self.adapter.add_image(src, width, height, &self.config)?;
        self.process_events();
        Ok(id)
    }

    pub fn clone_selected(&mut self) -> Result<Option<ObjectId>, SceneError> {
        let id = self.adapter.clone_selected(self.config.clone_offset)?;
        self.process_events();
        Ok(id)
    }

    pub fn delete_selected(&mut self) -> Result<Option<ObjectId>, SceneError> {
        let id = self.adapter.delete_selected()?;
        self.process_events();
        Ok(id)
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    fn push_brush(&mut self, settings: Option<BrushSettings>) {
        match self.adapter.surface_mut() {
            Ok(surface) => surface.set_free_drawing(settings),
            Err(_) => log::debug!("no surface; brush change kept for later"),
        }
    }

    pub fn toggle_drawing(&mut self) -> bool {
        let settings = self.brush.toggle_drawing();
        if settings.is_some() {
            // Drawing and selection are exclusive.
            if let Ok(surface) = self.adapter.surface_mut() {
                surface.discard_active_object();
            }
        }
        self.push_brush(settings);
        self.process_events();
        self.brush.is_drawing()
    }

    pub fn toggle_erase(&mut self) -> bool {
        let settings = self.brush.toggle_erase();
        self.push_brush(settings);
        self.brush.is_erasing()
    }

    pub fn update_brush(&mut self, color: Option<Color>, width: Option<f32>, opacity: Option<f32>) {
        let settings = self.brush.update(color, width, opacity);
        if settings.is_some() {
            self.push_brush(settings);
        }
    }
}
