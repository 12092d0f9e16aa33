//! Debounced autosave.
//!
//! Edits mark the session modified and (re)start a quiet window. When the
//! window elapses a save is *begun*: the scene is snapshotted and encoded
//! into a [`SaveTicket`]. The caller sends the ticket's record to the store
//! and hands the result back to [`PersistenceOrchestrator::complete_flush`].
//!
//! Splitting the flush this way keeps the orchestrator synchronous: edits
//! can keep arriving while the request is in flight, and the completion
//! decides what to do with them.
//!
//! Rules:
//! - at most one save is in flight; a window that elapses meanwhile is
//!   remembered and runs once the current save resolves;
//! - `modified` is cleared only if nothing was edited after the snapshot;
//! - a result for a document that is no longer active is dropped;
//! - failures set `Error` and keep `modified`; nothing is retried until the
//!   next edit.

use std::time::Duration;

use ab_core::{DesignRecord, encode_document};
use tokio::time::Instant;

use crate::adapter::SceneAdapter;
use crate::debounce::Debouncer;
use crate::error::{PersistError, StoreError};
use crate::session::{EditorSession, SaveStatus};
use crate::surface::RenderSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistState {
    #[default]
    Idle,
    PendingSave,
    Saving,
    Error,
}

/// A save that has been snapshotted and is ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub document_id: String,
    /// Edit generation captured by the snapshot.
    pub generation: u64,
    pub record: DesignRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Stored, and nothing changed since the snapshot.
    Saved,
    /// Stored, but newer edits are still pending.
    Superseded,
    Failed(PersistError),
    /// The session moved to another document meanwhile.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    document_id: String,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct PersistenceOrchestrator {
    debouncer: Debouncer,
    state: PersistState,
    in_flight: Option<InFlight>,
    follow_up: bool,
    generation: u64,
    category: Option<String>,
}

impl PersistenceOrchestrator {
    pub fn new(delay: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(delay),
            state: PersistState::Idle,
            in_flight: None,
            follow_up: false,
            generation: 0,
            category: None,
        }
    }

    /// Category sent with every save.
    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category;
    }

    pub fn state(&self) -> PersistState {
        self.state
    }

    /// Number of edits recorded so far.
    pub fn edit_generation(&self) -> u64 {
        self.generation
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Record an edit and restart the quiet window.
    pub fn mark_modified(
        &mut self,
        session: &mut EditorSession,
        now: Instant,
    ) -> Result<(), PersistError> {
        let Some(document_id) = session.document_id() else {
            log::error!("edit with no active document; not scheduling a save");
            return Err(PersistError::NoActiveDocument);
        };
        if !session.loaded {
            log::warn!("edit before {document_id} loaded; not scheduling a save");
            return Err(PersistError::NotLoaded(document_id.to_string()));
        }
        self.generation += 1;
        session.modified = true;
        session.last_modified_at = Some(now);
        session.save_status = SaveStatus::Saving;
        self.debouncer.schedule(now);
        if self.in_flight.is_none() {
            self.state = PersistState::PendingSave;
        }
        Ok(())
    }

    /// Drop any pending window, e.g. when switching documents.
    pub fn cancel_pending(&mut self) -> bool {
        self.follow_up = false;
        let cancelled = self.debouncer.cancel();
        if cancelled && self.in_flight.is_none() {
            self.state = PersistState::Idle;
        }
        cancelled
    }

    /// Fire the window if it has elapsed.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        let fired = self.debouncer.fire(now).is_some();
        self.debouncer.finish();
        fired
    }

    /// Snapshot the scene into a ticket. Returns `None` when there is
    /// nothing to send right now: no document, no surface, or a save
    /// already in flight (which then gets a follow-up).
    pub fn begin_flush<S: RenderSurface>(
        &mut self,
        session: &mut EditorSession,
        adapter: &SceneAdapter<S>,
    ) -> Option<SaveTicket> {
        if self.in_flight.is_some() {
            log::debug!("save already in flight; queueing a follow-up");
            self.follow_up = true;
            return None;
        }
        let Some(document_id) = session.document_id().map(str::to_string) else {
            self.state = PersistState::Idle;
            return None;
        };
        if !session.loaded {
            log::warn!("not saving {document_id}: the scene does not hold its content");
            self.state = PersistState::Idle;
            return None;
        }

        let snapshot = match adapter.capture_snapshot(Some(&document_id), session.document_name()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("cannot snapshot {document_id}: {e}");
                self.state = PersistState::Idle;
                return None;
            }
        };
        let record = match encode_document(&snapshot, self.category.clone()) {
            Ok(record) => record,
            Err(e) => {
                log::error!("cannot encode {document_id}: {e}");
                self.state = PersistState::Error;
                session.save_status = SaveStatus::Error;
                return None;
            }
        };

        self.state = PersistState::Saving;
        session.save_status = SaveStatus::Saving;
        self.in_flight = Some(InFlight {
            document_id: document_id.clone(),
            generation: self.generation,
        });
        log::debug!("saving {document_id} at edit {}", self.generation);
        Some(SaveTicket {
            document_id,
            generation: self.generation,
            record,
        })
    }

    /// Apply the store's answer for `ticket`.
    pub fn complete_flush(
        &mut self,
        session: &mut EditorSession,
        ticket: &SaveTicket,
        result: Result<DesignRecord, StoreError>,
        now: Instant,
    ) -> SaveOutcome {
        let expected = InFlight {
            document_id: ticket.document_id.clone(),
            generation: ticket.generation,
        };
        if self.in_flight.as_ref() == Some(&expected) {
            self.in_flight = None;
        }

        let stale = session.document_id() != Some(ticket.document_id.as_str());
        let outcome = if stale {
            log::debug!("dropping save result for inactive document {}", ticket.document_id);
            SaveOutcome::Stale
        } else {
            match result {
                Ok(_) if ticket.generation == self.generation => {
                    session.modified = false;
                    session.save_status = SaveStatus::Saved;
                    self.state = PersistState::Idle;
                    SaveOutcome::Saved
                }
                Ok(_) => {
                    log::debug!(
                        "saved edit {} of {}; newer edits pending",
                        ticket.generation,
                        self.generation
                    );
                    self.state = PersistState::PendingSave;
                    SaveOutcome::Superseded
                }
                Err(e) => {
                    log::error!("failed to save {}: {e}", ticket.document_id);
                    session.save_status = SaveStatus::Error;
                    self.state = PersistState::Error;
                    SaveOutcome::Failed(PersistError::SaveFailed(e.to_string()))
                }
            }
        };

        // A window that elapsed during the request belongs to whatever
        // document is active now, stale result or not.
        if std::mem::take(&mut self.follow_up) && session.modified && !self.debouncer.is_pending()
        {
            self.debouncer.schedule_at(now);
        }
        if stale {
            self.state = if self.debouncer.is_pending() {
                PersistState::PendingSave
            } else {
                PersistState::Idle
            };
        } else if self.debouncer.is_pending() && self.state != PersistState::Error {
            self.state = PersistState::PendingSave;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;
    use ab_core::{Document, ShapePreset};

    const DELAY: Duration = Duration::from_millis(500);

    fn setup() -> (PersistenceOrchestrator, EditorSession, SceneAdapter<MemorySurface>) {
        let mut session = EditorSession::default();
        session.set_document_id("d1");
        session.loaded = true;
        let mut adapter = SceneAdapter::new(|_| {});
        adapter.attach(MemorySurface::new(825.0, 465.0)).unwrap();
        let mut doc = Document::blank(825.0, 465.0);
        doc.push(ShapePreset::Rectangle.build(0.0, 0.0)).unwrap();
        adapter.materialize(&doc).unwrap();
        (PersistenceOrchestrator::new(DELAY), session, adapter)
    }

    fn stored(ticket: &SaveTicket) -> Result<DesignRecord, StoreError> {
        Ok(ticket.record.clone())
    }

    #[test]
    fn edit_without_document_is_rejected() {
        let mut persist = PersistenceOrchestrator::new(DELAY);
        let mut session = EditorSession::default();
        assert_eq!(
            persist.mark_modified(&mut session, Instant::now()),
            Err(PersistError::NoActiveDocument)
        );
        assert!(!session.modified);
        assert_eq!(persist.next_deadline(), None);
    }

    #[test]
    fn edit_before_load_is_rejected() {
        let (mut persist, mut session, adapter) = setup();
        session.loaded = false;
        assert_eq!(
            persist.mark_modified(&mut session, Instant::now()),
            Err(PersistError::NotLoaded("d1".into()))
        );
        assert!(!session.modified);
        assert_eq!(persist.next_deadline(), None);
        assert_eq!(persist.begin_flush(&mut session, &adapter), None);
        assert!(!persist.is_saving());
    }

    #[test]
    fn successful_save_clears_modified() {
        let (mut persist, mut session, adapter) = setup();
        let t0 = Instant::now();
        persist.mark_modified(&mut session, t0).unwrap();
        assert_eq!(persist.state(), PersistState::PendingSave);
        assert_eq!(session.save_status, SaveStatus::Saving);
        assert!(!persist.poll_due(t0 + Duration::from_millis(100)));
        assert!(persist.poll_due(t0 + DELAY));

        let ticket = persist.begin_flush(&mut session, &adapter).unwrap();
        assert_eq!(ticket.record.id.as_deref(), Some("d1"));
        assert_eq!(persist.state(), PersistState::Saving);

        let outcome = persist.complete_flush(&mut session, &ticket, stored(&ticket), t0 + DELAY);
        assert_eq!(outcome, SaveOutcome::Saved);
        assert!(!session.modified);
        assert_eq!(session.save_status, SaveStatus::Saved);
        assert_eq!(persist.state(), PersistState::Idle);
    }

    #[test]
    fn failure_keeps_modified() {
        let (mut persist, mut session, adapter) = setup();
        let t0 = Instant::now();
        persist.mark_modified(&mut session, t0).unwrap();
        persist.poll_due(t0 + DELAY);
        let ticket = persist.begin_flush(&mut session, &adapter).unwrap();
        let outcome = persist.complete_flush(
            &mut session,
            &ticket,
            Err(StoreError::Request("HTTP 500".into())),
            t0 + DELAY,
        );
        assert!(matches!(outcome, SaveOutcome::Failed(_)));
        assert!(session.modified);
        assert_eq!(session.save_status, SaveStatus::Error);
        assert_eq!(persist.state(), PersistState::Error);
        // No automatic retry.
        assert_eq!(persist.next_deadline(), None);
    }

    #[test]
    fn edit_during_flight_gets_one_follow_up() {
        let (mut persist, mut session, adapter) = setup();
        let t0 = Instant::now();
        persist.mark_modified(&mut session, t0).unwrap();
        persist.poll_due(t0 + DELAY);
        let first = persist.begin_flush(&mut session, &adapter).unwrap();

        // Two edits land while the request is out; their window elapses too.
        let t1 = t0 + DELAY + Duration::from_millis(10);
        persist.mark_modified(&mut session, t1).unwrap();
        persist.mark_modified(&mut session, t1).unwrap();
        assert!(persist.poll_due(t1 + DELAY));
        assert_eq!(persist.begin_flush(&mut session, &adapter), None);

        let t2 = t1 + DELAY * 2;
        let outcome = persist.complete_flush(&mut session, &first, stored(&first), t2);
        assert_eq!(outcome, SaveOutcome::Superseded);
        assert!(session.modified);
        assert_eq!(persist.next_deadline(), Some(t2));

        assert!(persist.poll_due(t2));
        let second = persist.begin_flush(&mut session, &adapter).unwrap();
        assert_eq!(second.generation, 3);
        let outcome = persist.complete_flush(&mut session, &second, stored(&second), t2);
        assert_eq!(outcome, SaveOutcome::Saved);
        assert!(!session.modified);
        assert_eq!(persist.next_deadline(), None);
    }

    #[test]
    fn stale_result_is_dropped() {
        let (mut persist, mut session, adapter) = setup();
        let t0 = Instant::now();
        persist.mark_modified(&mut session, t0).unwrap();
        persist.poll_due(t0 + DELAY);
        let ticket = persist.begin_flush(&mut session, &adapter).unwrap();

        session.reset();
        session.set_document_id("d2");
        let outcome = persist.complete_flush(
            &mut session,
            &ticket,
            Err(StoreError::Request("late".into())),
            t0 + DELAY,
        );
        assert_eq!(outcome, SaveOutcome::Stale);
        assert_eq!(session.save_status, SaveStatus::Saved);
        assert!(!persist.is_saving());
    }

    #[test]
    fn stale_result_releases_follow_up_for_new_document() {
        let (mut persist, mut session, adapter) = setup();
        let t0 = Instant::now();
        persist.mark_modified(&mut session, t0).unwrap();
        persist.poll_due(t0 + DELAY);
        let first = persist.begin_flush(&mut session, &adapter).unwrap();

        // Switch to d2 and edit it; its window elapses behind d1's request.
        persist.cancel_pending();
        session.reset();
        session.set_document_id("d2");
        session.loaded = true;
        let t1 = t0 + DELAY + Duration::from_millis(10);
        persist.mark_modified(&mut session, t1).unwrap();
        assert!(persist.poll_due(t1 + DELAY));
        assert_eq!(persist.begin_flush(&mut session, &adapter), None);

        let t2 = t1 + DELAY * 2;
        let outcome = persist.complete_flush(&mut session, &first, stored(&first), t2);
        assert_eq!(outcome, SaveOutcome::Stale);
        assert!(session.modified);
        assert_eq!(persist.next_deadline(), Some(t2));
        assert_eq!(persist.state(), PersistState::PendingSave);

        assert!(persist.poll_due(t2));
        let second = persist.begin_flush(&mut session, &adapter).unwrap();
        assert_eq!(second.document_id, "d2");
        let outcome = persist.complete_flush(&mut session, &second, stored(&second), t2);
        assert_eq!(outcome, SaveOutcome::Saved);
        assert!(!session.modified);
    }

    #[test]
    fn cancel_pending_drops_window() {
        let (mut persist, mut session, _adapter) = setup();
        let t0 = Instant::now();
        persist.mark_modified(&mut session, t0).unwrap();
        assert!(persist.cancel_pending());
        assert!(!persist.poll_due(t0 + DELAY));
        assert_eq!(persist.state(), PersistState::Idle);
    }

    #[test]
    fn flush_without_surface_does_nothing() {
        let mut persist = PersistenceOrchestrator::new(DELAY);
        let mut session = EditorSession::default();
        session.set_document_id("d1");
        session.loaded = true;
        let adapter: SceneAdapter<MemorySurface> = SceneAdapter::new(|_| {});
        persist.mark_modified(&mut session, Instant::now()).unwrap();
        assert_eq!(persist.begin_flush(&mut session, &adapter), None);
        assert!(session.modified);
    }

    #[test]
    fn category_is_sent() {
        let (mut persist, mut session, adapter) = setup();
        persist.set_category(Some("instagram_post".into()));
        persist.mark_modified(&mut session, Instant::now()).unwrap();
        let ticket = persist.begin_flush(&mut session, &adapter).unwrap();
        assert_eq!(ticket.record.category.as_deref(), Some("instagram_post"));
    }
}
