//! Remote document store.
//!
//! Every request carries a bearer [`Credential`]; without one the request
//! fails with [`StoreError::Unauthenticated`] before anything is sent.
//! [`MemoryStore`] implements the store's update rules in-process.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use ab_core::{DesignRecord, Document};

use crate::error::StoreError;

/// Bearer token for the signed-in user.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

pub trait CredentialProvider {
    /// The current session's credential, if signed in.
    fn credential(&self) -> Option<Credential>;

    fn require(&self) -> Result<Credential, StoreError> {
        self.credential().ok_or(StoreError::Unauthenticated)
    }
}

impl CredentialProvider for Option<Credential> {
    fn credential(&self) -> Option<Credential> {
        self.clone()
    }
}

impl CredentialProvider for Credential {
    fn credential(&self) -> Option<Credential> {
        Some(self.clone())
    }
}

pub trait DocumentStore {
    fn get(
        &self,
        credential: &Credential,
        id: &str,
    ) -> impl Future<Output = Result<DesignRecord, StoreError>>;

    /// Create (no ID) or update (with ID). Only fields present in `record`
    /// are written. Returns the stored record.
    fn save(
        &self,
        credential: &Credential,
        record: DesignRecord,
    ) -> impl Future<Output = Result<DesignRecord, StoreError>>;

    fn delete(&self, credential: &Credential, id: &str)
    -> impl Future<Output = Result<(), StoreError>>;

    /// The caller's designs, most recently updated first.
    fn list(&self, credential: &Credential)
    -> impl Future<Output = Result<Vec<DesignRecord>, StoreError>>;
}

// ─── In-memory store ─────────────────────────────────────────────────────

struct Stored {
    owner: String,
    record: DesignRecord,
}

/// Single-threaded in-memory store. The credential's token doubles as the
/// owner's user ID.
#[derive(Default)]
pub struct MemoryStore {
    designs: RefCell<HashMap<String, Stored>>,
    next_id: Cell<u64>,
    /// Logical clock for `updatedAt`.
    clock: Cell<u64>,
    saves: RefCell<Vec<DesignRecord>>,
    fail_saves: Cell<usize>,
    fail_gets: Cell<usize>,
    /// Simulated request latency.
    pub latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a design owned by `owner`, bypassing the update rules.
    pub fn insert(&self, owner: &str, record: DesignRecord) -> String {
        let id = record.id.clone().unwrap_or_else(|| self.fresh_id());
        let record = DesignRecord {
            id: Some(id.clone()),
            updated_at: Some(self.tick()),
            ..record
        };
        self.designs.borrow_mut().insert(
            id.clone(),
            Stored {
                owner: owner.to_string(),
                record,
            },
        );
        id
    }

    /// Make the next `n` saves fail.
    pub fn fail_next_saves(&self, n: usize) {
        self.fail_saves.set(n);
    }

    /// Make the next `n` fetches fail as if the backend were down.
    pub fn fail_next_gets(&self, n: usize) {
        self.fail_gets.set(n);
    }

    /// Every record passed to `save`, in call order, including failed ones.
    pub fn save_log(&self) -> Vec<DesignRecord> {
        self.saves.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.borrow().len()
    }

    /// Read a design without credentials, for assertions.
    pub fn peek(&self, id: &str) -> Option<DesignRecord> {
        self.designs.borrow().get(id).map(|s| s.record.clone())
    }

    fn fresh_id(&self) -> String {
        self.next_id.set(self.next_id.get() + 1);
        format!("design-{}", self.next_id.get())
    }

    fn tick(&self) -> u64 {
        self.clock.set(self.clock.get() + 1);
        self.clock.get()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Consume one armed failure, if any.
fn take_failure(armed: &Cell<usize>) -> bool {
    let remaining = armed.get();
    if remaining > 0 {
        armed.set(remaining - 1);
        true
    } else {
        false
    }
}

/// Copy the fields present in `patch` over `target`.
fn merge(target: &mut DesignRecord, patch: DesignRecord) {
    if let Some(name) = patch.name {
        target.name = Some(name);
    }
    if let Some(width) = patch.width {
        target.width = Some(width);
    }
    if let Some(height) = patch.height {
        target.height = Some(height);
    }
    if let Some(canvas) = patch.canvas_data {
        target.canvas_data = Some(canvas);
    }
    if let Some(category) = patch.category {
        target.category = Some(category);
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, credential: &Credential, id: &str) -> Result<DesignRecord, StoreError> {
        self.delay().await;
        if take_failure(&self.fail_gets) {
            return Err(StoreError::Request("HTTP 503".into()));
        }
        let designs = self.designs.borrow();
        match designs.get(id) {
            Some(stored) if stored.owner == credential.token() => Ok(stored.record.clone()),
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn save(
        &self,
        credential: &Credential,
        record: DesignRecord,
    ) -> Result<DesignRecord, StoreError> {
        self.delay().await;
        self.saves.borrow_mut().push(record.clone());
        if take_failure(&self.fail_saves) {
            return Err(StoreError::Request("HTTP 500".into()));
        }

        let now = self.tick();
        let mut designs = self.designs.borrow_mut();
        match record.id.clone() {
            Some(id) => {
                let stored = designs
                    .get_mut(&id)
                    .filter(|s| s.owner == credential.token())
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                merge(&mut stored.record, record);
                stored.record.updated_at = Some(now);
                log::debug!("updated design {id}");
                Ok(stored.record.clone())
            }
            None => {
                let id = self.fresh_id();
                let mut created = DesignRecord {
                    id: Some(id.clone()),
                    name: Some(Document::DEFAULT_NAME.to_string()),
                    ..Default::default()
                };
                merge(&mut created, record);
                created.updated_at = Some(now);
                designs.insert(
                    id.clone(),
                    Stored {
                        owner: credential.token().to_string(),
                        record: created.clone(),
                    },
                );
                log::debug!("created design {id}");
                Ok(created)
            }
        }
    }

    async fn delete(&self, credential: &Credential, id: &str) -> Result<(), StoreError> {
        self.delay().await;
        let mut designs = self.designs.borrow_mut();
        match designs.get(id) {
            Some(stored) if stored.owner == credential.token() => {
                designs.remove(id);
                Ok(())
            }
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list(&self, credential: &Credential) -> Result<Vec<DesignRecord>, StoreError> {
        self.delay().await;
        let mut records: Vec<DesignRecord> = self
            .designs
            .borrow()
            .values()
            .filter(|s| s.owner == credential.token())
            .map(|s| s.record.clone())
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }
}
