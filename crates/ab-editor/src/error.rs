//! Error types shared across the editor.

use ab_core::{CodecError, ObjectVariant};
use thiserror::Error;

use crate::surface::SubscriptionId;

/// Failure reported by a rendering surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("surface has been disposed")]
    Disposed,
    #[error("no object with id `{0}` on the surface")]
    UnknownObject(String),
    #[error("object id `{0}` is already on the surface")]
    DuplicateId(String),
    #[error("unknown subscription {0:?}")]
    UnknownSubscription(SubscriptionId),
    #[error("`{property}` does not apply to {variant:?} objects")]
    PropertyMismatch {
        property: &'static str,
        variant: ObjectVariant,
    },
    #[error("surface backend failed: {0}")]
    Backend(String),
}

/// Failure of a scene adapter operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// The surface has not been created yet. The caller may retry once
    /// initialization completes.
    #[error("rendering surface is not ready")]
    SurfaceNotReady,
    #[error("surface initialization already attempted")]
    AlreadyInitializing,
    #[error("rendering surface unavailable: {0}")]
    SurfaceUnavailable(String),
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] CodecError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Failure talking to the document store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("design `{0}` not found")]
    NotFound(String),
    #[error("store request failed: {0}")]
    Request(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Failure of the persistence orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistError {
    #[error("no active document to save")]
    NoActiveDocument,
    #[error("design `{0}` has not been loaded; refusing to save over it")]
    NotLoaded(String),
    #[error("save failed: {0}")]
    SaveFailed(String),
}

/// Failure opening a design.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("design `{0}` was already loaded into this surface")]
    AlreadyAttempted(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}
