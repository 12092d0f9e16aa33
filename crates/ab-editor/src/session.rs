//! Per-editor session state.
//!
//! The session is owned by exactly one [`Editor`](crate::Editor). It is
//! created in its default state on mount and returned to that state on
//! unmount; nothing outlives the editor instance.

use ab_core::ObjectId;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Editing,
    Viewing,
}

/// User-visible persistence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    Idle,
    Saving,
    /// Fresh sessions report `Saved`: there is nothing unsaved yet.
    #[default]
    Saved,
    Error,
}

impl SaveStatus {
    pub fn label(self) -> &'static str {
        match self {
            SaveStatus::Idle => "Idle",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Saved => "Saved",
            SaveStatus::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorSession {
    document_id: Option<String>,
    document_name: String,
    default_name: String,
    pub edit_mode: EditMode,
    pub selected_object: Option<ObjectId>,
    pub modified: bool,
    pub save_status: SaveStatus,
    pub last_modified_at: Option<Instant>,
    /// Set once the current document has been materialized.
    pub loaded: bool,
}

impl EditorSession {
    pub fn new(default_name: impl Into<String>) -> Self {
        let default_name = default_name.into();
        Self {
            document_id: None,
            document_name: default_name.clone(),
            default_name,
            edit_mode: EditMode::default(),
            selected_object: None,
            modified: false,
            save_status: SaveStatus::default(),
            last_modified_at: None,
            loaded: false,
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// Change the active document ID. Other fields are left alone; callers
    /// switching documents reset the session first.
    pub fn set_document_id(&mut self, id: impl Into<String>) {
        self.document_id = Some(id.into());
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn set_document_name(&mut self, name: impl Into<String>) {
        self.document_name = name.into();
    }

    pub fn is_editing(&self) -> bool {
        self.edit_mode == EditMode::Editing
    }

    /// Return every field to its default.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.default_name));
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(ab_core::Document::DEFAULT_NAME)
    }
}
