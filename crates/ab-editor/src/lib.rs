pub mod adapter;
pub mod brush;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod error;
pub mod loader;
pub mod memory;
pub mod persistence;
pub mod property;
pub mod selection;
pub mod session;
pub mod store;
pub mod surface;

pub use adapter::{DisposalStep, SceneAdapter};
pub use brush::{BrushSettings, DrawingBrush};
pub use config::{ConfigError, EditorConfig};
pub use debounce::{Debouncer, TimerState};
pub use editor::{Editor, EditorEvent, SaveRequest, SaveResponse};
pub use error::{LoadError, PersistError, SceneError, StoreError, SurfaceError};
pub use loader::{DesignLoader, LoadReport, LoadState};
pub use memory::{MemorySurface, MemorySurfaceFactory};
pub use persistence::{PersistState, PersistenceOrchestrator, SaveOutcome, SaveTicket};
pub use property::ObjectProperty;
pub use selection::{
    BorderStyle, EditOutcome, FilterChoice, ImageForm, PropertyForm, SelectionState,
    SelectionSync, TextForm, VariantForm,
};
pub use session::{EditMode, EditorSession, SaveStatus};
pub use store::{Credential, CredentialProvider, DocumentStore, MemoryStore};
pub use surface::{
    Listener, RenderSurface, SubscriptionId, SurfaceEvent, SurfaceEventKind, SurfaceFactory,
};
