//! Opening a stored design into the live scene.

use ab_core::{CodecError, decode_document_or_blank};

use crate::adapter::SceneAdapter;
use crate::config::EditorConfig;
use crate::error::{LoadError, SceneError};
use crate::session::EditorSession;
use crate::store::{CredentialProvider, DocumentStore};
use crate::surface::RenderSurface;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// What a successful load produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub object_count: usize,
    /// Set when the stored payload was malformed and a blank canvas was
    /// shown instead.
    pub recovered_from: Option<CodecError>,
}

/// Loads each design at most once per surface.
#[derive(Debug, Clone, Default)]
pub struct DesignLoader {
    attempted: Option<String>,
    state: LoadState,
}

impl DesignLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn attempted(&self, id: &str) -> bool {
        self.attempted.as_deref() == Some(id)
    }

    /// Forget the load guard, e.g. after the surface is disposed.
    pub fn reset(&mut self) {
        self.attempted = None;
        self.state = LoadState::Idle;
    }

    /// Fetch design `id` and materialize it.
    ///
    /// A missing surface fails with [`SceneError::SurfaceNotReady`] without
    /// consuming the one attempt, so the caller can retry after
    /// initialization.
    pub async fn load<S, St, C>(
        &mut self,
        id: &str,
        session: &mut EditorSession,
        adapter: &mut SceneAdapter<S>,
        store: &St,
        credentials: &C,
        config: &EditorConfig,
    ) -> Result<LoadReport, LoadError>
    where
        S: RenderSurface,
        St: DocumentStore,
        C: CredentialProvider,
    {
        if !adapter.is_ready() {
            return Err(SceneError::SurfaceNotReady.into());
        }
        if self.attempted(id) {
            return Err(LoadError::AlreadyAttempted(id.to_string()));
        }
        self.attempted = Some(id.to_string());
        self.state = LoadState::Loading;
        session.loaded = false;

        match self.fetch_and_apply(id, session, adapter, store, credentials, config).await {
            Ok(report) => {
                self.state = LoadState::Loaded;
                session.loaded = true;
                log::info!("loaded design {id} ({} objects)", report.object_count);
                Ok(report)
            }
            Err(e) => {
                log::error!("failed to load design {id}: {e}");
                self.state = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_and_apply<S, St, C>(
        &self,
        id: &str,
        session: &mut EditorSession,
        adapter: &mut SceneAdapter<S>,
        store: &St,
        credentials: &C,
        config: &EditorConfig,
    ) -> Result<LoadReport, LoadError>
    where
        S: RenderSurface,
        St: DocumentStore,
        C: CredentialProvider,
    {
        let credential = credentials.require()?;
        let record = store.get(&credential, id).await?;

        let (mut doc, recovered_from) =
            decode_document_or_blank(&record, config.fallback_dimensions());
        if recovered_from.is_some() {
            doc.background = Some(config.background());
        }
        doc.id = Some(id.to_string());
        session.set_document_id(id);
        session.set_document_name(doc.name.clone());

        adapter.materialize(&doc)?;
        Ok(LoadReport {
            object_count: doc.objects.len(),
            recovered_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;
    use crate::store::{Credential, MemoryStore};
    use ab_core::{CanvasPayload, Color, DesignRecord};

    fn record(canvas: &str) -> DesignRecord {
        DesignRecord {
            id: Some("d1".into()),
            name: Some("Card".into()),
            width: Some(500.0),
            height: Some(300.0),
            canvas_data: Some(CanvasPayload::Encoded(canvas.into())),
            ..Default::default()
        }
    }

    fn ready_adapter() -> SceneAdapter<MemorySurface> {
        let mut adapter = SceneAdapter::new(|_| {});
        adapter.attach(MemorySurface::new(825.0, 465.0)).unwrap();
        adapter
    }

    #[tokio::test]
    async fn loads_into_surface() {
        let store = MemoryStore::new();
        store.insert(
            "u1",
            record(r##"{"background":"#123456","objects":[{"type":"rect","id":"rect-a","width":10,"height":10}]}"##),
        );
        let mut adapter = ready_adapter();
        let mut session = EditorSession::default();
        let mut loader = DesignLoader::new();

        let report = loader
            .load(
                "d1",
                &mut session,
                &mut adapter,
                &store,
                &Credential::new("u1"),
                &EditorConfig::default(),
            )
            .await
            .unwrap();
        assert_eq!(report.object_count, 1);
        assert_eq!(report.recovered_from, None);
        assert_eq!(loader.state(), &LoadState::Loaded);
        assert!(session.loaded);
        assert_eq!(session.document_name(), "Card");
        let surface = adapter.surface().unwrap();
        assert_eq!(surface.dimensions(), (500.0, 300.0));
        assert_eq!(surface.background(), Color::rgb(0x12, 0x34, 0x56));
    }

    #[tokio::test]
    async fn loads_only_once() {
        let store = MemoryStore::new();
        store.insert("u1", record(r#"{"objects":[]}"#));
        let mut adapter = ready_adapter();
        let mut session = EditorSession::default();
        let mut loader = DesignLoader::new();
        let config = EditorConfig::default();
        let cred = Credential::new("u1");

        loader
            .load("d1", &mut session, &mut adapter, &store, &cred, &config)
            .await
            .unwrap();
        let again = loader
            .load("d1", &mut session, &mut adapter, &store, &cred, &config)
            .await;
        assert_eq!(again, Err(LoadError::AlreadyAttempted("d1".into())));
    }

    #[tokio::test]
    async fn missing_surface_does_not_consume_attempt() {
        let store = MemoryStore::new();
        store.insert("u1", record(r#"{"objects":[]}"#));
        let mut adapter: SceneAdapter<MemorySurface> = SceneAdapter::new(|_| {});
        let mut session = EditorSession::default();
        let mut loader = DesignLoader::new();
        let config = EditorConfig::default();
        let cred = Credential::new("u1");

        let err = loader
            .load("d1", &mut session, &mut adapter, &store, &cred, &config)
            .await
            .unwrap_err();
        assert_eq!(err, LoadError::Scene(SceneError::SurfaceNotReady));
        assert!(!loader.attempted("d1"));

        adapter.attach(MemorySurface::new(1.0, 1.0)).unwrap();
        assert!(
            loader
                .load("d1", &mut session, &mut adapter, &store, &cred, &config)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn unauthenticated_load_fails() {
        let store = MemoryStore::new();
        let mut adapter = ready_adapter();
        let mut session = EditorSession::default();
        let mut loader = DesignLoader::new();
        let err = loader
            .load(
                "d1",
                &mut session,
                &mut adapter,
                &store,
                &None::<Credential>,
                &EditorConfig::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, LoadError::Store(crate::error::StoreError::Unauthenticated));
        assert!(matches!(loader.state(), LoadState::Failed(_)));
        assert!(!session.loaded);
    }
}
