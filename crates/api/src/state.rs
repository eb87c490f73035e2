use std::sync::Arc;

use lessoncast_db::JobStore;
use lessoncast_queue::TaskPublisher;

use crate::config::ServerConfig;
use crate::notifications::NotificationRouter;
use crate::storage::BlobStore;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Job Store.
    pub store: Arc<dyn JobStore>,
    /// Task Publisher.
    pub publisher: Arc<dyn TaskPublisher>,
    /// Blob storage for uploaded sources.
    pub blobs: Arc<dyn BlobStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job-status channel connections.
    pub job_hub: Arc<WsManager>,
    /// Content/discussion channel connections.
    pub content_hub: Arc<WsManager>,
    /// Routes notifications to the two hubs.
    pub notifications: Arc<NotificationRouter>,
}

impl AppState {
    /// Assemble state around the given collaborators, creating both hubs.
    pub fn new(
        store: Arc<dyn JobStore>,
        publisher: Arc<dyn TaskPublisher>,
        blobs: Arc<dyn BlobStore>,
        config: ServerConfig,
    ) -> Self {
        let job_hub = Arc::new(WsManager::new("job_status"));
        let content_hub = Arc::new(WsManager::new("content_discussion"));
        let notifications = Arc::new(NotificationRouter::new(
            Arc::clone(&job_hub),
            Arc::clone(&content_hub),
        ));

        Self {
            store,
            publisher,
            blobs,
            config: Arc::new(config),
            job_hub,
            content_hub,
            notifications,
        }
    }

    /// Extra attempts allowed after a version conflict.
    pub fn conflict_retries(&self) -> u32 {
        self.config.pipeline.store_conflict_retries
    }
}
