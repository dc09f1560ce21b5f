//! Application state shared across all request handlers.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::TutorConfig;
use crate::inference::client::InferenceGateway;
use crate::pipeline::speech::ClientPlayback;
use crate::pipeline::turn::TurnPipeline;
use crate::progress::snapshot::SnapshotStore;
use crate::progress::store::ProgressStore;

/// Shared application state.
pub struct AppState {
    /// Runtime configuration.
    pub config: TutorConfig,
    /// Hosted inference.
    pub gateway: Arc<dyn InferenceGateway>,
    /// Learner progress.
    pub store: Arc<RwLock<ProgressStore>>,
    /// Turn pipeline; speech is played by the browser.
    pub pipeline: TurnPipeline,
    /// Local persistence, when enabled.
    pub snapshots: Option<Arc<dyn SnapshotStore>>,
}

impl AppState {
    /// Assemble the state.
    #[must_use]
    pub fn new(
        config: TutorConfig,
        gateway: Arc<dyn InferenceGateway>,
        store: Arc<RwLock<ProgressStore>>,
        snapshots: Option<Arc<dyn SnapshotStore>>,
    ) -> Arc<Self> {
        let pipeline = TurnPipeline::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            Arc::new(ClientPlayback),
        );
        Arc::new(Self {
            config,
            gateway,
            store,
            pipeline,
            snapshots,
        })
    }

    /// Save the current progress. Failures are logged only.
    pub async fn persist(&self) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        let snapshot = self.store.read().await.snapshot();
        match snapshots.save(&snapshot).await {
            Ok(()) => debug!("Progress snapshot saved"),
            Err(err) => warn!(%err, "Failed to save progress snapshot"),
        }
    }
}
