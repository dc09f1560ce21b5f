//! Startup and teardown of the tutor server.
//!
//! Owns the progress store lifecycle: hydrate from the snapshot on start,
//! save on shutdown, and drain the mirror queue before exiting.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;

use crate::config::TutorConfig;
use crate::inference::client::{HfInferenceClient, InferenceGateway};
use crate::progress::snapshot::{SnapshotStore, SqliteSnapshotStore};
use crate::progress::store::{ProgressState, ProgressStore};
use crate::progress::ids::UserId;
use crate::server::{self, AppState};
use crate::sync::mirror::SupabaseMirror;
use crate::sync::queue::SyncWorker;

/// Run the server (used by the `lingo-tutor-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting lingo tutor v{}", env!("CARGO_PKG_VERSION"));

    let config = TutorConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        return ExitCode::from(1);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Server error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Hydrate state, serve until Ctrl-C, then persist and drain.
///
/// # Errors
/// Returns an error if storage, clients or the listener cannot be set up.
pub async fn serve(config: TutorConfig) -> anyhow::Result<()> {
    if config.inference.api_key.is_none() {
        tracing::warn!("HUGGINGFACE_API_KEY is not set; inference requests will be anonymous");
    }

    let snapshots = SqliteSnapshotStore::open(&config.storage.sqlite_path)
        .await
        .with_context(|| {
            format!(
                "failed to open snapshot database {}",
                config.storage.sqlite_path.display()
            )
        })?;
    let snapshots: Arc<dyn SnapshotStore> = Arc::new(snapshots);

    let mut state = match snapshots.load().await {
        Ok(Some(state)) => state,
        Ok(None) => {
            tracing::info!("No saved progress; starting fresh");
            ProgressState::new(UserId::new())
        }
        Err(e) => {
            tracing::warn!("Saved progress is unreadable, starting fresh: {e}");
            ProgressState::new(UserId::new())
        }
    };
    if let Some(owner) = config.sync.user_id {
        state.owner = owner;
    }
    let mut store = ProgressStore::from_state(state);
    tracing::info!(owner = %store.owner(), score = store.fluency_score(), "Progress loaded");

    let worker = match config.sync.credentials() {
        Some((url, key)) => {
            let mirror = SupabaseMirror::new(url, key).context("failed to build mirror client")?;
            let (worker, handle) = SyncWorker::new(Arc::new(mirror), &config.sync);
            store = store.with_sync(handle);
            let shutdown = worker.shutdown_notifier();
            Some((worker.spawn(), shutdown))
        }
        None => {
            tracing::info!("Remote mirror not configured; progress stays local");
            None
        }
    };

    let gateway: Arc<dyn InferenceGateway> = Arc::new(
        HfInferenceClient::new(config.inference.clone())
            .context("failed to build inference client")?,
    );
    let store = Arc::new(RwLock::new(store));
    let app = AppState::new(config, gateway, Arc::clone(&store), Some(Arc::clone(&snapshots)));

    server::run_server_with_shutdown(Arc::clone(&app), shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("Saving progress before exit");
    app.persist().await;

    // The store holds the queue sender; drop it so the worker sees the end.
    drop(app);
    drop(store);
    if let Some((task, shutdown)) = worker {
        shutdown.notify_one();
        if let Err(e) = task.await {
            tracing::warn!("Sync worker ended abnormally: {e}");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
