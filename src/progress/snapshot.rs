//! Local persistence of the progress state.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::Utc;
use rusqlite::OptionalExtension;
use thiserror::Error;
use tokio_rusqlite::Connection;

use crate::progress::store::ProgressState;

/// Errors raised by snapshot storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Snapshot JSON could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future type for snapshot store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where the progress state is kept between runs.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved state, if any.
    ///
    /// # Errors
    /// Returns an error if storage access or decoding fails.
    fn load(&self) -> StoreFuture<'_, StorageResult<Option<ProgressState>>>;

    /// Replace the saved state.
    ///
    /// # Errors
    /// Returns an error if storage access or encoding fails.
    fn save(&self, state: &ProgressState) -> StoreFuture<'_, StorageResult<()>>;
}

const SNAPSHOT_TABLE: &str = "progress_snapshots";
const SNAPSHOT_KEY: &str = "current";

/// `SQLite` snapshot store holding a single JSON row.
pub struct SqliteSnapshotStore {
    conn: Connection,
}

impl SqliteSnapshotStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        Self::from_connection(conn).await
    }

    /// Use an existing connection, creating the table if needed.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.call(|conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {SNAPSHOT_TABLE} (
                    id TEXT PRIMARY KEY,
                    state_json TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self) -> StoreFuture<'_, StorageResult<Option<ProgressState>>> {
        Box::pin(async move {
            let json = self
                .conn
                .call(|conn| {
                    let json: Option<String> = conn
                        .query_row(
                            &format!("SELECT state_json FROM {SNAPSHOT_TABLE} WHERE id = ?1"),
                            rusqlite::params![SNAPSHOT_KEY],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(json)
                })
                .await?;

            match json {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn save(&self, state: &ProgressState) -> StoreFuture<'_, StorageResult<()>> {
        let encoded = serde_json::to_string(state);
        Box::pin(async move {
            let state_json = encoded?;
            let updated_at = Utc::now().timestamp_millis();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {SNAPSHOT_TABLE} (id, state_json, updated_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![SNAPSHOT_KEY, state_json, updated_at],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}
