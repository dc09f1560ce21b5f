//! Best-effort mirroring of progress to a remote relational store.

/// Remote backends.
pub mod mirror;
/// Background delivery queue.
pub mod queue;
/// Rows written to the remote store.
pub mod record;

pub use mirror::{RemoteMirror, SupabaseMirror, SyncError};
pub use queue::{SyncHandle, SyncWorker};
pub use record::SyncRecord;
