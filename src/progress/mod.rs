//! Learner progress: conversations, vocabulary, activity and fluency.

/// Strongly-typed identifiers.
pub mod ids;
/// Fluency score computation.
pub mod scoring;
/// Local snapshot persistence.
pub mod snapshot;
/// The progress store.
pub mod store;
/// Stored record types.
pub mod types;

pub use ids::{ConversationId, MessageId, UserId};
pub use scoring::fluency_score;
pub use snapshot::{SnapshotStore, SqliteSnapshotStore, StorageError};
pub use store::{ProgressState, ProgressStore};
pub use types::{
    Aggregates, ChatMessage, Conversation, MessageRole, MessageUpdate, PracticeSession, TurnStats,
    VocabularyStatus, VocabularyWord,
};
