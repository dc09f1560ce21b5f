//! Rows mirrored to the remote relational store.
//!
//! Field names follow the remote column names, so each row serializes
//! directly into a `PostgREST` request body.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::progress::ids::{ConversationId, MessageId, UserId};
use crate::progress::types::{Aggregates, MessageRole};
use crate::scenario::Scenario;

/// Per-user aggregate counters and the current score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileRow {
    /// Owner id (primary key of `profiles`).
    pub id: UserId,
    /// Derived fluency score.
    pub fluency_score: u8,
    /// Completed turns.
    pub total_messages: u64,
    /// Turns with a correction.
    pub grammar_mistakes: u64,
    /// Words spoken.
    pub total_word_count: u64,
    /// Complex words spoken.
    pub total_complex_words: u64,
    /// Summed latency.
    pub total_response_time_ms: u64,
    /// Time of the update.
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// Build a profile row from totals.
    #[must_use]
    pub fn from_aggregates(owner: UserId, totals: &Aggregates, fluency_score: u8) -> Self {
        Self {
            id: owner,
            fluency_score,
            total_messages: totals.total_messages,
            grammar_mistakes: totals.grammar_mistakes,
            total_word_count: totals.total_word_count,
            total_complex_words: totals.total_complex_words,
            total_response_time_ms: totals.total_response_time_ms,
            updated_at: Utc::now(),
        }
    }
}

/// Daily practice count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionRow {
    /// Owner id.
    pub user_id: UserId,
    /// Calendar day.
    pub date: NaiveDate,
    /// Turns that day.
    pub message_count: u32,
}

/// Conversation header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversationRow {
    /// Conversation id.
    pub id: ConversationId,
    /// Owner id.
    pub user_id: UserId,
    /// Title at insert time.
    pub title: String,
    /// Selected scenario.
    pub scenario: Option<Scenario>,
    /// Creation time.
    pub date: DateTime<Utc>,
}

/// A chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageRow {
    /// Message id.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Owner id.
    pub user_id: UserId,
    /// Author role.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
    /// Ghost correction.
    pub correction: Option<String>,
}

/// A saved vocabulary word.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VocabularyRow {
    /// Owner id.
    pub user_id: UserId,
    /// The word.
    pub word: String,
    /// Context sentence.
    pub context: Option<String>,
    /// Definition.
    pub definition: Option<String>,
    /// Capture time.
    pub date: DateTime<Utc>,
}

/// One pending remote write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncRecord {
    /// Upsert into `profiles`.
    Profile(ProfileRow),
    /// Upsert into `sessions`.
    Session(SessionRow),
    /// Upsert into `conversations`.
    Conversation(ConversationRow),
    /// Title change of an existing conversation.
    ConversationTitle {
        /// Conversation id.
        id: ConversationId,
        /// New title.
        title: String,
    },
    /// Upsert into `messages`.
    Message(MessageRow),
    /// Upsert into `vocabulary`.
    Vocabulary(VocabularyRow),
}

impl SyncRecord {
    /// Remote table the record lands in.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Profile(_) => "profiles",
            Self::Session(_) => "sessions",
            Self::Conversation(_) | Self::ConversationTitle { .. } => "conversations",
            Self::Message(_) => "messages",
            Self::Vocabulary(_) => "vocabulary",
        }
    }

    /// Unique-constraint columns to upsert on, when not the primary key.
    #[must_use]
    pub const fn conflict_target(&self) -> Option<&'static str> {
        match self {
            Self::Session(_) => Some("user_id,date"),
            Self::Vocabulary(_) => Some("user_id,word"),
            Self::Profile(_)
            | Self::Conversation(_)
            | Self::ConversationTitle { .. }
            | Self::Message(_) => None,
        }
    }

    /// JSON request body for the record.
    ///
    /// # Errors
    /// Returns an error if a row cannot be serialized.
    pub fn body(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Profile(row) => serde_json::to_value(row),
            Self::Session(row) => serde_json::to_value(row),
            Self::Conversation(row) => serde_json::to_value(row),
            Self::ConversationTitle { title, .. } => Ok(serde_json::json!({ "title": title })),
            Self::Message(row) => serde_json::to_value(row),
            Self::Vocabulary(row) => serde_json::to_value(row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables() {
        let owner = UserId::new();
        let session = SyncRecord::Session(SessionRow {
            user_id: owner,
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            message_count: 2,
        });
        assert_eq!(session.table(), "sessions");
        assert_eq!(session.conflict_target(), Some("user_id,date"));

        let title = SyncRecord::ConversationTitle {
            id: ConversationId::new(),
            title: "Hi".to_string(),
        };
        assert_eq!(title.table(), "conversations");
        assert_eq!(title.conflict_target(), None);
    }

    #[test]
    fn test_message_row_serializes_remote_columns() {
        let row = MessageRow {
            id: MessageId::new(),
            conversation_id: ConversationId::new(),
            user_id: UserId::new(),
            role: MessageRole::Ai,
            content: "Hello!".to_string(),
            correction: None,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["role"], "ai");
        assert_eq!(value["content"], "Hello!");
        assert!(value["correction"].is_null());
        assert!(value.get("conversation_id").is_some());
    }

    #[test]
    fn test_session_date_serializes_as_iso_day() {
        let row = SessionRow {
            user_id: UserId::new(),
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            message_count: 1,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["date"], "2026-10-18");
    }
}
