//! Records held by the progress store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::ids::{ConversationId, MessageId};
use crate::scenario::Scenario;

/// Title given to a conversation before its first user message.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// Maximum title length in characters before the ellipsis.
pub const TITLE_MAX_CHARS: usize = 30;

/// Who authored a message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The learner.
    User,
    /// The tutor model.
    Ai,
}

impl MessageRole {
    /// Stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chat message inside a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Author; fixed at creation.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
    /// Ghost correction of a user utterance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

impl ChatMessage {
    /// New user message with a fresh id.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::User,
            content: content.into(),
            correction: None,
        }
    }

    /// New tutor message with a fresh id.
    #[must_use]
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::Ai,
            content: content.into(),
            correction: None,
        }
    }
}

/// Partial update merged into an existing message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageUpdate {
    /// Replacement content.
    pub content: Option<String>,
    /// Correction to attach.
    pub correction: Option<String>,
}

impl MessageUpdate {
    /// Update that only sets the correction.
    #[must_use]
    pub fn correction(correction: impl Into<String>) -> Self {
        Self {
            content: None,
            correction: Some(correction.into()),
        }
    }

    pub(crate) fn apply(self, message: &mut ChatMessage) {
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(correction) = self.correction {
            message.correction = Some(correction);
        }
    }
}

/// A practice conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Role-play scenario, if one was selected.
    #[serde(default)]
    pub scenario: Option<Scenario>,
    /// Messages in arrival order.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(scenario: Option<Scenario>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            created_at,
            scenario,
            messages: Vec::new(),
        }
    }

    /// Whether a user message has already been recorded.
    #[must_use]
    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == MessageRole::User)
    }
}

/// Derive a conversation title from message text.
#[must_use]
pub fn derive_title(content: &str) -> String {
    let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

/// Learning status of a saved word.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyStatus {
    /// Not reviewed yet.
    #[default]
    New,
    /// Reviewed but not known.
    Learning,
    /// Known.
    Mastered,
}

impl VocabularyStatus {
    /// Stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Mastered => "mastered",
        }
    }
}

/// Error returned when parsing an unknown vocabulary status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vocabulary status: {0}")]
pub struct VocabularyStatusParseError(pub String);

impl FromStr for VocabularyStatus {
    type Err = VocabularyStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "learning" => Ok(Self::Learning),
            "mastered" => Ok(Self::Mastered),
            other => Err(VocabularyStatusParseError(other.to_string())),
        }
    }
}

/// A word saved from a dictionary lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyWord {
    /// The word as selected.
    pub word: String,
    /// Sentence the word appeared in.
    #[serde(default)]
    pub context: Option<String>,
    /// Definition in context.
    #[serde(default)]
    pub definition: Option<String>,
    /// Capture time.
    pub captured_at: DateTime<Utc>,
    /// Review status; absent means new.
    #[serde(default)]
    pub status: VocabularyStatus,
}

impl VocabularyWord {
    /// Case-insensitive match against another word.
    #[must_use]
    pub fn matches(&self, word: &str) -> bool {
        self.word.to_lowercase() == word.to_lowercase()
    }
}

/// Practice activity for one calendar day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeSession {
    /// UTC calendar day.
    pub date: NaiveDate,
    /// Turns completed that day.
    pub message_count: u32,
}

/// Statistics of one completed turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStats {
    /// Whether the model supplied a correction.
    pub has_correction: bool,
    /// Latency between the previous reply and this recording.
    pub response_time_ms: u64,
    /// Words in the transcript.
    pub word_count: u64,
    /// Words with more than six letters.
    pub complex_word_count: u64,
}

/// Running totals feeding the fluency score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregates {
    /// Completed turns.
    pub total_messages: u64,
    /// Turns that needed a correction.
    pub grammar_mistakes: u64,
    /// Words spoken.
    pub total_word_count: u64,
    /// Complex words spoken.
    pub total_complex_words: u64,
    /// Summed response latency.
    pub total_response_time_ms: u64,
}

impl Aggregates {
    /// Fold one turn into the totals.
    pub const fn record(&mut self, stats: &TurnStats) {
        self.total_messages += 1;
        if stats.has_correction {
            self.grammar_mistakes += 1;
        }
        self.total_word_count += stats.word_count;
        self.total_complex_words += stats.complex_word_count;
        self.total_response_time_ms += stats.response_time_ms;
    }
}
