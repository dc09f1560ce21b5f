//! The progress store: single owner of learner state.
//!
//! All mutations go through named operations on [`ProgressStore`]. Each one is
//! synchronous and total, keeps the derived fluency score current, and
//! enqueues mirror records when a [`SyncHandle`] is attached.

use chrono::{NaiveDate, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::progress::ids::{ConversationId, MessageId, UserId};
use crate::progress::scoring::fluency_score;
use crate::progress::types::{
    Aggregates, ChatMessage, Conversation, DEFAULT_CONVERSATION_TITLE, MessageRole, MessageUpdate,
    PracticeSession, TurnStats, VocabularyStatus, VocabularyWord, derive_title,
};
use crate::scenario::Scenario;
use crate::sync::queue::SyncHandle;
use crate::sync::record::{
    ConversationRow, MessageRow, ProfileRow, SessionRow, SyncRecord, VocabularyRow,
};

/// Maximum number of saved vocabulary words.
pub const MAX_VOCABULARY: usize = 100;

/// Maximum number of daily practice sessions kept.
pub const MAX_SESSIONS: usize = 90;

/// Serializable learner state. The fluency score is not part of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Owner of every mirrored record.
    pub owner: UserId,
    /// Running totals.
    #[serde(default)]
    pub aggregates: Aggregates,
    /// Saved words, most recent first.
    #[serde(default)]
    pub vocabulary: Vec<VocabularyWord>,
    /// Daily activity, oldest first.
    #[serde(default)]
    pub sessions: Vec<PracticeSession>,
    /// Conversations, most recent first.
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    /// Currently active conversation.
    #[serde(default)]
    pub active_conversation: Option<ConversationId>,
}

impl ProgressState {
    /// Empty state for an owner.
    #[must_use]
    pub const fn new(owner: UserId) -> Self {
        Self {
            owner,
            aggregates: Aggregates {
                total_messages: 0,
                grammar_mistakes: 0,
                total_word_count: 0,
                total_complex_words: 0,
                total_response_time_ms: 0,
            },
            vocabulary: Vec::new(),
            sessions: Vec::new(),
            conversations: Vec::new(),
            active_conversation: None,
        }
    }
}

/// Learner state plus its derived score.
#[derive(Debug)]
pub struct ProgressStore {
    state: ProgressState,
    fluency_score: u8,
    sync: Option<SyncHandle>,
}

impl ProgressStore {
    /// Fresh store for an owner.
    #[must_use]
    pub fn new(owner: UserId) -> Self {
        Self::from_state(ProgressState::new(owner))
    }

    /// Hydrate from a saved state.
    ///
    /// The score is recomputed and a dangling active pointer is cleared.
    #[must_use]
    pub fn from_state(mut state: ProgressState) -> Self {
        if let Some(active) = state.active_conversation {
            if !state.conversations.iter().any(|c| c.id == active) {
                debug!(%active, "Clearing dangling active conversation");
                state.active_conversation = None;
            }
        }
        let fluency_score = fluency_score(&state.aggregates);
        Self {
            state,
            fluency_score,
            sync: None,
        }
    }

    /// Attach a mirror queue.
    #[must_use]
    pub fn with_sync(mut self, sync: SyncHandle) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Owner id.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.state.owner
    }

    /// Current fluency score.
    #[must_use]
    pub const fn fluency_score(&self) -> u8 {
        self.fluency_score
    }

    /// Running totals.
    #[must_use]
    pub const fn stats(&self) -> &Aggregates {
        &self.state.aggregates
    }

    /// Daily activity, oldest first.
    #[must_use]
    pub fn sessions(&self) -> &[PracticeSession] {
        &self.state.sessions
    }

    /// Conversations, most recent first.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.state.conversations
    }

    /// Id of the active conversation.
    #[must_use]
    pub const fn active_conversation_id(&self) -> Option<ConversationId> {
        self.state.active_conversation
    }

    /// The active conversation.
    #[must_use]
    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.state.active_conversation?;
        self.conversation(id)
    }

    /// Look up a conversation by id.
    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.state.conversations.iter().find(|c| c.id == id)
    }

    /// Saved words, most recent first.
    #[must_use]
    pub fn vocabulary(&self) -> &[VocabularyWord] {
        &self.state.vocabulary
    }

    /// Saved words with the given status.
    #[must_use]
    pub fn vocabulary_filtered(&self, status: VocabularyStatus) -> Vec<&VocabularyWord> {
        self.state
            .vocabulary
            .iter()
            .filter(|w| w.status == status)
            .collect()
    }

    /// Up to `n` random words still being learned.
    ///
    /// Falls back to the whole list once every word is mastered.
    #[must_use]
    pub fn review_batch(&self, n: usize) -> Vec<VocabularyWord> {
        let pending: Vec<&VocabularyWord> = self
            .state
            .vocabulary
            .iter()
            .filter(|w| w.status != VocabularyStatus::Mastered)
            .collect();
        let pool: Vec<&VocabularyWord> = if pending.is_empty() {
            self.state.vocabulary.iter().collect()
        } else {
            pending
        };
        let mut rng = rand::thread_rng();
        pool.choose_multiple(&mut rng, n)
            .map(|&w| w.clone())
            .collect()
    }

    /// Copy of the persistable state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        self.state.clone()
    }

    /// Fold a completed turn into the totals, dated today (UTC).
    pub fn record_turn(&mut self, stats: TurnStats) -> u8 {
        self.record_turn_on(Utc::now().date_naive(), stats)
    }

    /// Fold a completed turn into the totals for the given day.
    ///
    /// Returns the recomputed fluency score.
    pub fn record_turn_on(&mut self, date: NaiveDate, stats: TurnStats) -> u8 {
        self.state.aggregates.record(&stats);

        let sessions = &mut self.state.sessions;
        let message_count = if let Some(session) = sessions.iter_mut().find(|s| s.date == date) {
            session.message_count += 1;
            session.message_count
        } else {
            sessions.push(PracticeSession {
                date,
                message_count: 1,
            });
            1
        };
        while sessions.len() > MAX_SESSIONS {
            sessions.remove(0);
        }

        self.fluency_score = fluency_score(&self.state.aggregates);
        debug!(score = self.fluency_score, "Turn recorded");

        let owner = self.state.owner;
        self.mirror(SyncRecord::Profile(ProfileRow::from_aggregates(
            owner,
            &self.state.aggregates,
            self.fluency_score,
        )));
        self.mirror(SyncRecord::Session(SessionRow {
            user_id: owner,
            date,
            message_count,
        }));

        self.fluency_score
    }

    /// Save a word unless it is already present (case-insensitive).
    ///
    /// Returns whether the word was added.
    pub fn add_vocabulary(
        &mut self,
        word: &str,
        context: Option<String>,
        definition: Option<String>,
    ) -> bool {
        let word = word.trim();
        if word.is_empty() || self.state.vocabulary.iter().any(|w| w.matches(word)) {
            return false;
        }

        let entry = VocabularyWord {
            word: word.to_string(),
            context,
            definition,
            captured_at: Utc::now(),
            status: VocabularyStatus::New,
        };
        let row = VocabularyRow {
            user_id: self.state.owner,
            word: entry.word.clone(),
            context: entry.context.clone(),
            definition: entry.definition.clone(),
            date: entry.captured_at,
        };

        self.state.vocabulary.insert(0, entry);
        self.state.vocabulary.truncate(MAX_VOCABULARY);
        self.mirror(SyncRecord::Vocabulary(row));
        true
    }

    /// Change the status of a saved word.
    pub fn update_vocabulary_status(&mut self, word: &str, status: VocabularyStatus) -> bool {
        match self.state.vocabulary.iter_mut().find(|w| w.matches(word)) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// Remove a saved word.
    pub fn delete_vocabulary(&mut self, word: &str) -> bool {
        let before = self.state.vocabulary.len();
        self.state.vocabulary.retain(|w| !w.matches(word));
        self.state.vocabulary.len() != before
    }

    /// Create a conversation and make it active.
    pub fn start_conversation(&mut self, scenario: Option<Scenario>) -> ConversationId {
        let conversation = Conversation::new(scenario, Utc::now());
        let id = conversation.id;
        self.mirror(SyncRecord::Conversation(ConversationRow {
            id,
            user_id: self.state.owner,
            title: conversation.title.clone(),
            scenario,
            date: conversation.created_at,
        }));
        self.state.conversations.insert(0, conversation);
        self.state.active_conversation = Some(id);
        debug!(%id, "Conversation started");
        id
    }

    /// Active conversation id, starting one with `scenario` if none is active.
    pub fn ensure_active(&mut self, scenario: Option<Scenario>) -> ConversationId {
        match self.state.active_conversation {
            Some(id) => id,
            None => self.start_conversation(scenario),
        }
    }

    /// Append a message to the active conversation.
    ///
    /// Starts a conversation when none is active. The first user message
    /// names the conversation.
    pub fn append_message(&mut self, message: ChatMessage) -> ConversationId {
        let id = self.ensure_active(None);
        self.append_message_to(id, message);
        id
    }

    /// Append a message to a specific conversation, active or not.
    ///
    /// Returns `false` if the conversation no longer exists.
    pub fn append_message_to(&mut self, id: ConversationId, message: ChatMessage) -> bool {
        let owner = self.state.owner;
        let Some(conversation) = self.state.conversations.iter_mut().find(|c| c.id == id) else {
            return false;
        };

        let mut renamed = None;
        if message.role == MessageRole::User
            && !conversation.has_user_message()
            && conversation.title == DEFAULT_CONVERSATION_TITLE
        {
            conversation.title = derive_title(&message.content);
            renamed = Some(conversation.title.clone());
        }

        let row = MessageRow {
            id: message.id,
            conversation_id: id,
            user_id: owner,
            role: message.role,
            content: message.content.clone(),
            correction: message.correction.clone(),
        };
        conversation.messages.push(message);

        self.mirror(SyncRecord::Message(row));
        if let Some(title) = renamed {
            self.mirror(SyncRecord::ConversationTitle { id, title });
        }
        true
    }

    /// Merge an update into a message of the active conversation.
    pub fn amend_message(&mut self, id: MessageId, update: MessageUpdate) -> bool {
        match self.state.active_conversation {
            Some(active) => self.amend_message_in(active, id, update),
            None => false,
        }
    }

    /// Merge an update into a message of a specific conversation.
    ///
    /// Returns `false` if the conversation or the message is gone.
    pub fn amend_message_in(
        &mut self,
        conversation_id: ConversationId,
        id: MessageId,
        update: MessageUpdate,
    ) -> bool {
        let owner = self.state.owner;
        let Some(message) = self
            .state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .and_then(|c| c.messages.iter_mut().find(|m| m.id == id))
        else {
            return false;
        };

        update.apply(message);
        let row = MessageRow {
            id: message.id,
            conversation_id,
            user_id: owner,
            role: message.role,
            content: message.content.clone(),
            correction: message.correction.clone(),
        };
        self.mirror(SyncRecord::Message(row));
        true
    }

    /// Delete a conversation; clears the active pointer if it was active.
    pub fn delete_conversation(&mut self, id: ConversationId) -> bool {
        let before = self.state.conversations.len();
        self.state.conversations.retain(|c| c.id != id);
        if self.state.active_conversation == Some(id) {
            self.state.active_conversation = None;
        }
        self.state.conversations.len() != before
    }

    /// Set or clear the active conversation. Unknown ids are rejected.
    pub fn set_active_conversation(&mut self, id: Option<ConversationId>) -> bool {
        match id {
            Some(id) if self.conversation(id).is_none() => false,
            _ => {
                self.state.active_conversation = id;
                true
            }
        }
    }

    fn mirror(&self, record: SyncRecord) {
        if let Some(sync) = &self.sync {
            sync.enqueue(record);
        }
    }
}
