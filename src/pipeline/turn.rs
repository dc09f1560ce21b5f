//! One spoken exchange: audio in, corrected transcript and tutor reply out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, warn};

use crate::inference::client::InferenceGateway;
use crate::inference::types::{ChatTurn, GenerationParams};
use crate::pipeline::context::{compose, history_turns};
use crate::pipeline::error::{TurnError, validate_audio};
use crate::pipeline::speech::{SPEECH_LANGUAGE, SpeechSynthesizer};
use crate::pipeline::stats::{response_latency_ms, turn_stats};
use crate::progress::ids::{ConversationId, MessageId};
use crate::progress::store::ProgressStore;
use crate::progress::types::{ChatMessage, MessageUpdate};
use crate::reply::{TutorReply, parse_tutor_reply};
use crate::scenario::Scenario;

/// Observable phase of the pipeline.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Waiting for the learner.
    #[default]
    Idle,
    /// Microphone open.
    Recording,
    /// Audio sent for transcription.
    Transcribing,
    /// Building the model context.
    Composing,
    /// Waiting for the model.
    AwaitingReply,
    /// Reply being spoken.
    Speaking,
    /// Last turn failed.
    ///
    /// Held after the error is returned so pollers can observe it; the next
    /// `start_recording`, `cancel_recording` or `run_turn` moves on from it.
    Error,
}

/// Audio and metadata for one turn.
#[derive(Clone, Debug)]
pub struct TurnInput {
    /// Recorded clip.
    pub audio: Vec<u8>,
    /// Clip MIME type.
    pub mime_type: String,
    /// When the microphone opened.
    pub recording_started_at: DateTime<Utc>,
    /// Scenario selected in the client.
    pub scenario: Scenario,
}

/// Result of a completed turn.
#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    /// Conversation the turn landed in.
    pub conversation_id: ConversationId,
    /// Stored learner message.
    pub user_message_id: MessageId,
    /// Stored tutor message.
    pub ai_message_id: MessageId,
    /// What the learner said.
    pub transcript: String,
    /// Tutor reply.
    pub response: String,
    /// Ghost correction, if one was needed.
    pub correction: Option<String>,
    /// Score after the turn.
    pub fluency_score: u8,
    /// Milliseconds between the previous reply and this recording.
    pub response_time_ms: u64,
}

/// Recording start acknowledgement.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RecordingStarted {
    /// Start instant to send back with the audio.
    pub recording_started_at: DateTime<Utc>,
    /// Active conversation.
    pub conversation_id: ConversationId,
}

/// Drives turns against the gateway and the progress store.
///
/// At most one turn runs at a time; a second caller gets [`TurnError::Busy`].
pub struct TurnPipeline {
    gateway: Arc<dyn InferenceGateway>,
    store: Arc<RwLock<ProgressStore>>,
    speech: Arc<dyn SpeechSynthesizer>,
    in_flight: Mutex<()>,
    last_playback_finished: Mutex<Option<DateTime<Utc>>>,
    state: watch::Sender<TurnState>,
}

impl TurnPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn InferenceGateway>,
        store: Arc<RwLock<ProgressStore>>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let (state, _) = watch::channel(TurnState::Idle);
        Self {
            gateway,
            store,
            speech,
            in_flight: Mutex::new(()),
            last_playback_finished: Mutex::new(None),
            state,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    /// Watch phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TurnState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: TurnState) {
        self.state.send_replace(state);
    }

    /// Open the microphone.
    ///
    /// Starts a conversation with `scenario` if none is active.
    ///
    /// # Errors
    /// Returns [`TurnError::Busy`] while a turn is in flight.
    pub async fn start_recording(&self, scenario: Scenario) -> Result<RecordingStarted, TurnError> {
        let _guard = self.in_flight.try_lock().map_err(|_| TurnError::Busy)?;
        let conversation_id = self.store.write().await.ensure_active(Some(scenario));
        self.set_state(TurnState::Recording);
        Ok(RecordingStarted {
            recording_started_at: Utc::now(),
            conversation_id,
        })
    }

    /// Discard an open recording without running a turn.
    ///
    /// Returns to `idle` from `recording` or `error`; other phases belong to
    /// a running turn and are left alone. Returns the phase after the call.
    pub fn cancel_recording(&self) -> TurnState {
        self.state.send_if_modified(|state| {
            if matches!(state, TurnState::Recording | TurnState::Error) {
                *state = TurnState::Idle;
                true
            } else {
                false
            }
        });
        self.state()
    }

    /// Record when the client finished playing the last reply.
    pub async fn playback_finished(&self, at: DateTime<Utc>) {
        *self.last_playback_finished.lock().await = Some(at);
        if self.state() == TurnState::Speaking {
            self.set_state(TurnState::Idle);
        }
    }

    /// Run a full turn.
    ///
    /// # Errors
    /// Returns [`TurnError::Busy`] if a turn is in flight, an input error for
    /// empty or oversized audio, or a service error if transcription or
    /// completion fails. Failed turns leave the totals untouched.
    pub async fn run_turn(&self, input: TurnInput) -> Result<TurnOutcome, TurnError> {
        let _guard = self.in_flight.try_lock().map_err(|_| TurnError::Busy)?;

        if let Err(err) = validate_audio(&input.audio) {
            self.set_state(TurnState::Idle);
            return Err(err.into());
        }

        self.set_state(TurnState::Transcribing);
        let transcript = match self.gateway.transcribe(input.audio, &input.mime_type).await {
            Ok(text) => text,
            Err(err) => return Err(self.fail("transcription", err.into())),
        };

        self.set_state(TurnState::Composing);
        let response_time_ms = response_latency_ms(
            *self.last_playback_finished.lock().await,
            input.recording_started_at,
        );

        let user_message = ChatMessage::user(transcript.clone());
        let user_message_id = user_message.id;
        let (conversation_id, context) = {
            let mut store = self.store.write().await;
            let scenario = store
                .active_conversation()
                .and_then(|c| c.scenario)
                .unwrap_or(input.scenario);
            let conversation_id = store.ensure_active(Some(scenario));
            store.append_message_to(conversation_id, user_message);
            let history = store
                .conversation(conversation_id)
                .map(|c| history_turns(&c.messages))
                .unwrap_or_default();
            (conversation_id, compose(scenario, history))
        };
        debug!(%conversation_id, turns = context.len(), "Context composed");

        self.set_state(TurnState::AwaitingReply);
        let raw = match self.gateway.complete(&context, GenerationParams::TUTOR).await {
            Ok(raw) => raw,
            Err(err) => return Err(self.fail("completion", err.into())),
        };
        let reply = parse_tutor_reply(&raw);
        let correction = reply.correction().map(str::to_string);

        let ai_message = ChatMessage::ai(reply.response.clone());
        let ai_message_id = ai_message.id;
        let fluency_score = {
            let mut store = self.store.write().await;
            if let Some(correction) = &correction {
                let update = MessageUpdate::correction(correction.clone());
                if !store.amend_message_in(conversation_id, user_message_id, update) {
                    warn!(%conversation_id, "Conversation removed mid-turn; correction not stored");
                }
            }
            let stats = turn_stats(&transcript, correction.is_some(), response_time_ms);
            let score = store.record_turn(stats);
            if !store.append_message_to(conversation_id, ai_message) {
                warn!(%conversation_id, "Conversation removed mid-turn; reply not stored");
            }
            score
        };
        info!(
            %conversation_id,
            corrected = correction.is_some(),
            fluency_score,
            "Turn complete"
        );

        self.set_state(TurnState::Speaking);
        match self.speech.speak(&reply.response, SPEECH_LANGUAGE).await {
            Ok(()) => {
                *self.last_playback_finished.lock().await = Some(Utc::now());
            }
            Err(err) => warn!(%err, "Speech playback failed"),
        }
        self.set_state(TurnState::Idle);

        Ok(TurnOutcome {
            conversation_id,
            user_message_id,
            ai_message_id,
            transcript,
            response: reply.response,
            correction,
            fluency_score,
            response_time_ms,
        })
    }

    fn fail(&self, stage: &str, err: TurnError) -> TurnError {
        warn!(stage, %err, "Turn failed");
        self.set_state(TurnState::Error);
        err
    }
}

/// Stateless tutor reply for a client-held conversation.
///
/// # Errors
/// Returns an error if the completion fails.
pub async fn tutor_reply(
    gateway: &dyn InferenceGateway,
    scenario: Scenario,
    history: Vec<ChatTurn>,
) -> Result<TutorReply, TurnError> {
    let context = compose(scenario, history);
    let raw = gateway.complete(&context, GenerationParams::TUTOR).await?;
    Ok(parse_tutor_reply(&raw))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inference::error::ServiceError;
    use crate::inference::types::ChatRole;
    use crate::pipeline::error::{InputError, MAX_AUDIO_BYTES};
    use crate::pipeline::speech::{ClientPlayback, SpeechError};
    use crate::progress::ids::UserId;
    use crate::progress::types::MessageRole;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Gateway returning scripted results and recording requests.
    #[derive(Default)]
    pub(crate) struct FakeGateway {
        pub transcripts: std::sync::Mutex<VecDeque<Result<String, ServiceError>>>,
        pub completions: std::sync::Mutex<VecDeque<Result<String, ServiceError>>>,
        pub requests: std::sync::Mutex<Vec<Vec<ChatTurn>>>,
        pub hold: Option<Arc<Notify>>,
        pub hold_completion: Option<Arc<Notify>>,
    }

    impl FakeGateway {
        pub fn scripted(transcript: &str, completion: &str) -> Self {
            let gateway = Self::default();
            gateway.push_transcript(Ok(transcript.to_string()));
            gateway.push_completion(Ok(completion.to_string()));
            gateway
        }

        pub fn push_transcript(&self, result: Result<String, ServiceError>) {
            self.transcripts.lock().unwrap().push_back(result);
        }

        pub fn push_completion(&self, result: Result<String, ServiceError>) {
            self.completions.lock().unwrap().push_back(result);
        }

        pub fn last_request(&self) -> Vec<ChatTurn> {
            self.requests.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl InferenceGateway for FakeGateway {
        async fn transcribe(&self, _audio: Vec<u8>, _mime: &str) -> Result<String, ServiceError> {
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            self.transcripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ServiceError::EmptyTranscript))
        }

        async fn complete(
            &self,
            messages: &[ChatTurn],
            _params: GenerationParams,
        ) -> Result<String, ServiceError> {
            self.requests.lock().unwrap().push(messages.to_vec());
            if let Some(hold) = &self.hold_completion {
                hold.notified().await;
            }
            self.completions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ServiceError::NoChoices))
        }
    }

    #[derive(Default)]
    struct CountingSpeech {
        spoken: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSpeech {
        async fn speak(&self, _text: &str, language: &str) -> Result<(), SpeechError> {
            assert_eq!(language, "en-US");
            self.spoken.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pipeline(gateway: FakeGateway) -> (TurnPipeline, Arc<FakeGateway>, Arc<RwLock<ProgressStore>>) {
        let gateway = Arc::new(gateway);
        let store = Arc::new(RwLock::new(ProgressStore::new(UserId::new())));
        let pipeline = TurnPipeline::new(
            gateway.clone(),
            store.clone(),
            Arc::new(ClientPlayback),
        );
        (pipeline, gateway, store)
    }

    fn input(scenario: Scenario) -> TurnInput {
        TurnInput {
            audio: vec![1, 2, 3],
            mime_type: "audio/webm".to_string(),
            recording_started_at: Utc::now(),
            scenario,
        }
    }

    #[tokio::test]
    async fn test_successful_turn_records_everything() {
        let (pipeline, _gateway, store) = pipeline(FakeGateway::scripted(
            "I goes to the market yesterday",
            r#"{"response":"What did you buy?","correction":"I went to the market yesterday"}"#,
        ));

        let outcome = pipeline.run_turn(input(Scenario::Casual)).await.unwrap();
        assert_eq!(outcome.response, "What did you buy?");
        assert_eq!(outcome.correction.as_deref(), Some("I went to the market yesterday"));
        assert_eq!(outcome.fluency_score, 60);
        assert_eq!(pipeline.state(), TurnState::Idle);

        let store = store.read().await;
        assert_eq!(store.stats().total_messages, 1);
        assert_eq!(store.stats().grammar_mistakes, 1);
        assert_eq!(store.stats().total_word_count, 6);
        assert_eq!(store.stats().total_complex_words, 1);

        let conversation = store.active_conversation().unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, MessageRole::User);
        assert_eq!(
            conversation.messages[0].correction.as_deref(),
            Some("I went to the market yesterday")
        );
        assert_eq!(conversation.messages[1].role, MessageRole::Ai);
        assert_eq!(conversation.title, "I goes to the market yesterday");
        assert_eq!(conversation.scenario, Some(Scenario::Casual));
    }

    #[tokio::test]
    async fn test_clean_turn_has_no_correction() {
        let (pipeline, _gateway, store) = pipeline(FakeGateway::scripted(
            "Hello there",
            "Nice to meet you!",
        ));

        let outcome = pipeline.run_turn(input(Scenario::Casual)).await.unwrap();
        assert_eq!(outcome.response, "Nice to meet you!");
        assert!(outcome.correction.is_none());
        assert_eq!(outcome.fluency_score, 100);
        assert!(store.read().await.active_conversation().unwrap().messages[0]
            .correction
            .is_none());
    }

    #[tokio::test]
    async fn test_context_uses_persona_and_history() {
        let (pipeline, gateway, _store) = pipeline(FakeGateway::scripted(
            "A table for two please",
            r#"{"response":"Right this way.","correction":""}"#,
        ));

        pipeline.run_turn(input(Scenario::Restaurant)).await.unwrap();
        let request = gateway.last_request();
        assert_eq!(request.len(), 2);
        assert_eq!(request[0].role, ChatRole::System);
        assert!(request[0].content.contains("waiter"));
        assert_eq!(request[1], ChatTurn::user("A table for two please"));
    }

    #[tokio::test]
    async fn test_active_conversation_scenario_wins() {
        let (pipeline, gateway, store) = pipeline(FakeGateway::scripted("Hi", "Hello"));
        store.write().await.start_conversation(Some(Scenario::Interview));

        pipeline.run_turn(input(Scenario::Travel)).await.unwrap();
        assert!(gateway.last_request()[0].content.contains("HR manager"));
    }

    #[tokio::test]
    async fn test_failed_completion_keeps_user_message_only() {
        let gateway = FakeGateway::default();
        gateway.push_transcript(Ok("Hello".to_string()));
        gateway.push_completion(Err(ServiceError::from_status(503, "overloaded")));
        let (pipeline, _gateway, store) = pipeline(gateway);

        let err = pipeline.run_turn(input(Scenario::Casual)).await.unwrap_err();
        assert!(matches!(err, TurnError::Service(ServiceError::Status { status: 503, .. })));
        assert_eq!(pipeline.state(), TurnState::Error);

        let store = store.read().await;
        assert_eq!(store.stats().total_messages, 0);
        assert!(store.sessions().is_empty());
        let messages = &store.active_conversation().unwrap().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_failed_transcription_changes_nothing() {
        let gateway = FakeGateway::default();
        gateway.push_transcript(Err(ServiceError::EmptyTranscript));
        let (pipeline, _gateway, store) = pipeline(gateway);

        let err = pipeline.run_turn(input(Scenario::Casual)).await.unwrap_err();
        assert!(matches!(err, TurnError::Service(ServiceError::EmptyTranscript)));
        assert!(store.read().await.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_empty_and_oversized_audio_rejected() {
        let (pipeline, gateway, _store) = pipeline(FakeGateway::default());

        let mut empty = input(Scenario::Casual);
        empty.audio.clear();
        assert!(matches!(
            pipeline.run_turn(empty).await,
            Err(TurnError::Input(InputError::EmptyAudio))
        ));

        let mut large = input(Scenario::Casual);
        large.audio = vec![0; MAX_AUDIO_BYTES + 1];
        assert!(matches!(
            pipeline.run_turn(large).await,
            Err(TurnError::Input(InputError::AudioTooLarge { .. }))
        ));
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_turn_is_busy() {
        let hold = Arc::new(Notify::new());
        let gateway = FakeGateway {
            hold: Some(hold.clone()),
            ..FakeGateway::default()
        };
        gateway.push_transcript(Ok("Hi".to_string()));
        gateway.push_completion(Ok("Hello".to_string()));
        let (pipeline, _gateway, _store) = pipeline(gateway);
        let pipeline = Arc::new(pipeline);

        let first = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run_turn(input(Scenario::Casual)).await })
        };
        let mut states = pipeline.subscribe();
        while *states.borrow_and_update() != TurnState::Transcribing {
            states.changed().await.unwrap();
        }

        assert!(matches!(
            pipeline.run_turn(input(Scenario::Casual)).await,
            Err(TurnError::Busy)
        ));
        assert!(matches!(
            pipeline.start_recording(Scenario::Casual).await,
            Err(TurnError::Busy)
        ));

        hold.notify_one();
        assert!(first.await.unwrap().is_ok());
    }

    async fn run_until_awaiting_reply(
        pipeline: &Arc<TurnPipeline>,
    ) -> tokio::task::JoinHandle<Result<TurnOutcome, TurnError>> {
        let task = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run_turn(input(Scenario::Casual)).await })
        };
        let mut states = pipeline.subscribe();
        while *states.borrow_and_update() != TurnState::AwaitingReply {
            states.changed().await.unwrap();
        }
        task
    }

    fn held_at_completion(completion: &str) -> (FakeGateway, Arc<Notify>) {
        let hold = Arc::new(Notify::new());
        let gateway = FakeGateway {
            hold_completion: Some(hold.clone()),
            ..FakeGateway::default()
        };
        gateway.push_transcript(Ok("I goes home".to_string()));
        gateway.push_completion(Ok(completion.to_string()));
        (gateway, hold)
    }

    #[tokio::test]
    async fn test_reply_lands_in_turn_conversation_after_switch() {
        let (gateway, hold) = held_at_completion(
            r#"{"response":"Welcome home","correction":"I go home"}"#,
        );
        let (pipeline, _gateway, store) = pipeline(gateway);
        let pipeline = Arc::new(pipeline);

        let task = run_until_awaiting_reply(&pipeline).await;
        let turn_conversation = store.read().await.active_conversation_id().unwrap();
        let other = store.write().await.start_conversation(None);
        hold.notify_one();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.conversation_id, turn_conversation);

        let store = store.read().await;
        let messages = &store.conversation(turn_conversation).unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].correction.as_deref(), Some("I go home"));
        assert_eq!(messages[1].content, "Welcome home");
        assert!(store.conversation(other).unwrap().messages.is_empty());
        assert_eq!(store.active_conversation_id(), Some(other));
    }

    #[tokio::test]
    async fn test_deleted_turn_conversation_is_not_recreated() {
        let (gateway, hold) = held_at_completion(
            r#"{"response":"Welcome home","correction":"I go home"}"#,
        );
        let (pipeline, _gateway, store) = pipeline(gateway);
        let pipeline = Arc::new(pipeline);

        let task = run_until_awaiting_reply(&pipeline).await;
        let turn_conversation = store.read().await.active_conversation_id().unwrap();
        assert!(store.write().await.delete_conversation(turn_conversation));
        hold.notify_one();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.response, "Welcome home");
        let store = store.read().await;
        assert!(store.conversations().is_empty());
        assert!(store.active_conversation_id().is_none());
        assert_eq!(store.stats().total_messages, 1);
    }

    #[tokio::test]
    async fn test_error_state_held_until_next_action() {
        let gateway = FakeGateway::default();
        gateway.push_transcript(Err(ServiceError::EmptyTranscript));
        let (pipeline, _gateway, _store) = pipeline(gateway);

        assert!(pipeline.run_turn(input(Scenario::Casual)).await.is_err());
        assert_eq!(pipeline.state(), TurnState::Error);
        assert_eq!(pipeline.cancel_recording(), TurnState::Idle);

        pipeline.start_recording(Scenario::Casual).await.unwrap();
        assert_eq!(pipeline.state(), TurnState::Recording);
    }

    #[tokio::test]
    async fn test_cancel_recording_returns_to_idle() {
        let (pipeline, _gateway, _store) = pipeline(FakeGateway::default());
        pipeline.start_recording(Scenario::Casual).await.unwrap();
        assert_eq!(pipeline.cancel_recording(), TurnState::Idle);
        assert_eq!(pipeline.cancel_recording(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_recording_leaves_running_turn_alone() {
        let (gateway, hold) = held_at_completion("Hello");
        let (pipeline, _gateway, _store) = pipeline(gateway);
        let pipeline = Arc::new(pipeline);

        let task = run_until_awaiting_reply(&pipeline).await;
        assert_eq!(pipeline.cancel_recording(), TurnState::AwaitingReply);
        hold.notify_one();
        assert!(task.await.unwrap().is_ok());
        assert_eq!(pipeline.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_latency_measured_from_playback_report() {
        let gateway = FakeGateway::default();
        for _ in 0..2 {
            gateway.push_transcript(Ok("Hello".to_string()));
            gateway.push_completion(Ok("Hi".to_string()));
        }
        let (pipeline, _gateway, store) = pipeline(gateway);

        let first = pipeline.run_turn(input(Scenario::Casual)).await.unwrap();
        assert_eq!(first.response_time_ms, 0);

        let finished = Utc::now();
        pipeline.playback_finished(finished).await;
        let mut next = input(Scenario::Casual);
        next.recording_started_at = finished + chrono::Duration::milliseconds(2500);
        let second = pipeline.run_turn(next).await.unwrap();
        assert_eq!(second.response_time_ms, 2500);
        assert_eq!(store.read().await.stats().total_response_time_ms, 2500);
    }

    #[tokio::test]
    async fn test_start_recording_opens_conversation() {
        let (pipeline, _gateway, store) = pipeline(FakeGateway::default());
        let started = pipeline.start_recording(Scenario::Travel).await.unwrap();
        assert_eq!(pipeline.state(), TurnState::Recording);

        let store = store.read().await;
        let active = store.active_conversation().unwrap();
        assert_eq!(active.id, started.conversation_id);
        assert_eq!(active.scenario, Some(Scenario::Travel));
    }

    #[tokio::test]
    async fn test_speech_is_invoked() {
        let gateway = Arc::new(FakeGateway::scripted("Hi", "Hello"));
        let store = Arc::new(RwLock::new(ProgressStore::new(UserId::new())));
        let speech = Arc::new(CountingSpeech::default());
        let pipeline = TurnPipeline::new(gateway, store, speech.clone());

        pipeline.run_turn(input(Scenario::Casual)).await.unwrap();
        assert_eq!(speech.spoken.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stateless_tutor_reply() {
        let gateway = FakeGateway::default();
        gateway.push_completion(Ok(r#"{"response":"Sure","correction":"I want"}"#.to_string()));
        let reply = tutor_reply(&gateway, Scenario::Casual, vec![ChatTurn::user("I wants")])
            .await
            .unwrap();
        assert_eq!(reply.response, "Sure");
        assert_eq!(reply.correction, "I want");
    }
}
