//! HTTP route handlers for the tutor API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::inference::types::ChatTurn;
use crate::pipeline::dictionary::{SavedDefinition, define_and_save, lookup_definition};
use crate::pipeline::error::{MAX_AUDIO_BYTES, validate_audio};
use crate::pipeline::turn::{RecordingStarted, TurnInput, TurnOutcome, TurnState, tutor_reply};
use crate::progress::ids::ConversationId;
use crate::progress::types::{
    Aggregates, Conversation, PracticeSession, VocabularyStatus, VocabularyWord,
};
use crate::reply::{DefinitionReply, TutorReply};
use crate::scenario::Scenario;

use super::error::{ApiError, DICTIONARY_UNAVAILABLE, STT_UNAVAILABLE};
use super::state::AppState;

/// Request bodies may exceed the audio limit slightly so oversized clips get
/// a descriptive 413 instead of a bare rejection.
const BODY_LIMIT: usize = MAX_AUDIO_BYTES + 1024 * 1024;

/// MIME type assumed for audio uploads without one.
const DEFAULT_AUDIO_MIME: &str = "audio/webm";

/// Words per review batch when the client does not ask for a size.
const DEFAULT_REVIEW_BATCH: usize = 10;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);
    Router::new()
        .route("/health", get(health_check))
        .route("/api/stt", post(transcribe))
        .route("/api/chat", post(chat))
        .route("/api/dictionary", post(dictionary))
        .route("/api/recording/start", post(start_recording))
        .route("/api/recording/cancel", post(cancel_recording))
        .route("/api/turn", post(run_turn))
        .route("/api/playback-finished", post(playback_finished))
        .route("/api/progress", get(progress))
        .route(
            "/api/conversations",
            get(list_conversations).post(start_conversation),
        )
        .route("/api/conversations/active", put(set_active_conversation))
        .route("/api/conversations/{id}", delete(delete_conversation))
        .route("/api/vocabulary", get(list_vocabulary).post(save_word))
        .route("/api/vocabulary/review", get(review_batch))
        .route(
            "/api/vocabulary/{word}",
            patch(update_word_status).delete(delete_word),
        )
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "lingo-tutor",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn audio_mime(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_AUDIO_MIME)
        .to_string()
}

fn scenario_or_default(scenario: Option<&str>) -> Scenario {
    scenario.map(Scenario::from_key).unwrap_or_default()
}

/// Transcription response.
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    /// Recognised text.
    pub text: String,
}

/// Transcribe a raw audio body.
async fn transcribe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscriptResponse>, ApiError> {
    validate_audio(&body)?;
    let text = state
        .gateway
        .transcribe(body.to_vec(), &audio_mime(&headers))
        .await
        .map_err(|err| ApiError::from_turn(err.into(), STT_UNAVAILABLE))?;
    Ok(Json(TranscriptResponse { text }))
}

/// Stateless chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Client-held conversation.
    pub messages: Vec<ChatTurn>,
    /// Scenario key.
    #[serde(default)]
    pub scenario: Option<String>,
}

/// Reply to a client-held conversation.
async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<TutorReply>, ApiError> {
    let Json(request) = payload?;
    let scenario = scenario_or_default(request.scenario.as_deref());
    let reply = tutor_reply(state.gateway.as_ref(), scenario, request.messages).await?;
    Ok(Json(reply))
}

/// Word lookup request.
#[derive(Debug, Default, Deserialize)]
pub struct DefinitionRequest {
    /// Word or short phrase.
    #[serde(default)]
    pub word: String,
    /// Sentence the word appeared in.
    #[serde(default)]
    pub context: Option<String>,
}

/// Define a word without saving it.
async fn dictionary(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DefinitionRequest>, JsonRejection>,
) -> Result<Json<DefinitionReply>, ApiError> {
    let Json(request) = payload?;
    let reply = lookup_definition(
        state.gateway.as_ref(),
        &request.word,
        request.context.as_deref(),
    )
    .await
    .map_err(|err| ApiError::from_turn(err, DICTIONARY_UNAVAILABLE))?;
    Ok(Json(reply))
}

/// Scenario selection.
#[derive(Debug, Default, Deserialize)]
pub struct ScenarioRequest {
    /// Scenario key; unknown or absent means casual.
    #[serde(default)]
    pub scenario: Option<String>,
}

/// Open the microphone for a new turn.
async fn start_recording(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScenarioRequest>, JsonRejection>,
) -> Result<Json<RecordingStarted>, ApiError> {
    let Json(request) = payload?;
    let started = state
        .pipeline
        .start_recording(scenario_or_default(request.scenario.as_deref()))
        .await?;
    state.persist().await;
    Ok(Json(started))
}

/// Pipeline phase after a state change.
#[derive(Debug, Serialize)]
pub struct TurnStateResponse {
    /// Current phase.
    pub turn_state: TurnState,
}

/// Discard an open recording.
async fn cancel_recording(State(state): State<Arc<AppState>>) -> Json<TurnStateResponse> {
    Json(TurnStateResponse {
        turn_state: state.pipeline.cancel_recording(),
    })
}

/// Query parameters sent with turn audio.
#[derive(Debug, Default, Deserialize)]
pub struct TurnQuery {
    /// Value returned by the recording start call.
    #[serde(default)]
    pub recording_started_at: Option<DateTime<Utc>>,
    /// Scenario key.
    #[serde(default)]
    pub scenario: Option<String>,
}

/// Run a full turn from a raw audio body.
async fn run_turn(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TurnQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TurnOutcome>, ApiError> {
    let input = TurnInput {
        audio: body.to_vec(),
        mime_type: audio_mime(&headers),
        recording_started_at: query.recording_started_at.unwrap_or_else(Utc::now),
        scenario: scenario_or_default(query.scenario.as_deref()),
    };
    let result = state.pipeline.run_turn(input).await;
    // A failed completion still keeps the user message.
    state.persist().await;
    Ok(Json(result?))
}

/// Playback completion report.
#[derive(Debug, Default, Deserialize)]
pub struct PlaybackFinished {
    /// When playback ended; now if absent.
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Record the end of reply playback.
async fn playback_finished(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlaybackFinished>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(report) = payload?;
    state
        .pipeline
        .playback_finished(report.finished_at.unwrap_or_else(Utc::now))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Progress summary.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    /// Current fluency score.
    pub fluency_score: u8,
    /// Running totals.
    #[serde(flatten)]
    pub totals: Aggregates,
    /// Daily activity, oldest first.
    pub sessions: Vec<PracticeSession>,
    /// Pipeline phase.
    pub turn_state: TurnState,
}

/// Report totals, score and activity.
async fn progress(State(state): State<Arc<AppState>>) -> Json<ProgressResponse> {
    let store = state.store.read().await;
    Json(ProgressResponse {
        fluency_score: store.fluency_score(),
        totals: *store.stats(),
        sessions: store.sessions().to_vec(),
        turn_state: state.pipeline.state(),
    })
}

/// Conversation list.
#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    /// Conversations, most recent first.
    pub conversations: Vec<Conversation>,
    /// Active conversation.
    pub active_conversation_id: Option<ConversationId>,
}

async fn list_conversations(State(state): State<Arc<AppState>>) -> Json<ConversationsResponse> {
    let store = state.store.read().await;
    Json(ConversationsResponse {
        conversations: store.conversations().to_vec(),
        active_conversation_id: store.active_conversation_id(),
    })
}

/// New conversation id.
#[derive(Debug, Serialize)]
pub struct ConversationCreated {
    /// Id of the started conversation.
    pub id: ConversationId,
}

async fn start_conversation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScenarioRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConversationCreated>), ApiError> {
    let Json(request) = payload?;
    let scenario = request.scenario.as_deref().map(Scenario::from_key);
    let id = state.store.write().await.start_conversation(scenario);
    state.persist().await;
    Ok((StatusCode::CREATED, Json(ConversationCreated { id })))
}

/// Active conversation selection; `null` clears it.
#[derive(Debug, Deserialize)]
pub struct ActiveConversation {
    /// Conversation to activate.
    pub id: Option<ConversationId>,
}

async fn set_active_conversation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ActiveConversation>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    if !state.store.write().await.set_active_conversation(request.id) {
        return Err(ApiError::NotFound("conversation"));
    }
    state.persist().await;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> Result<StatusCode, ApiError> {
    if !state.store.write().await.delete_conversation(id) {
        return Err(ApiError::NotFound("conversation"));
    }
    state.persist().await;
    Ok(StatusCode::NO_CONTENT)
}

/// Vocabulary list filter.
#[derive(Debug, Default, Deserialize)]
pub struct VocabularyQuery {
    /// Only words with this status.
    #[serde(default)]
    pub status: Option<VocabularyStatus>,
}

async fn list_vocabulary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VocabularyQuery>,
) -> Json<Vec<VocabularyWord>> {
    let store = state.store.read().await;
    let words = match query.status {
        Some(status) => store
            .vocabulary_filtered(status)
            .into_iter()
            .cloned()
            .collect(),
        None => store.vocabulary().to_vec(),
    };
    Json(words)
}

/// Define a word and save it.
async fn save_word(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DefinitionRequest>, JsonRejection>,
) -> Result<Json<SavedDefinition>, ApiError> {
    let Json(request) = payload?;
    let saved = define_and_save(
        state.gateway.as_ref(),
        &state.store,
        &request.word,
        request.context.as_deref(),
    )
    .await
    .map_err(|err| ApiError::from_turn(err, DICTIONARY_UNAVAILABLE))?;
    if saved.added {
        state.persist().await;
    }
    Ok(Json(saved))
}

/// Review batch size.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    /// Maximum words to return.
    #[serde(default)]
    pub count: Option<usize>,
}

async fn review_batch(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReviewQuery>,
) -> Json<Vec<VocabularyWord>> {
    let count = query.count.unwrap_or(DEFAULT_REVIEW_BATCH);
    Json(state.store.read().await.review_batch(count))
}

/// Status change for a saved word.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// New status.
    pub status: VocabularyStatus,
}

async fn update_word_status(
    State(state): State<Arc<AppState>>,
    Path(word): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(update) = payload?;
    if !state
        .store
        .write()
        .await
        .update_vocabulary_status(&word, update.status)
    {
        return Err(ApiError::NotFound("word"));
    }
    state.persist().await;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_word(
    State(state): State<Arc<AppState>>,
    Path(word): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.store.write().await.delete_vocabulary(&word) {
        return Err(ApiError::NotFound("word"));
    }
    state.persist().await;
    Ok(StatusCode::NO_CONTENT)
}
