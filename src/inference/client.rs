//! Hosted inference gateway.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use tracing::debug;

use crate::config::InferenceConfig;
use crate::inference::error::ServiceError;
use crate::inference::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatTurn, GenerationParams,
    TranscriptionResponse,
};

/// Speech-to-text and chat completion.
///
/// Calls are single-shot: no retries and no caching.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Transcribe an audio clip.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status, or an
    /// empty or malformed response.
    async fn transcribe(&self, audio: Vec<u8>, mime_type: &str) -> Result<String, ServiceError>;

    /// Complete a chat and return the raw model text.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status, or a
    /// response without choices.
    async fn complete(
        &self,
        messages: &[ChatTurn],
        params: GenerationParams,
    ) -> Result<String, ServiceError>;
}

/// Hugging Face inference client.
pub struct HfInferenceClient {
    client: Client,
    config: InferenceConfig,
}

impl HfInferenceClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: InferenceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn stt_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.stt_base_url.trim_end_matches('/'),
            self.config.stt_model
        )
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.chat_base_url.trim_end_matches('/')
        )
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::from_status(status.as_u16(), &body))
}

#[async_trait]
impl InferenceGateway for HfInferenceClient {
    async fn transcribe(&self, audio: Vec<u8>, mime_type: &str) -> Result<String, ServiceError> {
        debug!(
            bytes = audio.len(),
            mime_type,
            model = %self.config.stt_model,
            "Sending audio for transcription"
        );

        let request = self
            .client
            .post(self.stt_url())
            .header(header::CONTENT_TYPE, mime_type)
            .body(audio);
        let response = check_status(self.authorized(request).send().await?).await?;
        let bytes = response.bytes().await?;
        let parsed: TranscriptionResponse = serde_json::from_slice(&bytes)?;

        let text = parsed.text.unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::EmptyTranscript);
        }
        debug!(chars = text.chars().count(), "Transcription complete");
        Ok(text.to_string())
    }

    async fn complete(
        &self,
        messages: &[ChatTurn],
        params: GenerationParams,
    ) -> Result<String, ServiceError> {
        let body = ChatCompletionRequest {
            model: &self.config.chat_model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };
        debug!(
            messages = messages.len(),
            max_tokens = params.max_tokens,
            model = %self.config.chat_model,
            "Requesting chat completion"
        );

        let request = self.client.post(self.chat_url()).json(&body);
        let response = check_status(self.authorized(request).send().await?).await?;
        let bytes = response.bytes().await?;
        let parsed: ChatCompletionResponse = serde_json::from_slice(&bytes)?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ServiceError::NoChoices)?;
        Ok(choice.message.content.unwrap_or_default())
    }
}
