//! Error types for the inference gateway.

use thiserror::Error;

/// Failure of a hosted inference call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport failure or timeout.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// JSON error body: the upstream one when structured, else a wrapped copy.
        message: String,
    },
    /// Transcription came back without text.
    #[error("transcription response contained no text")]
    EmptyTranscript,
    /// Completion came back without choices.
    #[error("completion response contained no choices")]
    NoChoices,
    /// Response body could not be decoded.
    #[error("malformed upstream response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ServiceError {
    /// Build a status error from a response body.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            message: error_body(body),
        }
    }
}

/// Keep a structured upstream error body, wrap anything else.
///
/// Structured means a JSON object with either a string `error` or an `error`
/// object carrying a string `message`.
#[must_use]
pub fn error_body(body: &str) -> String {
    let body = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let structured = match value.get("error") {
            Some(serde_json::Value::String(_)) => true,
            Some(serde_json::Value::Object(inner)) => {
                inner.get("message").is_some_and(serde_json::Value::is_string)
            }
            _ => false,
        };
        if structured {
            return body.to_string();
        }
    }
    serde_json::json!({ "error": body }).to_string()
}
