//! Mapping of domain errors to HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::pipeline::error::{InputError, TurnError};

/// Message shown when the tutor model fails.
pub const TUTOR_UNAVAILABLE: &str =
    "The AI Tutor is currently overloaded. Please try again in a few moments.";
/// Message shown when transcription fails.
pub const STT_UNAVAILABLE: &str =
    "Audio processing failed. The AI service may be temporarily overloaded.";
/// Message shown when the dictionary fails.
pub const DICTIONARY_UNAVAILABLE: &str = "Dictionary service is currently unavailable.";

/// Error returned by route handlers as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request content.
    Input(InputError),
    /// Malformed request body.
    BadRequest(String),
    /// Unknown resource.
    NotFound(&'static str),
    /// A turn is already in flight.
    Busy,
    /// Upstream failure; the diagnostic has been logged.
    Service(&'static str),
}

impl ApiError {
    /// Convert a pipeline error, using `unavailable` as the user message for
    /// upstream failures.
    #[must_use]
    pub fn from_turn(err: TurnError, unavailable: &'static str) -> Self {
        match err {
            TurnError::Input(input) => Self::Input(input),
            TurnError::Busy => Self::Busy,
            TurnError::Service(service) => {
                error!(diagnostic = %service, "Inference request failed");
                Self::Service(unavailable)
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Input(InputError::AudioTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Input(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Busy => StatusCode::CONFLICT,
            Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Input(input) => input.to_string(),
            Self::BadRequest(message) => message.clone(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Busy => "A turn is already in progress.".to_string(),
            Self::Service(message) => (*message).to_string(),
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        Self::from_turn(err, TUTOR_UNAVAILABLE)
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        Self::Input(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::error::ServiceError;

    #[test]
    fn test_status_mapping() {
        let too_large = ApiError::from(InputError::AudioTooLarge { size: 10, limit: 5 });
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            ApiError::from(InputError::EmptyAudio).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::from(TurnError::Busy).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_service_error_hides_diagnostic() {
        let err = ApiError::from(TurnError::Service(ServiceError::from_status(
            503,
            "secret upstream detail",
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), TUTOR_UNAVAILABLE);
    }
}
