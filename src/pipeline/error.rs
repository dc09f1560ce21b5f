//! Error types for turn processing.

use thiserror::Error;

use crate::inference::error::ServiceError;

/// Largest accepted audio clip, in bytes.
pub const MAX_AUDIO_BYTES: usize = 5 * 1024 * 1024;

/// Request rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The recording produced no audio.
    #[error("No audio provided")]
    EmptyAudio,
    /// The recording exceeds the upload limit.
    #[error("Audio file too large. Please keep recordings under 1 minute.")]
    AudioTooLarge {
        /// Clip size in bytes.
        size: usize,
        /// Limit in bytes.
        limit: usize,
    },
    /// A required field is missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// A field exceeds its length limit.
    #[error("{field} is too long (max {max} characters)")]
    FieldTooLong {
        /// Field name.
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },
}

/// Failure of a turn or lookup.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Invalid input; nothing was sent upstream.
    #[error(transparent)]
    Input(#[from] InputError),
    /// Upstream inference failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// Another turn is in flight.
    #[error("a turn is already in progress")]
    Busy,
}

/// Reject empty or oversized clips.
///
/// # Errors
/// Returns an [`InputError`] describing the problem.
pub const fn validate_audio(audio: &[u8]) -> Result<(), InputError> {
    if audio.is_empty() {
        return Err(InputError::EmptyAudio);
    }
    if audio.len() > MAX_AUDIO_BYTES {
        return Err(InputError::AudioTooLarge {
            size: audio.len(),
            limit: MAX_AUDIO_BYTES,
        });
    }
    Ok(())
}
