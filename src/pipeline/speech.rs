//! Speech output for tutor replies.

use async_trait::async_trait;
use thiserror::Error;

/// Language tag used for all spoken replies.
pub const SPEECH_LANGUAGE: &str = "en-US";

/// Speech synthesis failure. Never fails a turn.
#[derive(Debug, Error)]
#[error("speech synthesis failed: {0}")]
pub struct SpeechError(pub String);

/// Text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text`, resolving once playback has finished.
    ///
    /// # Errors
    /// Returns an error if synthesis or playback fails.
    async fn speak(&self, text: &str, language: &str) -> Result<(), SpeechError>;
}

/// Playback happens in the browser.
///
/// Resolves immediately; the client reports the real completion instant
/// through the pipeline's playback report.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientPlayback;

#[async_trait]
impl SpeechSynthesizer for ClientPlayback {
    async fn speak(&self, _text: &str, _language: &str) -> Result<(), SpeechError> {
        Ok(())
    }
}
