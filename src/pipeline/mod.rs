//! Speaking turns and dictionary lookups.
//!
//! A turn moves through `idle -> recording -> transcribing -> composing ->
//! awaiting_reply -> speaking -> idle`. Transcription or completion failures
//! land in `error` and leave the totals untouched.

/// Prompt assembly.
pub mod context;
/// Word definitions.
pub mod dictionary;
/// Error types and input limits.
pub mod error;
/// Speech output.
pub mod speech;
/// Turn statistics.
pub mod stats;
/// The turn pipeline.
pub mod turn;

pub use dictionary::{SavedDefinition, define_and_save, lookup_definition};
pub use error::{InputError, MAX_AUDIO_BYTES, TurnError, validate_audio};
pub use speech::{ClientPlayback, SpeechSynthesizer};
pub use turn::{RecordingStarted, TurnInput, TurnOutcome, TurnPipeline, TurnState, tutor_reply};
