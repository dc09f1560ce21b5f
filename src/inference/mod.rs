//! Hosted speech-to-text and chat completion.

/// Gateway trait and Hugging Face client.
pub mod client;
/// Error types.
pub mod error;
/// Request and response shapes.
pub mod types;

pub use client::{HfInferenceClient, InferenceGateway};
pub use error::ServiceError;
pub use types::{ChatRole, ChatTurn, GenerationParams};
