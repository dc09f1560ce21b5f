//! Request and response shapes for hosted inference.

use serde::{Deserialize, Serialize};

/// Role of a chat message sent to the model.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions.
    System,
    /// The learner.
    User,
    /// The tutor.
    #[serde(alias = "ai")]
    Assistant,
}

/// One message of a chat completion request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Author role.
    pub role: ChatRole,
    /// Text content.
    pub content: String,
}

impl ChatTurn {
    /// System message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters for a completion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl GenerationParams {
    /// Conversational tutor replies.
    pub const TUTOR: Self = Self {
        max_tokens: 500,
        temperature: 0.7,
    };

    /// Short, focused dictionary definitions.
    pub const DICTIONARY: Self = Self {
        max_tokens: 150,
        temperature: 0.3,
    };
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatTurn],
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct TranscriptionResponse {
    #[serde(default)]
    pub text: Option<String>,
}
