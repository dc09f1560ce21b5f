//! Prompt assembly for tutor completions.

use crate::inference::types::ChatTurn;
use crate::progress::types::{ChatMessage, MessageRole};
use crate::scenario::Scenario;

/// Number of conversation messages sent with each completion.
pub const CONTEXT_WINDOW: usize = 10;

/// Reply-format instructions appended to every persona.
pub const TUTOR_INSTRUCTIONS: &str = r#"Keep your responses natural, conversational, and fairly brief (1-3 sentences) to encourage back-and-forth dialogue.
If the user makes a significant grammatical error or unnatural phrasing, you must provide a "ghost correction" seamlessly.

Format your response strictly as a JSON object with two fields:
{
  "response": "Your natural conversational reply to the user.",
  "correction": "The grammatically correct version of what the user just said (leave empty string if the user's English was natural and correct)."
}

Respond ONLY with valid JSON. Do not include any other text outside the JSON block."#;

/// System message for a scenario.
#[must_use]
pub fn system_prompt(scenario: Scenario) -> String {
    format!("{}\n{TUTOR_INSTRUCTIONS}", scenario.persona())
}

/// Map stored messages to chat turns.
#[must_use]
pub fn history_turns(messages: &[ChatMessage]) -> Vec<ChatTurn> {
    messages
        .iter()
        .map(|message| match message.role {
            MessageRole::User => ChatTurn::user(message.content.clone()),
            MessageRole::Ai => ChatTurn::assistant(message.content.clone()),
        })
        .collect()
}

/// System message followed by the last [`CONTEXT_WINDOW`] turns.
#[must_use]
pub fn compose(scenario: Scenario, mut history: Vec<ChatTurn>) -> Vec<ChatTurn> {
    let skip = history.len().saturating_sub(CONTEXT_WINDOW);
    let mut turns = Vec::with_capacity(history.len() - skip + 1);
    turns.push(ChatTurn::system(system_prompt(scenario)));
    turns.extend(history.drain(skip..));
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::ChatRole;

    #[test]
    fn test_system_prompt_starts_with_persona() {
        let prompt = system_prompt(Scenario::Restaurant);
        assert!(prompt.starts_with(Scenario::Restaurant.persona()));
        assert!(prompt.contains("\"correction\""));
    }

    #[test]
    fn test_history_maps_ai_to_assistant() {
        let turns = history_turns(&[ChatMessage::user("Hi"), ChatMessage::ai("Hello!")]);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[1].content, "Hello!");
    }

    #[test]
    fn test_compose_keeps_last_ten() {
        let history: Vec<ChatTurn> = (0..15).map(|i| ChatTurn::user(format!("m{i}"))).collect();
        let turns = compose(Scenario::Casual, history);
        assert_eq!(turns.len(), CONTEXT_WINDOW + 1);
        assert_eq!(turns[0].role, ChatRole::System);
        assert_eq!(turns[1].content, "m5");
        assert_eq!(turns[10].content, "m14");
    }

    #[test]
    fn test_compose_short_history() {
        let turns = compose(Scenario::Travel, vec![ChatTurn::user("Where is gate 4?")]);
        assert_eq!(turns.len(), 2);
        assert!(turns[0].content.contains("airport"));
    }
}
