//! In-context word definitions.

use tokio::sync::RwLock;
use tracing::debug;

use crate::inference::client::InferenceGateway;
use crate::inference::types::{ChatTurn, GenerationParams};
use crate::pipeline::error::{InputError, TurnError};
use crate::progress::store::ProgressStore;
use crate::reply::{DefinitionReply, parse_definition_reply};

/// Longest accepted word or phrase, in characters.
pub const MAX_WORD_CHARS: usize = 50;

/// Longest accepted context sentence, in characters.
pub const MAX_CONTEXT_CHARS: usize = 500;

const DICTIONARY_PROMPT: &str = r#"You are an English dictionary and vocabulary assistant.
The user will provide a WORD and the CONTEXT SENTENCE it appeared in.
Provide a concise, easy-to-understand definition of the word exactly as it is used in the given context.
Keep the definition to 1-2 short sentences maximum.

Format your response strictly as a JSON object:
{
  "definition": "The concise definition here."
}
Respond ONLY with valid JSON."#;

/// Validated lookup request.
struct Lookup<'a> {
    word: &'a str,
    context: Option<&'a str>,
}

fn validate<'a>(word: &'a str, context: Option<&'a str>) -> Result<Lookup<'a>, InputError> {
    let word = word.trim();
    if word.is_empty() {
        return Err(InputError::MissingField("word"));
    }
    if word.chars().count() > MAX_WORD_CHARS {
        return Err(InputError::FieldTooLong {
            field: "word",
            max: MAX_WORD_CHARS,
        });
    }
    let context = context.map(str::trim).filter(|c| !c.is_empty());
    if context.is_some_and(|c| c.chars().count() > MAX_CONTEXT_CHARS) {
        return Err(InputError::FieldTooLong {
            field: "context",
            max: MAX_CONTEXT_CHARS,
        });
    }
    Ok(Lookup { word, context })
}

fn lookup_prompt(lookup: &Lookup<'_>) -> String {
    format!(
        "Define this word: <word>{}</word>\nFound in this text: <context>{}</context>",
        lookup.word,
        lookup.context.unwrap_or("No context provided.")
    )
}

/// Define `word` as used in `context`.
///
/// # Errors
/// Returns an input error for a blank or too-long word or context, or a
/// service error if the completion fails.
pub async fn lookup_definition(
    gateway: &dyn InferenceGateway,
    word: &str,
    context: Option<&str>,
) -> Result<DefinitionReply, TurnError> {
    let lookup = validate(word, context)?;
    let messages = [
        ChatTurn::system(DICTIONARY_PROMPT),
        ChatTurn::user(lookup_prompt(&lookup)),
    ];
    let raw = gateway
        .complete(&messages, GenerationParams::DICTIONARY)
        .await?;
    debug!(word = lookup.word, "Definition received");
    Ok(parse_definition_reply(&raw))
}

/// Result of a define-and-save request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SavedDefinition {
    /// The word as stored.
    pub word: String,
    /// Its definition.
    pub definition: String,
    /// False when the word was already saved.
    pub added: bool,
}

/// Look up a word and save it to the vocabulary list.
///
/// # Errors
/// Same as [`lookup_definition`]; nothing is saved on error.
pub async fn define_and_save(
    gateway: &dyn InferenceGateway,
    store: &RwLock<ProgressStore>,
    word: &str,
    context: Option<&str>,
) -> Result<SavedDefinition, TurnError> {
    let reply = lookup_definition(gateway, word, context).await?;
    let word = word.trim().to_string();
    let context = context.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string);
    let added = store
        .write()
        .await
        .add_vocabulary(&word, context, Some(reply.definition.clone()));
    Ok(SavedDefinition {
        word,
        definition: reply.definition,
        added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::ChatRole;
    use crate::pipeline::turn::tests::FakeGateway;
    use crate::progress::ids::UserId;

    #[tokio::test]
    async fn test_lookup_builds_prompt() {
        let gateway = FakeGateway::default();
        gateway.push_completion(Ok(r#"{"definition":"Feeling very tired."}"#.to_string()));

        let reply = lookup_definition(&gateway, "exhausted", Some("I was exhausted after work"))
            .await
            .unwrap();
        assert_eq!(reply.definition, "Feeling very tired.");

        let request = gateway.last_request();
        assert_eq!(request[0].role, ChatRole::System);
        assert_eq!(request[1].role, ChatRole::User);
        assert_eq!(
            request[1].content,
            "Define this word: <word>exhausted</word>\nFound in this text: <context>I was exhausted after work</context>"
        );
    }

    #[tokio::test]
    async fn test_missing_context_placeholder() {
        let gateway = FakeGateway::default();
        gateway.push_completion(Ok("Quick.".to_string()));

        lookup_definition(&gateway, "swift", None).await.unwrap();
        assert!(gateway.last_request()[1]
            .content
            .ends_with("<context>No context provided.</context>"));
    }

    #[tokio::test]
    async fn test_input_limits() {
        let gateway = FakeGateway::default();
        assert!(matches!(
            lookup_definition(&gateway, "  ", None).await,
            Err(TurnError::Input(InputError::MissingField("word")))
        ));
        let long_word = "a".repeat(MAX_WORD_CHARS + 1);
        assert!(matches!(
            lookup_definition(&gateway, &long_word, None).await,
            Err(TurnError::Input(InputError::FieldTooLong { field: "word", .. }))
        ));
        let long_context = "b".repeat(MAX_CONTEXT_CHARS + 1);
        assert!(matches!(
            lookup_definition(&gateway, "ok", Some(&long_context)).await,
            Err(TurnError::Input(InputError::FieldTooLong { field: "context", .. }))
        ));
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_define_and_save_adds_once() {
        let gateway = FakeGateway::default();
        gateway.push_completion(Ok(r#"{"definition":"A small harbour."}"#.to_string()));
        gateway.push_completion(Ok(r#"{"definition":"A small harbour."}"#.to_string()));
        let store = RwLock::new(ProgressStore::new(UserId::new()));

        let first = define_and_save(&gateway, &store, "Marina", Some("The marina was full"))
            .await
            .unwrap();
        assert!(first.added);
        let second = define_and_save(&gateway, &store, "marina", None).await.unwrap();
        assert!(!second.added);

        let store = store.read().await;
        assert_eq!(store.vocabulary().len(), 1);
        assert_eq!(store.vocabulary()[0].word, "Marina");
        assert_eq!(store.vocabulary()[0].definition.as_deref(), Some("A small harbour."));
        assert_eq!(
            store.vocabulary()[0].context.as_deref(),
            Some("The marina was full")
        );
    }
}
