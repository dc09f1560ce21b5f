//! Lenient parsing of model replies that are asked to be JSON.
//!
//! Models wrap the requested object in prose or code fences often enough that
//! strict parsing alone is useless. Both parsers slice from the first `{` to
//! the last `}`, try a strict parse, and otherwise fall back to the raw text.
//! Neither can fail.

use serde::{Deserialize, Serialize};

/// Tutor reply: conversational text plus an optional ghost correction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorReply {
    /// Text shown and spoken to the learner.
    pub response: String,
    /// Corrected learner utterance; empty when none was needed.
    pub correction: String,
}

impl TutorReply {
    /// The correction, if the model supplied one.
    #[must_use]
    pub fn correction(&self) -> Option<&str> {
        let correction = self.correction.trim();
        (!correction.is_empty()).then_some(correction)
    }
}

/// Dictionary reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionReply {
    /// Definition of the word in context.
    pub definition: String,
}

#[derive(Deserialize)]
struct RawTutorReply {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    correction: Option<String>,
}

#[derive(Deserialize)]
struct RawDefinitionReply {
    #[serde(default)]
    definition: Option<String>,
}

/// Slice between the first `{` and the last `}`, when both exist in order.
fn json_candidate(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

/// Parse a tutor reply.
#[must_use]
pub fn parse_tutor_reply(raw: &str) -> TutorReply {
    match serde_json::from_str::<RawTutorReply>(json_candidate(raw)) {
        Ok(parsed) => {
            let response = parsed.response.unwrap_or_default();
            TutorReply {
                response: if response.is_empty() {
                    raw.to_string()
                } else {
                    response
                },
                correction: parsed.correction.unwrap_or_default(),
            }
        }
        Err(_) => TutorReply {
            response: raw.to_string(),
            correction: String::new(),
        },
    }
}

/// Parse a dictionary reply.
#[must_use]
pub fn parse_definition_reply(raw: &str) -> DefinitionReply {
    let definition = serde_json::from_str::<RawDefinitionReply>(json_candidate(raw))
        .ok()
        .and_then(|parsed| parsed.definition)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| strip_code_fences(raw));
    DefinitionReply { definition }
}

fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json() {
        let reply = parse_tutor_reply(r#"{"response":"Hi!","correction":""}"#);
        assert_eq!(reply.response, "Hi!");
        assert_eq!(reply.correction, "");
        assert_eq!(reply.correction(), None);
    }

    #[test]
    fn test_json_wrapped_in_prose() {
        let raw = r#"Sure! {"response":"Great","correction":"I went"} hope that helps"#;
        let reply = parse_tutor_reply(raw);
        assert_eq!(reply.response, "Great");
        assert_eq!(reply.correction(), Some("I went"));
    }

    #[test]
    fn test_plain_text_falls_back() {
        let reply = parse_tutor_reply("Hello there");
        assert_eq!(reply.response, "Hello there");
        assert_eq!(reply.correction, "");
    }

    #[test]
    fn test_broken_json_falls_back_to_whole_text() {
        let raw = r#"{"response": "unterminated }"#;
        let reply = parse_tutor_reply(raw);
        assert_eq!(reply.response, raw);
        assert_eq!(reply.correction, "");
    }

    #[test]
    fn test_reversed_braces_fall_back() {
        let reply = parse_tutor_reply("} nothing here {");
        assert_eq!(reply.response, "} nothing here {");
    }

    #[test]
    fn test_missing_response_uses_raw_text() {
        let raw = r#"{"correction":"I am fine"}"#;
        let reply = parse_tutor_reply(raw);
        assert_eq!(reply.response, raw);
        assert_eq!(reply.correction, "I am fine");
    }

    #[test]
    fn test_null_correction_is_empty() {
        let reply = parse_tutor_reply(r#"{"response":"Ok","correction":null}"#);
        assert_eq!(reply.correction(), None);
    }

    #[test]
    fn test_definition_in_fences() {
        let raw = "```json\n{\"definition\": \"A small boat.\"}\n```";
        assert_eq!(parse_definition_reply(raw).definition, "A small boat.");
    }

    #[test]
    fn test_definition_fallback_strips_fences() {
        let raw = "```json\nA place where ships load.\n```";
        assert_eq!(
            parse_definition_reply(raw).definition,
            "A place where ships load."
        );
    }

    #[test]
    fn test_definition_plain_text() {
        assert_eq!(
            parse_definition_reply("  Very happy.  ").definition,
            "Very happy."
        );
    }
}
