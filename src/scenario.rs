//! Role-play scenarios and their chat personas.
//!
//! The set of scenarios is closed. Unknown keys coming from clients or older
//! snapshots map to [`Scenario::Casual`] explicitly rather than by fallthrough.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named role-play context that selects the system persona.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Scenario {
    /// Everyday conversation with a native speaker.
    #[default]
    Casual,
    /// Formal job interview.
    Interview,
    /// Ordering food at a restaurant.
    Restaurant,
    /// Airport and travel-agent situations.
    Travel,
}

impl Scenario {
    /// Every scenario, in display order.
    pub const ALL: [Self; 4] = [Self::Casual, Self::Interview, Self::Restaurant, Self::Travel];

    /// Stable key used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Interview => "interview",
            Self::Restaurant => "restaurant",
            Self::Travel => "travel",
        }
    }

    /// Resolve a key, defaulting to casual for anything unrecognised.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "interview" => Self::Interview,
            "restaurant" => Self::Restaurant,
            "travel" => Self::Travel,
            _ => Self::Casual,
        }
    }

    /// Persona text placed at the head of the system message.
    #[must_use]
    pub const fn persona(self) -> &'static str {
        match self {
            Self::Casual => {
                "You are a friendly and encouraging native English speaker practicing conversation with a learner."
            }
            Self::Interview => {
                "You are a professional HR manager conducting a job interview. Ask relevant interview questions and keep a formal but encouraging tone."
            }
            Self::Restaurant => {
                "You are a polite waiter at a nice restaurant. The user is a customer ordering food. Keep the conversation focused on the dining experience."
            }
            Self::Travel => {
                "You are an airport official or travel agent assisting a traveler. Help them with directions, tickets, or travel advice."
            }
        }
    }
}

impl From<String> for Scenario {
    fn from(value: String) -> Self {
        Self::from_key(&value)
    }
}

impl From<&str> for Scenario {
    fn from(value: &str) -> Self {
        Self::from_key(value)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::from_key(scenario.as_str()), scenario);
        }
        assert_eq!(Scenario::from_key(" Interview "), Scenario::Interview);
    }

    #[test]
    fn test_unknown_key_defaults_to_casual() {
        assert_eq!(Scenario::from_key("space-station"), Scenario::Casual);
        assert_eq!(Scenario::from_key(""), Scenario::Casual);
    }

    #[test]
    fn test_serde_uses_keys() {
        let json = serde_json::to_string(&Scenario::Restaurant).unwrap();
        assert_eq!(json, "\"restaurant\"");

        let parsed: Scenario = serde_json::from_str("\"travel\"").unwrap();
        assert_eq!(parsed, Scenario::Travel);

        let unknown: Scenario = serde_json::from_str("\"pirate\"").unwrap();
        assert_eq!(unknown, Scenario::Casual);
    }

    #[test]
    fn test_personas_are_distinct() {
        assert!(Scenario::Interview.persona().contains("HR manager"));
        assert!(Scenario::Restaurant.persona().contains("waiter"));
        assert!(Scenario::Travel.persona().contains("airport"));
        assert!(Scenario::Casual.persona().contains("native English speaker"));
    }
}
