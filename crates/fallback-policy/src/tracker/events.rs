//! Dialogue events
//!
//! Serialized with an `event` tag so a history file reads as a flat list:
//!
//! ```json
//! [
//!   {"event": "action_executed", "action_name": "action_listen"},
//!   {"event": "user_uttered", "intent": "greet", "confidence": 0.21},
//!   {"event": "user_utterance_reverted"}
//! ]
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CONFIDENCE;

/// A user message with the intent recognized for it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    /// Raw text, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Recognized intent name
    #[serde(default)]
    pub intent: Option<String>,
    /// Classifier confidence for `intent`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl UserMessage {
    pub fn new(intent: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: None,
            intent: Some(intent.into()),
            confidence: Some(confidence),
        }
    }

    /// Confidence, defaulting to 1.0 when the classifier reported none
    pub fn confidence(&self) -> f64 {
        self.confidence.unwrap_or(DEFAULT_CONFIDENCE)
    }

    /// Copy of this message with the confidence replaced
    pub fn with_confidence(&self, confidence: f64) -> Self {
        Self {
            confidence: Some(confidence),
            ..self.clone()
        }
    }
}

/// One entry in the dialogue log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The bot executed an action
    ActionExecuted { action_name: String },
    /// The user sent a message
    UserUttered(UserMessage),
    /// Undo the last user message and the action that listened for it
    UserUtteranceReverted,
    /// Undo the last executed action
    ActionReverted,
    /// Forget everything that happened before
    Restarted,
}

impl Event {
    pub fn action(name: impl Into<String>) -> Self {
        Self::ActionExecuted {
            action_name: name.into(),
        }
    }

    pub fn user(intent: impl Into<String>, confidence: f64) -> Self {
        Self::UserUttered(UserMessage::new(intent, confidence))
    }

    pub fn action_name(&self) -> Option<&str> {
        match self {
            Self::ActionExecuted { action_name } => Some(action_name),
            _ => None,
        }
    }

    pub fn user_message(&self) -> Option<&UserMessage> {
        match self {
            Self::UserUttered(message) => Some(message),
            _ => None,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActionExecuted { action_name } => write!(f, "action({})", action_name),
            Self::UserUttered(message) => write!(
                f,
                "user({}, {:.2})",
                message.intent.as_deref().unwrap_or("-"),
                message.confidence()
            ),
            Self::UserUtteranceReverted => write!(f, "user_utterance_reverted"),
            Self::ActionReverted => write!(f, "action_reverted"),
            Self::Restarted => write!(f, "restarted"),
        }
    }
}
