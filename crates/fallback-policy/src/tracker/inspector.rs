//! Narrow read-only queries the escalation rules are written against

use super::history::DialogueLog;
use crate::constants::DEFAULT_CONFIDENCE;

/// Read-only view over a [`DialogueLog`]. Never fails: short or empty
/// histories answer "not present".
#[derive(Clone, Copy)]
pub struct HistoryInspector<'a> {
    log: &'a dyn DialogueLog,
}

impl<'a> HistoryInspector<'a> {
    pub fn new(log: &'a dyn DialogueLog) -> Self {
        Self { log }
    }

    /// The most recently executed action, `action_listen` included
    pub fn last_system_action(&self) -> Option<&'a str> {
        self.log.latest_action_name()
    }

    /// Whether the non-listen action `skip` positions back equals `name`.
    ///
    /// `skip = 0` is the most recent one, `skip = 1` the one before that.
    pub fn last_system_action_is(&self, name: &str, skip: usize) -> bool {
        self.log.action_at(skip) == Some(name)
    }

    /// Intent and confidence of the latest user message. Without any user
    /// message this is `(None, 1.0)`.
    pub fn last_user_intent(&self) -> (Option<&'a str>, f64) {
        match self.log.latest_user_message() {
            Some(message) => (message.intent.as_deref(), message.confidence()),
            None => (None, DEFAULT_CONFIDENCE),
        }
    }
}

impl std::fmt::Debug for HistoryInspector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryInspector")
            .field("last_system_action", &self.last_system_action())
            .field("last_user_intent", &self.last_user_intent())
            .finish()
    }
}
