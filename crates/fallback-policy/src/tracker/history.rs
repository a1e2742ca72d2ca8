//! In-memory dialogue history
//!
//! Stores the raw, append-only event log and answers queries over the
//! *applied* events: the log after restarts and reverts have been replayed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::events::{Event, UserMessage};
use crate::constants::ACTION_LISTEN_NAME;

/// Error type for history loading
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to read history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid history JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Read access to a dialogue log, as the policies need it
pub trait DialogueLog {
    /// Most recently executed action, including `action_listen`
    fn latest_action_name(&self) -> Option<&str>;

    /// The non-listen action `skip` positions back from the most recent one
    fn action_at(&self, skip: usize) -> Option<&str>;

    /// Most recent user message
    fn latest_user_message(&self) -> Option<&UserMessage>;
}

/// Ordered, append-only event log of one conversation.
///
/// The applied view is maintained as events are appended, so queries never
/// replay the log.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Vec<Event>")]
pub struct DialogueHistory {
    events: Vec<Event>,
    /// Indices into `events` that survive restarts and reverts, oldest first
    applied: Vec<usize>,
}

impl DialogueHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut history = Self::new();
        history.extend(events);
        history
    }

    /// Parse a JSON list of events
    pub fn from_json_str(json: &str) -> HistoryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON history file
    pub fn load(path: &Path) -> HistoryResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let history = Self::from_json_str(&json)?;
        debug!(
            path = %path.display(),
            events = history.len(),
            applied = history.applied.len(),
            "Loaded dialogue history"
        );
        Ok(history)
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
        self.apply_last();
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events that remain after replaying restarts and reverts.
    ///
    /// - `Restarted` drops everything before it.
    /// - `ActionReverted` drops events back to and including the last
    ///   executed action.
    /// - `UserUtteranceReverted` drops events back to and including the last
    ///   user message, then back to and including the action before it
    ///   (normally the `action_listen` that waited for that message).
    pub fn applied_events(&self) -> Vec<&Event> {
        self.applied_iter().collect()
    }

    /// The user message `skip` positions back from the most recent one
    pub fn user_utterance_at(&self, skip: usize) -> Option<&UserMessage> {
        self.applied_iter()
            .rev()
            .filter_map(|e| e.user_message())
            .nth(skip)
    }

    fn applied_iter(&self) -> impl DoubleEndedIterator<Item = &Event> + '_ {
        self.applied.iter().map(move |&idx| &self.events[idx])
    }

    /// Fold the most recently appended event into the applied view
    fn apply_last(&mut self) {
        let Some(idx) = self.events.len().checked_sub(1) else {
            return;
        };
        match &self.events[idx] {
            Event::Restarted => self.applied.clear(),
            Event::ActionReverted => {
                undo_till_previous(&mut self.applied, &self.events, |e| {
                    e.action_name().is_some()
                });
            }
            Event::UserUtteranceReverted => {
                undo_till_previous(&mut self.applied, &self.events, |e| {
                    e.user_message().is_some()
                });
                undo_till_previous(&mut self.applied, &self.events, |e| {
                    e.action_name().is_some()
                });
            }
            _ => self.applied.push(idx),
        }
    }
}

impl From<Vec<Event>> for DialogueHistory {
    fn from(events: Vec<Event>) -> Self {
        Self::from_events(events)
    }
}

/// Serializes as the raw event list; the applied view is rebuilt on load
impl Serialize for DialogueHistory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.events.serialize(serializer)
    }
}

/// Pop applied indices until one whose event matches `is_target` has been
/// removed
fn undo_till_previous(
    applied: &mut Vec<usize>,
    events: &[Event],
    is_target: impl Fn(&Event) -> bool,
) {
    while let Some(idx) = applied.pop() {
        if is_target(&events[idx]) {
            break;
        }
    }
}

impl DialogueLog for DialogueHistory {
    fn latest_action_name(&self) -> Option<&str> {
        self.applied_iter().rev().find_map(|e| e.action_name())
    }

    fn action_at(&self, skip: usize) -> Option<&str> {
        self.applied_iter()
            .rev()
            .filter_map(|e| e.action_name())
            .filter(|name| *name != ACTION_LISTEN_NAME)
            .nth(skip)
    }

    fn latest_user_message(&self) -> Option<&UserMessage> {
        self.user_utterance_at(0)
    }
}
