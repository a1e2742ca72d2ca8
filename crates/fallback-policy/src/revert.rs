//! Revert planning for `action_revert_fallback_events`
//!
//! When the two-stage policy recommends reverting, the escalation detour
//! (prompts, confirm/deny answers, restated intents) has to disappear from
//! the history so that downstream policies see a conversation in which the
//! intended message was understood straight away. This module computes the
//! events that achieve that; appending them is up to the orchestrator.
//!
//! A confirmation detour is undone with two utterance reverts, a
//! clarification detour with three, and each is followed by `action_listen`
//! and the message that should stand in the history.

use crate::constants::{
    ACTION_DEFAULT_ASK_CLARIFICATION, ACTION_DEFAULT_ASK_CONFIRMATION, ACTION_LISTEN_NAME,
    FALLBACK_SCORE, USER_INTENT_CONFIRM,
};
use crate::tracker::{DialogueHistory, DialogueLog, Event, HistoryInspector, UserMessage};

/// Events that erase the escalation detour from `history`.
///
/// Empty when no escalation prompt is pending.
pub fn plan_revert_events(history: &DialogueHistory) -> Vec<Event> {
    let inspector = HistoryInspector::new(history);
    let (last_intent, _) = inspector.last_user_intent();
    let confirmation_pending = inspector.last_system_action_is(ACTION_DEFAULT_ASK_CONFIRMATION, 0);

    if confirmation_pending && last_intent == Some(USER_INTENT_CONFIRM) {
        // The confirmed message is the one before the "confirm" answer
        let Some(confirmed) = history.user_utterance_at(1) else {
            return Vec::new();
        };
        let confirmed = confirmed.with_confidence(FALLBACK_SCORE);

        let mut events = revert_confirmation();
        if inspector.last_system_action_is(ACTION_DEFAULT_ASK_CLARIFICATION, 1) {
            events.extend(revert_clarification(confirmed));
        } else {
            events.push(Event::UserUttered(confirmed));
        }
        events
    } else if inspector.last_system_action_is(ACTION_DEFAULT_ASK_CLARIFICATION, 0) {
        history
            .latest_user_message()
            .map(|clarified| revert_clarification(clarified.clone()))
            .unwrap_or_default()
    } else if confirmation_pending {
        // Answered the confirmation prompt with a different intent
        history
            .latest_user_message()
            .map(|message| {
                let mut events = revert_confirmation();
                events.push(Event::UserUttered(message.clone()));
                events
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    }
}

/// Undo the confirmation prompt with its answer, and the low-confidence
/// message that triggered it
fn revert_confirmation() -> Vec<Event> {
    vec![
        Event::UserUtteranceReverted,
        Event::UserUtteranceReverted,
        Event::action(ACTION_LISTEN_NAME),
    ]
}

/// Undo the clarification round, the deny before it and the first
/// confirmation prompt, then restore `message`
fn revert_clarification(message: UserMessage) -> Vec<Event> {
    vec![
        Event::UserUtteranceReverted,
        Event::UserUtteranceReverted,
        Event::UserUtteranceReverted,
        Event::action(ACTION_LISTEN_NAME),
        Event::UserUttered(message),
    ]
}
