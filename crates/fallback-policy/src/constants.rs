//! Reserved action and intent names shared by the policies and the tracker.

/// The first action in any turn: the bot waits for a user message.
pub const ACTION_LISTEN_NAME: &str = "action_listen";

/// Resets the tracker to its initial state.
pub const ACTION_RESTART_NAME: &str = "action_restart";

/// Default ultimate fallback, executed when escalation gives up.
pub const ACTION_DEFAULT_FALLBACK_NAME: &str = "action_default_fallback";

/// Deactivates an active form.
pub const ACTION_DEACTIVATE_FORM_NAME: &str = "action_deactivate_form";

/// Erases the escalation detour from the history.
pub const ACTION_REVERT_FALLBACK_EVENTS: &str = "action_revert_fallback_events";

/// Asks the user to confirm the recognized intent.
pub const ACTION_DEFAULT_ASK_CONFIRMATION: &str = "action_default_ask_confirmation";

/// Asks the user to restate their intent.
pub const ACTION_DEFAULT_ASK_CLARIFICATION: &str = "action_default_ask_clarification";

/// Intent the user sends to accept a confirmation prompt.
pub const USER_INTENT_CONFIRM: &str = "confirm";

/// Intent the user sends to reject a confirmation prompt.
pub const USER_INTENT_DENY: &str = "deny";

/// Score used when a policy wants its recommendation honoured unconditionally.
pub const FALLBACK_SCORE: f64 = 1.0;

/// Confidence assumed for a user message that carries none.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Default NLU confidence threshold.
pub const DEFAULT_NLU_THRESHOLD: f64 = 0.3;

/// Default score for the baseline fallback recommendation.
pub const DEFAULT_CORE_THRESHOLD: f64 = 0.3;

/// Default actions, in catalog order. `action_listen` is always index 0.
pub const DEFAULT_ACTIONS: &[&str] = &[
    ACTION_LISTEN_NAME,
    ACTION_RESTART_NAME,
    ACTION_DEFAULT_FALLBACK_NAME,
    ACTION_DEACTIVATE_FORM_NAME,
    ACTION_REVERT_FALLBACK_EVENTS,
    ACTION_DEFAULT_ASK_CONFIRMATION,
    ACTION_DEFAULT_ASK_CLARIFICATION,
];

/// Whether `name` is one of the default actions.
pub fn is_default_action(name: &str) -> bool {
    DEFAULT_ACTIONS.contains(&name)
}
