//! Turn classification for the two-stage fallback
//!
//! Escalation state is never stored. It is rebuilt on every call in two
//! pure steps:
//!
//! ```text
//! HistoryInspector + ConfidenceGate ──gather──▶ TurnFacts ──classify──▶ Situation
//! ```
//!
//! `classify` evaluates the rules strictly in order and the first match wins:
//!
//! ```text
//! 1. last action is an escalation prompt or the fallback  → AwaitingUserInput
//! 2. confirmation prompt answered with `deny`
//!      clarification asked before the prompt              → DeniedAfterClarification
//!      otherwise                                          → DeniedConfirmation
//! 3. clarification answered, confidence still low         → ClarificationStillUnclear
//! 4. confirmation answered with `confirm`                 → UserConfirmed
//!    clarification answered                               → UserClarified
//! 5. confirmation prompt answered with something else
//!      confident                                          → ConfirmationBypassed
//!      low confidence                                     → ConfirmationBypassedUnclear
//! 6. low confidence                                       → LowConfidence
//! 7. otherwise                                            → Confident
//! ```

use serde::Serialize;

use super::baseline::ConfidenceGate;
use crate::constants::{
    ACTION_DEFAULT_ASK_CLARIFICATION, ACTION_DEFAULT_ASK_CONFIRMATION, USER_INTENT_CONFIRM,
    USER_INTENT_DENY,
};
use crate::tracker::HistoryInspector;

/// Everything the rules need to know about the current turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnFacts<'a> {
    /// NLU confidence of the latest user message
    pub confidence: f64,
    /// Intent of the latest user message
    pub last_intent: Option<&'a str>,
    /// Most recently executed action, `action_listen` included
    pub last_action: Option<&'a str>,
    /// Low-confidence verdict of the gate
    pub should_fallback: bool,
    /// The last action is a prompt after which the user must answer first
    pub awaiting_user_input: bool,
    /// The last non-listen action asked for confirmation
    pub confirmation_pending: bool,
    /// The last non-listen action asked for clarification
    pub user_clarified: bool,
    /// The non-listen action before the last one asked for clarification
    pub clarified_before: bool,
}

impl<'a> TurnFacts<'a> {
    /// Read the facts for this turn
    pub fn gather(
        inspector: &HistoryInspector<'a>,
        gate: &dyn ConfidenceGate,
        fallback_action_name: &str,
    ) -> Self {
        let (last_intent, confidence) = inspector.last_user_intent();
        let last_action = inspector.last_system_action();

        let awaiting_user_input = matches!(
            last_action,
            Some(action) if action == ACTION_DEFAULT_ASK_CONFIRMATION
                || action == ACTION_DEFAULT_ASK_CLARIFICATION
                || action == fallback_action_name
        );

        Self {
            confidence,
            last_intent,
            last_action,
            should_fallback: gate.is_low_confidence(confidence, last_action),
            awaiting_user_input,
            confirmation_pending: inspector
                .last_system_action_is(ACTION_DEFAULT_ASK_CONFIRMATION, 0),
            user_clarified: inspector.last_system_action_is(ACTION_DEFAULT_ASK_CLARIFICATION, 0),
            clarified_before: inspector.last_system_action_is(ACTION_DEFAULT_ASK_CLARIFICATION, 1),
        }
    }

    fn intent_is(&self, intent: &str) -> bool {
        self.last_intent == Some(intent)
    }
}

/// The mutually exclusive situations a turn can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Situation {
    /// An escalation prompt or the ultimate fallback just ran
    AwaitingUserInput,
    /// The user denied twice across both stages
    DeniedAfterClarification,
    /// The user denied the first confirmation prompt
    DeniedConfirmation,
    /// The restated intent is still uncertain
    ClarificationStillUnclear,
    /// The user confirmed the suggested intent
    UserConfirmed,
    /// The restated intent was recognized confidently
    UserClarified,
    /// The user ignored the confirmation prompt with a confident new intent
    ConfirmationBypassed,
    /// The user ignored the confirmation prompt with an uncertain new intent
    ConfirmationBypassedUnclear,
    /// A fresh turn with low NLU confidence
    LowConfidence,
    /// Nothing to escalate
    Confident,
}

impl Situation {
    /// Apply the rules in priority order; first match wins
    pub fn classify(facts: &TurnFacts<'_>) -> Self {
        if facts.awaiting_user_input {
            return Self::AwaitingUserInput;
        }

        if facts.confirmation_pending && facts.intent_is(USER_INTENT_DENY) {
            return if facts.clarified_before {
                Self::DeniedAfterClarification
            } else {
                Self::DeniedConfirmation
            };
        }

        if facts.user_clarified && facts.should_fallback {
            return Self::ClarificationStillUnclear;
        }

        // An explicit confirm is trusted whatever its own confidence
        if facts.confirmation_pending && facts.intent_is(USER_INTENT_CONFIRM) {
            return Self::UserConfirmed;
        }
        if facts.user_clarified {
            return Self::UserClarified;
        }

        if facts.confirmation_pending {
            return if facts.should_fallback {
                Self::ConfirmationBypassedUnclear
            } else {
                Self::ConfirmationBypassed
            };
        }

        if facts.should_fallback {
            return Self::LowConfidence;
        }

        Self::Confident
    }

    /// Number of the rule that produces this situation
    pub fn rule(self) -> u8 {
        match self {
            Self::AwaitingUserInput => 1,
            Self::DeniedAfterClarification | Self::DeniedConfirmation => 2,
            Self::ClarificationStillUnclear => 3,
            Self::UserConfirmed | Self::UserClarified => 4,
            Self::ConfirmationBypassed | Self::ConfirmationBypassedUnclear => 5,
            Self::LowConfidence => 6,
            Self::Confident => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AwaitingUserInput => "awaiting_user_input",
            Self::DeniedAfterClarification => "denied_after_clarification",
            Self::DeniedConfirmation => "denied_confirmation",
            Self::ClarificationStillUnclear => "clarification_still_unclear",
            Self::UserConfirmed => "user_confirmed",
            Self::UserClarified => "user_clarified",
            Self::ConfirmationBypassed => "confirmation_bypassed",
            Self::ConfirmationBypassedUnclear => "confirmation_bypassed_unclear",
            Self::LowConfidence => "low_confidence",
            Self::Confident => "confident",
        }
    }
}

impl std::fmt::Display for Situation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (rule {})", self.label(), self.rule())
    }
}
