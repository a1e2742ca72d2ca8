//! Two-stage fallback policy
//!
//! Handles low NLU confidence in stages instead of giving up at once:
//!
//! ```text
//! low confidence ──▶ ask to confirm the intent
//!     │ confirm ──▶ revert the detour, continue with the intent
//!     │ deny ─────▶ ask to restate the intent
//!     │               │ confident ──▶ revert the detour, continue
//!     │               │ unclear ────▶ ask to confirm the restated intent
//!     │               │                 │ confirm ──▶ revert, continue
//!     │               │                 │ deny ─────▶ ultimate fallback
//! ```
//!
//! Every call rebuilds the escalation state from the history, so the policy
//! itself only holds its config, the confidence gate and the observer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::baseline::{ConfidenceGate, FallbackPolicy};
use super::config::{ConfigStore, PolicyConfig};
use super::observer::{DecisionObserver, DecisionRecord, TracingObserver};
use super::situation::{Situation, TurnFacts};
use super::Policy;
use crate::constants::{
    ACTION_DEFAULT_ASK_CLARIFICATION, ACTION_DEFAULT_ASK_CONFIRMATION, ACTION_LISTEN_NAME,
    ACTION_REVERT_FALLBACK_EVENTS, FALLBACK_SCORE, USER_INTENT_CONFIRM, USER_INTENT_DENY,
};
use crate::domain::DomainCatalog;
use crate::error::PolicyResult;
use crate::scores::ActionScoreVector;
use crate::tracker::{DialogueLog, HistoryInspector};

/// What a situation asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recommendation<'a> {
    /// A single action at a fixed weight
    Action { name: &'a str, weight: f64 },
    /// Defer to the gate's baseline scores at `threshold`
    Baseline { threshold: f64 },
}

/// Multi-stage escalation for low-confidence intents
pub struct TwoStageFallbackPolicy {
    config: PolicyConfig,
    gate: Arc<dyn ConfidenceGate>,
    observer: Arc<dyn DecisionObserver>,
}

impl TwoStageFallbackPolicy {
    pub const NAME: &'static str = "two_stage_fallback";

    /// Create a policy whose confidence gate is a [`FallbackPolicy`] with
    /// the same config
    pub fn new(config: PolicyConfig) -> PolicyResult<Self> {
        let gate = FallbackPolicy::new(config.clone())?;
        Ok(Self {
            config,
            gate: Arc::new(gate),
            observer: Arc::new(TracingObserver),
        })
    }

    /// Replace the confidence gate
    pub fn with_gate(mut self, gate: Arc<dyn ConfidenceGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the decision observer
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Load from `<dir>/two_stage_fallback_policy.json`, or defaults if absent
    pub fn load(dir: &Path) -> PolicyResult<Self> {
        Self::new(ConfigStore::two_stage().load(dir)?)
    }

    /// Classify the current turn without building a score vector
    pub fn situation(&self, history: &dyn DialogueLog) -> Situation {
        let inspector = HistoryInspector::new(history);
        let facts = TurnFacts::gather(
            &inspector,
            self.gate.as_ref(),
            &self.config.fallback_action_name,
        );
        Situation::classify(&facts)
    }

    /// Dispatch table from situation to recommended action
    pub fn recommend(&self, situation: Situation) -> Recommendation<'_> {
        let ultimate_fallback = self.config.fallback_action_name.as_str();

        let name = match situation {
            Situation::AwaitingUserInput => ACTION_LISTEN_NAME,
            Situation::DeniedAfterClarification => ultimate_fallback,
            Situation::DeniedConfirmation => ACTION_DEFAULT_ASK_CLARIFICATION,
            Situation::ClarificationStillUnclear => ACTION_DEFAULT_ASK_CONFIRMATION,
            Situation::UserConfirmed | Situation::UserClarified => ACTION_REVERT_FALLBACK_EVENTS,
            Situation::ConfirmationBypassed => ACTION_REVERT_FALLBACK_EVENTS,
            Situation::ConfirmationBypassedUnclear => ultimate_fallback,
            Situation::LowConfidence => ACTION_DEFAULT_ASK_CONFIRMATION,
            Situation::Confident => {
                return Recommendation::Baseline {
                    threshold: self.config.core_threshold,
                }
            }
        };

        Recommendation::Action {
            name,
            weight: FALLBACK_SCORE,
        }
    }
}

impl std::fmt::Debug for TwoStageFallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoStageFallbackPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Policy for TwoStageFallbackPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn predict(
        &self,
        history: &dyn DialogueLog,
        domain: &DomainCatalog,
    ) -> PolicyResult<ActionScoreVector> {
        domain.require_intents(&[USER_INTENT_CONFIRM, USER_INTENT_DENY])?;

        let inspector = HistoryInspector::new(history);
        let facts = TurnFacts::gather(
            &inspector,
            self.gate.as_ref(),
            &self.config.fallback_action_name,
        );
        let situation = Situation::classify(&facts);

        let scores = match self.recommend(situation) {
            Recommendation::Action { name, weight } => {
                ActionScoreVector::for_action(name, weight, domain)?
            }
            Recommendation::Baseline { threshold } => {
                self.gate.baseline_scores(domain, threshold)?
            }
        };

        self.observer.on_decision(
            &DecisionRecord::new(Self::NAME, situation.label(), situation.rule(), &scores)
                .with_turn(facts.confidence, facts.last_intent, facts.last_action),
        );

        Ok(scores)
    }

    fn persist(&self, dir: &Path) -> PolicyResult<PathBuf> {
        Ok(ConfigStore::two_stage().save(dir, &self.config)?)
    }
}
