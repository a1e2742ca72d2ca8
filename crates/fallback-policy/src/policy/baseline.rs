//! Baseline single-stage fallback policy
//!
//! Predicts the fallback action unconditionally when NLU confidence is low,
//! and otherwise at `core_threshold` so that any more confident policy in an
//! ensemble wins. Its low-confidence verdict and score construction are also
//! the [`ConfidenceGate`] the two-stage policy is built on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::config::{ConfigStore, PolicyConfig};
use super::observer::{DecisionObserver, DecisionRecord, TracingObserver};
use super::Policy;
use crate::constants::{ACTION_LISTEN_NAME, FALLBACK_SCORE};
use crate::domain::{DomainCatalog, DomainError};
use crate::error::PolicyResult;
use crate::scores::ActionScoreVector;
use crate::tracker::{DialogueLog, HistoryInspector};

/// Low-confidence verdict and baseline scores
pub trait ConfidenceGate: Send + Sync {
    /// Whether `confidence` counts as low given the action executed last
    fn is_low_confidence(&self, confidence: f64, last_action: Option<&str>) -> bool;

    /// Graded recommendation used when no escalation rule applies
    fn baseline_scores(
        &self,
        domain: &DomainCatalog,
        threshold: f64,
    ) -> Result<ActionScoreVector, DomainError>;
}

/// Outcome classes of the baseline policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineSituation {
    /// The fallback action just ran; wait for the user
    FallbackExecuted,
    /// NLU confidence below threshold
    LowConfidence,
    /// NLU confident enough; fallback only at `core_threshold`
    Confident,
}

impl BaselineSituation {
    pub fn rule(self) -> u8 {
        match self {
            Self::FallbackExecuted => 1,
            Self::LowConfidence => 2,
            Self::Confident => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FallbackExecuted => "fallback_executed",
            Self::LowConfidence => "low_confidence",
            Self::Confident => "confident",
        }
    }
}

/// Single-stage fallback policy
pub struct FallbackPolicy {
    config: PolicyConfig,
    observer: Arc<dyn DecisionObserver>,
}

impl FallbackPolicy {
    pub const NAME: &'static str = "fallback";

    /// Create a policy, validating the config
    pub fn new(config: PolicyConfig) -> PolicyResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            observer: Arc::new(TracingObserver),
        })
    }

    /// Replace the decision observer
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Load from `<dir>/fallback_policy.json`, or defaults if absent
    pub fn load(dir: &Path) -> PolicyResult<Self> {
        Self::new(ConfigStore::baseline().load(dir)?)
    }

    /// Classify the current turn
    pub fn situation(&self, history: &dyn DialogueLog) -> BaselineSituation {
        let inspector = HistoryInspector::new(history);
        let last_action = inspector.last_system_action();
        let (_, confidence) = inspector.last_user_intent();

        if last_action == Some(self.config.fallback_action_name.as_str()) {
            BaselineSituation::FallbackExecuted
        } else if self.is_low_confidence(confidence, last_action) {
            BaselineSituation::LowConfidence
        } else {
            BaselineSituation::Confident
        }
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            config: PolicyConfig::default(),
            observer: Arc::new(TracingObserver),
        }
    }
}

impl std::fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConfidenceGate for FallbackPolicy {
    /// Low when below `nlu_threshold`, unless the fallback action itself
    /// ran last.
    fn is_low_confidence(&self, confidence: f64, last_action: Option<&str>) -> bool {
        confidence < self.config.nlu_threshold
            && last_action != Some(self.config.fallback_action_name.as_str())
    }

    /// The fallback action at `threshold`
    fn baseline_scores(
        &self,
        domain: &DomainCatalog,
        threshold: f64,
    ) -> Result<ActionScoreVector, DomainError> {
        ActionScoreVector::for_action(&self.config.fallback_action_name, threshold, domain)
    }
}

impl Policy for FallbackPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn predict(
        &self,
        history: &dyn DialogueLog,
        domain: &DomainCatalog,
    ) -> PolicyResult<ActionScoreVector> {
        let situation = self.situation(history);
        let scores = match situation {
            BaselineSituation::FallbackExecuted => {
                ActionScoreVector::for_action(ACTION_LISTEN_NAME, FALLBACK_SCORE, domain)?
            }
            BaselineSituation::LowConfidence => self.baseline_scores(domain, FALLBACK_SCORE)?,
            BaselineSituation::Confident => {
                self.baseline_scores(domain, self.config.core_threshold)?
            }
        };

        let inspector = HistoryInspector::new(history);
        let (last_intent, confidence) = inspector.last_user_intent();
        self.observer.on_decision(
            &DecisionRecord::new(Self::NAME, situation.label(), situation.rule(), &scores)
                .with_turn(confidence, last_intent, inspector.last_system_action()),
        );

        Ok(scores)
    }

    fn persist(&self, dir: &Path) -> PolicyResult<PathBuf> {
        Ok(ConfigStore::baseline().save(dir, &self.config)?)
    }
}
