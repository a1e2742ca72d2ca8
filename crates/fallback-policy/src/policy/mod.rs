//! Fallback policies
//!
//! - [`FallbackPolicy`]: single-stage baseline, also the default
//!   [`ConfidenceGate`]
//! - [`TwoStageFallbackPolicy`]: ask for confirmation, then clarification,
//!   then give up
//!
//! Both are stateless between calls apart from their immutable config.

pub mod baseline;
pub mod config;
pub mod observer;
pub mod situation;
pub mod two_stage;

use std::path::{Path, PathBuf};

use crate::domain::DomainCatalog;
use crate::error::PolicyResult;
use crate::scores::ActionScoreVector;
use crate::tracker::DialogueLog;

pub use baseline::{BaselineSituation, ConfidenceGate, FallbackPolicy};
pub use config::{ConfigError, ConfigFlags, ConfigStore, PolicyConfig};
pub use observer::{
    DecisionObserver, DecisionRecord, NoopObserver, RecordingObserver, TracingObserver,
};
pub use situation::{Situation, TurnFacts};
pub use two_stage::{Recommendation, TwoStageFallbackPolicy};

/// A policy the orchestrator consults once per turn
pub trait Policy: Send + Sync {
    /// Stable name used in decision records
    fn name(&self) -> &'static str;

    /// Score every action in `domain` for the next turn
    fn predict(
        &self,
        history: &dyn DialogueLog,
        domain: &DomainCatalog,
    ) -> PolicyResult<ActionScoreVector>;

    /// Write the policy config under `dir`, returning the file written
    fn persist(&self, dir: &Path) -> PolicyResult<PathBuf>;
}
