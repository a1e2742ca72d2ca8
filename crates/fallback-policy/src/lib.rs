//! Two-Stage Fallback Policy Library
//!
//! This library provides:
//! - A two-stage escalation policy for low-confidence NLU results
//! - The single-stage baseline fallback policy it builds on
//! - Event replay over dialogue histories (restarts and reverts)
//! - Revert planning that erases a finished escalation detour
//!
//! # Escalation
//!
//! ```text
//! user message (low confidence)
//!     └─▶ action_default_ask_confirmation
//!           ├─ confirm ──▶ action_revert_fallback_events
//!           └─ deny ─────▶ action_default_ask_clarification
//!                             ├─ confident ──▶ action_revert_fallback_events
//!                             └─ unclear ────▶ action_default_ask_confirmation
//!                                                ├─ confirm ──▶ revert
//!                                                └─ deny ─────▶ ultimate fallback
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Score the next action for a recorded conversation
//! two-stage-fallback predict --domain domain.yml --history history.json
//!
//! # Persist a config next to a trained model
//! two-stage-fallback persist --model-dir ./models --nlu-threshold 0.4
//!
//! # Show the effective config after env overrides
//! TWO_STAGE_CORE_THRESHOLD=0.2 two-stage-fallback show-config --model-dir ./models
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod constants;
pub mod domain;
pub mod error;
pub mod policy;
pub mod revert;
pub mod scores;
pub mod tracker;

pub use domain::{DomainCatalog, DomainError};
pub use error::{PolicyError, PolicyResult};
pub use policy::{
    ConfidenceGate, ConfigError, ConfigFlags, ConfigStore, DecisionObserver, DecisionRecord,
    FallbackPolicy, NoopObserver, Policy, PolicyConfig, RecordingObserver, Situation,
    TracingObserver, TwoStageFallbackPolicy,
};
pub use revert::plan_revert_events;
pub use scores::{ActionScore, ActionScoreVector};
pub use tracker::{DialogueHistory, DialogueLog, Event, HistoryInspector, UserMessage};
