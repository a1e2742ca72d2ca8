//! Decision observers: structured records of every prediction
//!
//! Policies do not log on their own. Each prediction produces one
//! [`DecisionRecord`] that is handed to the injected [`DecisionObserver`]:
//!
//! - [`TracingObserver`] (default) emits a `tracing` debug event
//! - [`NoopObserver`] stays silent
//! - [`RecordingObserver`] keeps the records for inspection

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::scores::ActionScoreVector;

/// One evaluated turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    /// Policy that produced the decision
    pub policy: &'static str,
    /// Situation the turn was classified as
    pub situation: &'static str,
    /// Rule number that matched (1-based, in evaluation order)
    pub rule: u8,
    /// Highest-scoring action in the produced vector
    pub action: Option<String>,
    /// Score of `action`
    pub weight: f64,
    /// NLU confidence of the latest user message
    pub confidence: f64,
    /// Intent of the latest user message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_intent: Option<String>,
    /// Most recently executed action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(
        policy: &'static str,
        situation: &'static str,
        rule: u8,
        scores: &ActionScoreVector,
    ) -> Self {
        let best = scores.best();
        Self {
            policy,
            situation,
            rule,
            action: best.map(|s| s.action.clone()),
            weight: best.map(|s| s.score).unwrap_or(0.0),
            confidence: 0.0,
            last_intent: None,
            last_action: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the turn facts the decision was based on
    pub fn with_turn(
        mut self,
        confidence: f64,
        last_intent: Option<&str>,
        last_action: Option<&str>,
    ) -> Self {
        self.confidence = confidence;
        self.last_intent = last_intent.map(str::to_string);
        self.last_action = last_action.map(str::to_string);
        self
    }
}

/// Sink for decision records
pub trait DecisionObserver: Send + Sync {
    fn on_decision(&self, record: &DecisionRecord);
}

/// Emits each record as a `tracing` debug event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DecisionObserver for TracingObserver {
    fn on_decision(&self, record: &DecisionRecord) {
        debug!(
            policy = record.policy,
            situation = record.situation,
            rule = record.rule,
            action = record.action.as_deref().unwrap_or("-"),
            weight = record.weight,
            confidence = record.confidence,
            last_intent = record.last_intent.as_deref().unwrap_or("-"),
            last_action = record.last_action.as_deref().unwrap_or("-"),
            "Fallback decision"
        );
    }
}

/// Drops every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DecisionObserver for NoopObserver {
    fn on_decision(&self, _record: &DecisionRecord) {}
}

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    records: Mutex<Vec<DecisionRecord>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records so far, oldest first
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<DecisionRecord> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DecisionRecord>> {
        // Records stay valid after a panic elsewhere poisoned the lock
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DecisionObserver for RecordingObserver {
    fn on_decision(&self, record: &DecisionRecord) {
        self.lock().push(record.clone());
    }
}
