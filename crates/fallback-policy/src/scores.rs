//! Action score vectors aligned to the domain's action catalog

use serde::{Deserialize, Serialize};

use crate::domain::{DomainCatalog, DomainError};

/// Score for a single action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionScore {
    pub action: String,
    pub score: f64,
}

/// Per-action confidence distribution, one entry per catalog action in
/// catalog order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionScoreVector {
    scores: Vec<ActionScore>,
}

impl ActionScoreVector {
    /// All-zero vector over the catalog
    pub fn zeros(domain: &DomainCatalog) -> Self {
        Self {
            scores: domain
                .actions()
                .iter()
                .map(|action| ActionScore {
                    action: action.clone(),
                    score: 0.0,
                })
                .collect(),
        }
    }

    /// Vector with `action` at `weight` and every other action at zero.
    ///
    /// Fails with [`DomainError::UnknownAction`] when the action is not in
    /// the catalog.
    pub fn for_action(
        action: &str,
        weight: f64,
        domain: &DomainCatalog,
    ) -> Result<Self, DomainError> {
        let idx = domain.index_for_action(action)?;
        let mut vector = Self::zeros(domain);
        vector.scores[idx].score = weight;
        Ok(vector)
    }

    /// Score of `action`, if it is part of the vector
    pub fn get(&self, action: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.action == action)
            .map(|s| s.score)
    }

    /// Highest-scoring action. Ties resolve to the earliest catalog entry.
    pub fn best(&self) -> Option<&ActionScore> {
        self.scores
            .iter()
            .fold(None, |best: Option<&ActionScore>, s| match best {
                Some(b) if b.score >= s.score => Some(b),
                _ => Some(s),
            })
    }

    /// Raw scores in catalog order
    pub fn values(&self) -> Vec<f64> {
        self.scores.iter().map(|s| s.score).collect()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
