//! Crate-level error type

use thiserror::Error;

use crate::domain::DomainError;
use crate::policy::config::ConfigError;

/// Result type alias for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors surfaced by the policies. None of them are retried internally.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The domain is unusable for this policy, or a rule referenced an
    /// action the domain does not contain
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Config could not be loaded, saved or validated
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PolicyError {
    /// Whether this is the caller-side "invalid domain configuration" error
    pub fn is_invalid_domain(&self) -> bool {
        matches!(self, Self::Domain(DomainError::InvalidDomain { .. }))
    }

    /// Whether a rule asked for an action missing from the domain
    pub fn is_unknown_action(&self) -> bool {
        matches!(self, Self::Domain(DomainError::UnknownAction { .. }))
    }
}
