//! Domain catalog: the intents and actions a bot knows about
//!
//! The catalog is supplied by the caller on every prediction and never
//! mutated by the policies. Action order matters: score vectors are aligned
//! to it, and the default actions always come first with `action_listen` at
//! index 0.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{is_default_action, DEFAULT_ACTIONS};

/// Errors raised while building or querying a domain catalog
#[derive(Debug, Error)]
pub enum DomainError {
    /// Reserved intents required by a policy are missing
    #[error(
        "The intents {} must be present in the domain to use this policy",
        .missing.join(", ")
    )]
    InvalidDomain { missing: Vec<String> },

    /// An action was referenced that the catalog does not contain
    #[error("Action '{action}' is not part of the domain")]
    UnknownAction { action: String },

    /// Two actions share a name
    #[error("Action names are not unique! Found two actions with name '{action}'")]
    DuplicateAction { action: String },

    /// Domain file could not be read
    #[error("Failed to read domain file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Domain file is not valid YAML
    #[error("Invalid domain YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// The set of valid intents and the ordered list of valid actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCatalog {
    intents: BTreeSet<String>,
    actions: Vec<String>,
}

/// An intent entry in a domain file: either a bare name or a name with
/// properties (`- greet: {use_entities: true}`). Properties are ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntentEntry {
    Name(String),
    WithProperties(BTreeMap<String, serde_yaml::Value>),
}

#[derive(Debug, Default, Deserialize)]
struct DomainFile {
    #[serde(default)]
    intents: Vec<IntentEntry>,
    #[serde(default)]
    actions: Vec<String>,
}

impl DomainCatalog {
    /// Build a catalog from user intents and actions.
    ///
    /// The default actions are prepended. User actions that share a name
    /// with a default action are dropped so that the defaults keep their
    /// fixed positions.
    pub fn new<I, A>(intents: I, user_actions: A) -> Result<Self, DomainError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let user_actions: Vec<String> = user_actions.into_iter().map(Into::into).collect();
        Self::from_parts(intents, combine_user_with_default_actions(&user_actions))
    }

    /// Build a catalog with exactly the given actions, without defaults.
    pub fn from_parts<I, A>(intents: I, actions: A) -> Result<Self, DomainError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let actions: Vec<String> = actions.into_iter().map(Into::into).collect();
        ensure_action_name_uniqueness(&actions)?;
        Ok(Self {
            intents: intents.into_iter().map(Into::into).collect(),
            actions,
        })
    }

    /// Parse a domain from YAML with `intents:` and `actions:` lists
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DomainError> {
        let file: DomainFile = serde_yaml::from_str(yaml)?;
        let intents = file.intents.into_iter().flat_map(|entry| match entry {
            IntentEntry::Name(name) => vec![name],
            IntentEntry::WithProperties(map) => map.into_keys().collect(),
        });
        Self::new(intents, file.actions)
    }

    /// Load a domain YAML file
    pub fn load(path: &Path) -> Result<Self, DomainError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| DomainError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn intents(&self) -> &BTreeSet<String> {
        &self.intents
    }

    /// Actions in catalog order
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn has_intent(&self, intent: &str) -> bool {
        self.intents.contains(intent)
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    /// Position of `action` in the catalog
    pub fn index_for_action(&self, action: &str) -> Result<usize, DomainError> {
        self.actions
            .iter()
            .position(|a| a == action)
            .ok_or_else(|| DomainError::UnknownAction {
                action: action.to_string(),
            })
    }

    /// Fail with [`DomainError::InvalidDomain`] unless every intent is present
    pub fn require_intents(&self, required: &[&str]) -> Result<(), DomainError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|intent| !self.has_intent(intent))
            .map(|intent| intent.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidDomain { missing })
        }
    }
}

/// Default action names followed by the user actions that do not shadow one.
pub fn combine_user_with_default_actions(user_actions: &[String]) -> Vec<String> {
    DEFAULT_ACTIONS
        .iter()
        .map(|a| a.to_string())
        .chain(
            user_actions
                .iter()
                .filter(|a| !is_default_action(a))
                .cloned(),
        )
        .collect()
}

/// Reject action lists that contain the same name twice
pub fn ensure_action_name_uniqueness(actions: &[String]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(actions.len());
    for action in actions {
        if !seen.insert(action.as_str()) {
            return Err(DomainError::DuplicateAction {
                action: action.clone(),
            });
        }
    }
    Ok(())
}
