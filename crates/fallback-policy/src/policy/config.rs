//! Policy configuration and its flat-file store
//!
//! Each policy persists one flat JSON record under a model directory:
//!
//! ```text
//! <dir>/two_stage_fallback_policy.json
//! {
//!   "nlu_threshold": 0.3,
//!   "core_threshold": 0.3,
//!   "fallback_action_name": "action_default_fallback"
//! }
//! ```
//!
//! Missing keys take their defaults, unknown keys are ignored and a missing
//! file loads as the default config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::constants::{
    ACTION_DEFAULT_FALLBACK_NAME, DEFAULT_CORE_THRESHOLD, DEFAULT_NLU_THRESHOLD,
};

/// File name of the two-stage policy record
pub const TWO_STAGE_CONFIG_FILE: &str = "two_stage_fallback_policy.json";

/// File name of the baseline fallback policy record
pub const FALLBACK_CONFIG_FILE: &str = "fallback_policy.json";

/// Environment variable overriding `nlu_threshold`
pub const ENV_NLU_THRESHOLD: &str = "TWO_STAGE_NLU_THRESHOLD";
/// Environment variable overriding `core_threshold`
pub const ENV_CORE_THRESHOLD: &str = "TWO_STAGE_CORE_THRESHOLD";
/// Environment variable overriding `fallback_action_name`
pub const ENV_FALLBACK_ACTION: &str = "TWO_STAGE_FALLBACK_ACTION";

/// Errors from loading, saving or validating a config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Thresholds and fallback action shared by the fallback policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// NLU confidence below this counts as low confidence
    pub nlu_threshold: f64,
    /// Score given to the baseline recommendation when NLU is confident
    pub core_threshold: f64,
    /// Ultimate fallback, executed when escalation gives up
    pub fallback_action_name: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            nlu_threshold: DEFAULT_NLU_THRESHOLD,
            core_threshold: DEFAULT_CORE_THRESHOLD,
            fallback_action_name: ACTION_DEFAULT_FALLBACK_NAME.to_string(),
        }
    }
}

/// Values given explicitly for one invocation, such as command-line flags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFlags {
    pub nlu_threshold: Option<f64>,
    pub core_threshold: Option<f64>,
    pub fallback_action_name: Option<String>,
}

impl PolicyConfig {
    /// Effective config for a model directory.
    ///
    /// Precedence, lowest first: defaults, the record `store` keeps under
    /// `dir`, then `TWO_STAGE_*` values from `lookup`. Without a directory
    /// the defaults stand in for the record.
    pub fn effective(
        store: ConfigStore,
        dir: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let base = match dir {
            Some(dir) => store.load(dir)?,
            None => Self::default(),
        };
        base.with_overrides_from(lookup)
    }

    /// Apply explicit flags on top of this config
    pub fn with_flags(mut self, flags: ConfigFlags) -> Result<Self, ConfigError> {
        if let Some(value) = flags.nlu_threshold {
            self.nlu_threshold = value;
        }
        if let Some(value) = flags.core_threshold {
            self.core_threshold = value;
        }
        if let Some(name) = flags.fallback_action_name {
            self.fallback_action_name = name;
        }
        self.validate()?;
        Ok(self)
    }

    /// Thresholds must be finite and within [0, 1]; the fallback action
    /// needs a name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("nlu_threshold", self.nlu_threshold)?;
        check_threshold("core_threshold", self.core_threshold)?;
        if self.fallback_action_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "fallback_action_name",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Apply `TWO_STAGE_*` overrides from a key lookup such as
    /// `std::env::var`
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_NLU_THRESHOLD) {
            self.nlu_threshold = parse_threshold("nlu_threshold", &raw)?;
        }
        if let Some(raw) = lookup(ENV_CORE_THRESHOLD) {
            self.core_threshold = parse_threshold("core_threshold", &raw)?;
        }
        if let Some(name) = lookup(ENV_FALLBACK_ACTION) {
            self.fallback_action_name = name;
        }
        self.validate()?;
        Ok(self)
    }
}

fn check_threshold(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("{} is outside [0, 1]", value),
        })
    }
}

fn parse_threshold(field: &'static str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim().parse::<f64>().map_err(|e| ConfigError::Invalid {
        field,
        message: format!("'{}' is not a number: {}", raw, e),
    })
}

/// Saves and loads a [`PolicyConfig`] record under a model directory
#[derive(Debug, Clone, Copy)]
pub struct ConfigStore {
    file_name: &'static str,
}

impl ConfigStore {
    pub const fn new(file_name: &'static str) -> Self {
        Self { file_name }
    }

    /// Store for the two-stage fallback policy
    pub const fn two_stage() -> Self {
        Self::new(TWO_STAGE_CONFIG_FILE)
    }

    /// Store for the baseline fallback policy
    pub const fn baseline() -> Self {
        Self::new(FALLBACK_CONFIG_FILE)
    }

    /// Location of the record under `dir`
    pub fn file_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name)
    }

    /// Write `config` under `dir`, creating missing directories
    pub fn save(&self, dir: &Path, config: &PolicyConfig) -> Result<PathBuf, ConfigError> {
        let path = self.file_path(dir);
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Persisted policy config");
        Ok(path)
    }

    /// Read the record under `dir`, or the defaults when there is none
    pub fn load(&self, dir: &Path) -> Result<PolicyConfig, ConfigError> {
        let path = self.file_path(dir);
        if !path.is_file() {
            debug!(path = %path.display(), "No persisted policy config, using defaults");
            return Ok(PolicyConfig::default());
        }

        let json = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: PolicyConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Json {
                path: path.clone(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}
