use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use fallback_policy::{
    ActionScoreVector, ConfigFlags, ConfigStore, DialogueHistory, DomainCatalog, Policy,
    PolicyConfig, TwoStageFallbackPolicy,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score the next action for a recorded conversation
    Predict {
        /// Domain file (YAML) listing intents and actions
        #[arg(long)]
        domain: PathBuf,

        /// Conversation history as a JSON array of events
        #[arg(long)]
        history: PathBuf,

        /// Directory holding a persisted policy config (defaults if omitted)
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },

    /// Write a policy config into a model directory
    Persist {
        #[arg(long)]
        model_dir: PathBuf,

        /// Minimum NLU confidence (overrides TWO_STAGE_NLU_THRESHOLD)
        #[arg(long)]
        nlu_threshold: Option<f64>,

        /// Score given to the ultimate fallback when nothing else applies
        #[arg(long)]
        core_threshold: Option<f64>,

        /// Action executed once both escalation stages fail
        #[arg(long)]
        fallback_action: Option<String>,
    },

    /// Print the effective config after environment overrides
    ShowConfig {
        #[arg(long)]
        model_dir: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct PredictionReport<'a> {
    policy: &'static str,
    situation: String,
    best_action: Option<&'a str>,
    scores: &'a ActionScoreVector,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Predict {
            domain,
            history,
            model_dir,
        } => predict(domain, history, model_dir),
        Command::Persist {
            model_dir,
            nlu_threshold,
            core_threshold,
            fallback_action,
        } => {
            let config = PolicyConfig::effective(ConfigStore::two_stage(), None, env_lookup)?
                .with_flags(ConfigFlags {
                    nlu_threshold,
                    core_threshold,
                    fallback_action_name: fallback_action,
                })?;

            let policy = TwoStageFallbackPolicy::new(config)?;
            let path = policy
                .persist(&model_dir)
                .with_context(|| format!("failed to persist into {}", model_dir.display()))?;
            info!(path = %path.display(), "Policy config written");
            Ok(())
        }
        Command::ShowConfig { model_dir } => {
            let config = effective_config(Some(model_dir.as_path()))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn predict(domain: PathBuf, history: PathBuf, model_dir: Option<PathBuf>) -> Result<()> {
    let domain = DomainCatalog::load(&domain)
        .with_context(|| format!("failed to load domain {}", domain.display()))?;
    let history = DialogueHistory::load(&history)
        .with_context(|| format!("failed to load history {}", history.display()))?;

    let policy = TwoStageFallbackPolicy::new(effective_config(model_dir.as_deref())?)?;
    info!(
        actions = domain.num_actions(),
        events = history.len(),
        nlu_threshold = policy.config().nlu_threshold,
        "Predicting next action"
    );

    let scores = policy.predict(&history, &domain)?;
    let report = PredictionReport {
        policy: policy.name(),
        situation: policy.situation(&history).to_string(),
        best_action: scores.best().map(|s| s.action.as_str()),
        scores: &scores,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Persisted config (or defaults) with `TWO_STAGE_*` overrides applied
fn effective_config(model_dir: Option<&Path>) -> Result<PolicyConfig> {
    PolicyConfig::effective(ConfigStore::two_stage(), model_dir, env_lookup).with_context(|| {
        match model_dir {
            Some(dir) => format!("failed to load config from {}", dir.display()),
            None => "invalid TWO_STAGE_* override".to_string(),
        }
    })
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
