//! Autograder configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::question::DEFAULT_TIMEOUT_SECS;

/// Top-level autograder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutograderConfig {
    /// Timeout for questions that neither they nor their assignment specify.
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,
    /// Log the full error chain when a scoring procedure fails.
    #[serde(default)]
    pub show_exceptions: bool,
    /// Prefix put in front of every question line of the transcript.
    #[serde(default)]
    pub question_prefix: String,
    /// Environment variables cleared before running submission commands.
    #[serde(default = "default_scrub_env")]
    pub scrub_env: Vec<String>,
    /// Maximum bytes of command output quoted in a question message.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_scrub_env() -> Vec<String> {
    [
        "SSH_AUTH_SOCK",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_SESSION_TOKEN",
        "GITHUB_TOKEN",
        "GH_TOKEN",
        "CARGO_REGISTRY_TOKEN",
        "NPM_TOKEN",
        "DOCKER_HOST",
        "DOCKER_CONFIG",
        "KUBECONFIG",
        "DATABASE_URL",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_output_bytes() -> usize {
    2048
}

impl Default for AutograderConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout(),
            show_exceptions: false,
            question_prefix: String::new(),
            scrub_env: default_scrub_env(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `autograder.toml` in the current directory
/// 2. `~/.config/autograder/config.toml`
///
/// `AUTOGRADER_SHOW_EXCEPTIONS=1` forces exception logging on.
pub fn load_config() -> Result<AutograderConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AutograderConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("autograder.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<AutograderConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => AutograderConfig::default(),
    };

    if let Ok(flag) = std::env::var("AUTOGRADER_SHOW_EXCEPTIONS") {
        config.show_exceptions = matches!(flag.as_str(), "1" | "true" | "yes");
    }

    config.question_prefix = resolve_env_vars(&config.question_prefix);
    config.scrub_env = config
        .scrub_env
        .iter()
        .map(|v| resolve_env_vars(v))
        .collect();

    anyhow::ensure!(
        config.default_timeout_secs > 0,
        "default_timeout_secs must be positive"
    );

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("autograder"))
}
