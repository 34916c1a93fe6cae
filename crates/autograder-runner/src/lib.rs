//! autograder-runner: Built-in question kinds that inspect a submission on
//! disk or run commands against it.
//!
//! Commands run in a scratch copy of the submission with sensitive
//! environment variables removed, and are killed when their question's
//! timeout expires.

pub mod command;
pub mod files;
pub mod sandbox;

use autograder_core::config::AutograderConfig;
use autograder_core::registry::QuestionRegistry;

pub use command::CommandQuestion;
pub use files::FilesQuestion;

/// Settings shared by the built-in question kinds.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Environment variables removed before running a command.
    pub scrub_env: Vec<String>,
    /// Cap on command output quoted in a question message.
    pub max_output_bytes: usize,
}

impl RunnerSettings {
    pub fn from_config(config: &AutograderConfig) -> Self {
        Self {
            scrub_env: config.scrub_env.clone(),
            max_output_bytes: config.max_output_bytes,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from_config(&AutograderConfig::default())
    }
}

/// Register the `command` and `files` kinds.
pub fn register_builtin(registry: &mut QuestionRegistry, settings: RunnerSettings) {
    registry.register("command", move |params| {
        CommandQuestion::from_params(params, settings.clone())
    });
    registry.register("files", FilesQuestion::from_params);
}

/// A registry holding only the built-in kinds.
pub fn builtin_registry(settings: RunnerSettings) -> QuestionRegistry {
    let mut registry = QuestionRegistry::new();
    register_builtin(&mut registry, settings);
    registry
}
