//! Named question kinds and the factories that build their scoring procedures.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;

use crate::question::ScoreQuestion;

/// Builds a scoring procedure from the kind-specific keys of a question entry.
pub type QuestionFactory =
    Arc<dyn Fn(&toml::Table) -> Result<Arc<dyn ScoreQuestion>> + Send + Sync>;

/// Maps question kind names (e.g. `"command"`) to factories.
#[derive(Clone, Default)]
pub struct QuestionRegistry {
    factories: BTreeMap<String, QuestionFactory>,
}

impl std::fmt::Debug for QuestionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl QuestionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `kind`, replacing any previous entry.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&toml::Table) -> Result<Arc<dyn ScoreQuestion>> + Send + Sync + 'static,
    {
        if self
            .factories
            .insert(kind.to_string(), Arc::new(factory))
            .is_some()
        {
            tracing::debug!("question kind '{kind}' re-registered");
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the scoring procedure for a question of `kind`.
    pub fn build(&self, kind: &str, params: &toml::Table) -> Result<Arc<dyn ScoreQuestion>> {
        let Some(factory) = self.factories.get(kind) else {
            anyhow::bail!(
                "unknown question kind '{kind}'. Available: {:?}",
                self.kinds()
            );
        };
        factory(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::scorer_fn;

    #[test]
    fn build_registered_kind() {
        let mut registry = QuestionRegistry::new();
        registry.register("noop", |_| Ok(scorer_fn(|_, _, _| Ok(()))));

        assert!(registry.contains("noop"));
        assert!(registry.build("noop", &toml::Table::new()).is_ok());
    }

    #[test]
    fn unknown_kind_lists_available() {
        let mut registry = QuestionRegistry::new();
        registry.register("files", |_| Ok(scorer_fn(|_, _, _| Ok(()))));
        registry.register("command", |_| Ok(scorer_fn(|_, _, _| Ok(()))));

        let err = registry.build("lint", &toml::Table::new()).err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("unknown question kind 'lint'"));
        assert!(msg.contains("[\"command\", \"files\"]"));
    }

    #[test]
    fn factory_errors_propagate() {
        let mut registry = QuestionRegistry::new();
        registry.register("strict", |params| {
            anyhow::ensure!(params.contains_key("target"), "missing 'target'");
            Ok(scorer_fn(|_, _, _| Ok(())))
        });

        let err = registry.build("strict", &toml::Table::new()).err().unwrap();
        assert!(err.to_string().contains("missing 'target'"));
    }
}
