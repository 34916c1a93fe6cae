//! The graded artifact and the extra values handed to every scoring procedure.
//!
//! A [`Submission`] is read-only once grading starts: scoring procedures get a
//! shared reference to it and look up the student's entry points by name.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SubmissionError;

/// A callable provided by the student, invoked with JSON arguments.
pub type EntryPoint = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// What came back from calling into the submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The entry point ran and returned a value (possibly `null`).
    Value(Value),
    /// The entry point is missing or is a template stub.
    NotImplemented,
}

impl Answer {
    /// The returned value, if the entry point was implemented.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Answer::Value(v) => Some(v),
            Answer::NotImplemented => None,
        }
    }
}

/// A student submission: a directory on disk plus named entry points.
#[derive(Clone, Default)]
pub struct Submission {
    root: PathBuf,
    entry_points: HashMap<String, Option<EntryPoint>>,
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entry_points.keys().collect();
        names.sort();
        f.debug_struct("Submission")
            .field("root", &self.root)
            .field("entry_points", &names)
            .finish()
    }
}

impl Submission {
    /// A submission rooted at `root` with no entry points.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entry_points: HashMap::new(),
        }
    }

    /// Open a submission directory, failing if it does not exist.
    pub fn from_dir(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("submission not found: {}", root.display()))?;
        anyhow::ensure!(
            root.is_dir(),
            "submission is not a directory: {}",
            root.display()
        );
        Ok(Self::new(root))
    }

    /// Register an entry point under `name`.
    pub fn with_entry_point<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.entry_points.insert(name.to_string(), Some(Arc::new(f)));
        self
    }

    /// Register `name` as present but unimplemented (a template stub).
    pub fn with_stub(mut self, name: &str) -> Self {
        self.entry_points.insert(name.to_string(), None);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `name` is registered with a real implementation.
    pub fn implements(&self, name: &str) -> bool {
        matches!(self.entry_points.get(name), Some(Some(_)))
    }

    /// Call the entry point `name`.
    ///
    /// Missing entry points and stubs yield [`Answer::NotImplemented`]; an
    /// error from the entry point itself is returned as `Err`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Answer> {
        let Some(Some(entry)) = self.entry_points.get(name) else {
            return Ok(Answer::NotImplemented);
        };

        let value = entry(args).map_err(|source| SubmissionError::EntryPoint {
            name: name.to_string(),
            source,
        })?;
        Ok(Answer::Value(value))
    }
}

/// Extra named values forwarded to every scoring procedure.
///
/// Shared read-only across all questions of a grading pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdditionalData {
    values: BTreeMap<String, Value>,
}

impl AdditionalData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserialize the value under `key`, if present.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.values
            .get(key)
            .map(|v| {
                serde_json::from_value(v.clone())
                    .with_context(|| format!("additional data '{key}' has the wrong shape"))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adder() -> Submission {
        Submission::new("/tmp/sub").with_entry_point("add", |args| {
            let a = args.first().and_then(Value::as_i64).unwrap_or(0);
            let b = args.get(1).and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(a + b))
        })
    }

    #[test]
    fn call_registered_entry_point() {
        let sub = adder();
        let answer = sub.call("add", &[json!(2), json!(3)]).unwrap();
        assert_eq!(answer, Answer::Value(json!(5)));
        assert!(sub.implements("add"));
    }

    #[test]
    fn missing_and_stub_entry_points_are_not_implemented() {
        let sub = adder().with_stub("sub");
        assert_eq!(sub.call("mul", &[]).unwrap(), Answer::NotImplemented);
        assert_eq!(sub.call("sub", &[]).unwrap(), Answer::NotImplemented);
        assert!(!sub.implements("sub"));
    }

    #[test]
    fn entry_point_error_names_the_entry_point() {
        let sub = Submission::new(".").with_entry_point("div", |_| anyhow::bail!("division by zero"));
        let err = sub.call("div", &[]).unwrap_err();
        assert!(err.to_string().contains("'div'"));
    }

    #[test]
    fn additional_data_typed_lookup() {
        let data = AdditionalData::new().with("cases", json!([1, 2, 3]));
        let cases: Vec<i64> = data.get_as("cases").unwrap().unwrap();
        assert_eq!(cases, vec![1, 2, 3]);
        assert!(data.get_as::<Vec<i64>>("missing").unwrap().is_none());
        assert!(data.get_as::<String>("cases").is_err());
    }
}
