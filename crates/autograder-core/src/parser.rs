//! TOML assignment file parser.
//!
//! An assignment file names the assignment and lists its questions in grading
//! order. Each question names a registered kind; every key other than the
//! common ones is handed to that kind's factory.
//!
//! ```toml
//! [assignment]
//! name = "HW1"
//!
//! [[questions]]
//! name = "Builds"
//! kind = "command"
//! max_points = 5
//! timeout_secs = 30
//! command = ["make"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::assignment::Assignment;
use crate::question::Question;
use crate::registry::QuestionRegistry;

#[derive(Debug, Deserialize)]
struct TomlAssignmentFile {
    assignment: TomlAssignmentHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlAssignmentHeader {
    name: String,
    #[serde(default)]
    default_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    name: String,
    kind: String,
    max_points: u32,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    params: toml::Table,
}

/// Parse an assignment file into a gradeable [`Assignment`].
pub fn parse_assignment(
    path: &Path,
    registry: &QuestionRegistry,
    default_timeout_secs: u64,
) -> Result<Assignment> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read assignment file: {}", path.display()))?;

    parse_assignment_str(&content, path, registry, default_timeout_secs)
}

/// Parse assignment TOML from a string (useful for testing).
pub fn parse_assignment_str(
    content: &str,
    source_path: &Path,
    registry: &QuestionRegistry,
    default_timeout_secs: u64,
) -> Result<Assignment> {
    let parsed: TomlAssignmentFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    if parsed.questions.is_empty() {
        anyhow::bail!(
            "assignment file ({}) does not contain any questions",
            source_path.display()
        );
    }

    let default_timeout = parsed
        .assignment
        .default_timeout_secs
        .unwrap_or(default_timeout_secs);

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let timeout = q.timeout_secs.unwrap_or(default_timeout);
            anyhow::ensure!(
                timeout > 0,
                "question '{}' has a zero timeout; timeouts must be positive",
                q.name
            );

            let scorer = registry
                .build(&q.kind, &q.params)
                .with_context(|| format!("invalid question '{}'", q.name))?;

            Ok(Question::new(q.name, q.max_points, scorer).with_timeout(timeout))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Assignment::new(parsed.assignment.name, questions))
}

/// A warning from assignment validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question name (if applicable).
    pub question: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check an assignment for likely authoring mistakes.
pub fn validate_assignment(assignment: &Assignment) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for question in assignment.questions() {
        if !seen.insert(question.name()) {
            warnings.push(ValidationWarning {
                question: Some(question.name().to_string()),
                message: format!("duplicate question name: {}", question.name()),
            });
        }
    }

    for question in assignment.questions() {
        if question.max_points() == 0 {
            warnings.push(ValidationWarning {
                question: Some(question.name().to_string()),
                message: "max_points is 0; this question cannot affect the total".into(),
            });
        }
    }

    warnings
}
