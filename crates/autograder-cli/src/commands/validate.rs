//! The `autograder validate` command.

use std::path::PathBuf;

use anyhow::Result;

use autograder_core::config::load_config;
use autograder_core::parser::{parse_assignment, validate_assignment};
use autograder_runner::{builtin_registry, RunnerSettings};

pub fn execute(assignment_path: PathBuf) -> Result<()> {
    let config = load_config()?;
    let registry = builtin_registry(RunnerSettings::from_config(&config));
    let assignment = parse_assignment(&assignment_path, &registry, config.default_timeout_secs)?;

    let (_, max) = assignment.get_score();
    println!(
        "Assignment: {} ({} questions, {} points)",
        assignment.name(),
        assignment.questions().len(),
        max
    );

    let warnings = validate_assignment(&assignment);
    for w in &warnings {
        let prefix = w
            .question
            .as_ref()
            .map(|name| format!("  [{name}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Assignment valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
