//! The `autograder show` command.

use std::path::PathBuf;

use anyhow::Result;

use autograder_core::assignment::AssignmentRecord;

pub fn execute(path: PathBuf, prefix: String) -> Result<()> {
    let record = AssignmentRecord::load_json(&path)?;
    println!("{}", record.transcript(&prefix));
    Ok(())
}
