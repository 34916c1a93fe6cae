//! The `autograder grade` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use autograder_core::assignment::AssignmentRecord;
use autograder_core::config::load_config_from;
use autograder_core::parser::{parse_assignment, validate_assignment};
use autograder_core::submission::{AdditionalData, Submission};
use autograder_report::write_html_report;
use autograder_runner::{builtin_registry, RunnerSettings};

pub struct GradeArgs {
    pub assignment: PathBuf,
    pub submission: PathBuf,
    pub outpath: Option<PathBuf>,
    pub html: Option<PathBuf>,
    pub prefix: Option<String>,
    pub show_exceptions: bool,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: GradeArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let registry = builtin_registry(RunnerSettings::from_config(&config));

    let submission = Submission::from_dir(&args.submission)?;
    let mut assignment = parse_assignment(&args.assignment, &registry, config.default_timeout_secs)?
        .with_submission_dir(submission.root());

    for w in validate_assignment(&assignment) {
        match &w.question {
            Some(q) => tracing::warn!(question = %q, "{}", w.message),
            None => tracing::warn!("{}", w.message),
        }
    }

    eprintln!(
        "Grading {} ({} questions) against {}",
        assignment.name(),
        assignment.questions().len(),
        assignment.submission_dir().display()
    );

    let show_exceptions = args.show_exceptions || config.show_exceptions;
    assignment
        .grade(
            Arc::new(submission),
            Arc::new(AdditionalData::new()),
            show_exceptions,
        )
        .await?;

    let record = assignment.to_record()?;
    print_summary(&record);

    let prefix = args.prefix.unwrap_or(config.question_prefix);
    println!("{}", record.transcript(&prefix));

    if let Some(path) = &args.outpath {
        record.save_json(path)?;
        eprintln!("Results saved to: {}", path.display());
    }
    if let Some(path) = &args.html {
        write_html_report(&record, path)?;
        eprintln!("HTML transcript: {}", path.display());
    }

    Ok(())
}

fn print_summary(record: &AssignmentRecord) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Question", "Score", "Max", "Status"]);

    for sheet in &record.questions {
        let status = if sheet.score >= i64::from(sheet.max_points) {
            "OK"
        } else if sheet.score > 0 {
            "PARTIAL"
        } else {
            "FAIL"
        };
        table.add_row(vec![
            Cell::new(&sheet.name),
            Cell::new(sheet.score),
            Cell::new(sheet.max_points),
            Cell::new(status),
        ]);
    }

    let (score, max) = record.get_score();
    table.add_row(vec![
        Cell::new("Total"),
        Cell::new(score),
        Cell::new(max),
        Cell::new(""),
    ]);

    eprintln!("\n{table}");
}
