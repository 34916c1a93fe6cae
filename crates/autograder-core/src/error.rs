//! Grading error types.
//!
//! [`CheckFailure`] describes why a single question scored zero; it is always
//! absorbed into that question's scoresheet. [`GradingError`] is a usage error
//! that surfaces to the caller instead of degrading into a score.

use thiserror::Error;

/// Why a question's scoring procedure did not produce a result.
///
/// The `Display` form is the message recorded on the failed question.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckFailure {
    /// The scoring procedure returned an error or panicked.
    #[error("Raised an exception: {0}")]
    Exception(String),

    /// The scoring procedure ran past its deadline.
    #[error("Timeout ({0} seconds).")]
    Timeout(u64),

    /// The isolation worker failed to produce any result.
    #[error("Error during execution: {0}")]
    Execution(String),
}

/// Programming errors in how the grading API is driven.
#[derive(Debug, Error)]
pub enum GradingError {
    /// The question was rebuilt from a record and has no scoring procedure.
    #[error("question '{question}' carries results only and cannot be graded")]
    ResultsOnly { question: String },

    /// The assignment has not been graded yet, so it has no timestamps.
    #[error("assignment '{assignment}' has not been graded")]
    NotGraded { assignment: String },
}

/// Errors raised by a submission entry point.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The entry point returned an error.
    #[error("entry point '{name}' failed: {source}")]
    EntryPoint {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}
