//! autograder-core: Question scoring, timeout-bounded invocation, and
//! assignment aggregation.
//!
//! This crate defines the grading data model (questions, scoresheets,
//! assignments and their persisted records), the invoker that runs untrusted
//! scoring logic under a deadline, and the loaders that build assignments from
//! TOML files through a registry of question kinds.

pub mod assignment;
pub mod config;
pub mod error;
pub mod invoke;
pub mod parser;
pub mod question;
pub mod registry;
pub mod submission;

pub use assignment::{Assignment, AssignmentRecord};
pub use error::{CheckFailure, GradingError};
pub use question::{scorer_fn, Question, ScoreQuestion, Scoresheet};
pub use registry::QuestionRegistry;
pub use submission::{AdditionalData, Answer, Submission};
