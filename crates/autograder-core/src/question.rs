//! Questions: independently scored checks against a submission.
//!
//! A [`Question`] pairs a [`Scoresheet`] (the serializable score and message)
//! with an optional [`ScoreQuestion`] procedure. Grading hands the procedure a
//! private copy of the scoresheet on a timeout-bounded worker and adopts the
//! copy's score and message only if the procedure finishes cleanly.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CheckFailure, GradingError};
use crate::invoke::{invoke_with_timeout, Invocation};
use crate::submission::{AdditionalData, Answer, Submission};

/// Default per-question time budget in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Scoring logic for one kind of question.
#[async_trait]
pub trait ScoreQuestion: Send + Sync {
    /// Assign a score to `sheet` by inspecting `submission`.
    ///
    /// Only `sheet` may be changed, through [`Scoresheet::fail`],
    /// [`Scoresheet::full_credit`] and [`Scoresheet::add_message`]. Returning
    /// `Err` fails the question with the error's description.
    async fn score_question(
        &self,
        submission: &Submission,
        additional: &AdditionalData,
        sheet: &mut Scoresheet,
    ) -> anyhow::Result<()>;
}

/// Adapts a synchronous closure into a [`ScoreQuestion`].
pub struct FnScorer<F>(F);

/// Wrap `f` as a shareable scoring procedure.
pub fn scorer_fn<F>(f: F) -> Arc<dyn ScoreQuestion>
where
    F: Fn(&Submission, &AdditionalData, &mut Scoresheet) -> anyhow::Result<()>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnScorer(f))
}

#[async_trait]
impl<F> ScoreQuestion for FnScorer<F>
where
    F: Fn(&Submission, &AdditionalData, &mut Scoresheet) -> anyhow::Result<()>
        + Send
        + Sync
        + 'static,
{
    async fn score_question(
        &self,
        submission: &Submission,
        additional: &AdditionalData,
        sheet: &mut Scoresheet,
    ) -> anyhow::Result<()> {
        (self.0)(submission, additional, sheet)
    }
}

/// Values that can signal an unimplemented submission entry point.
pub trait Unimplemented {
    /// The failure message when the value means "not implemented".
    fn unimplemented_message(&self) -> Option<&'static str>;
}

impl Unimplemented for Answer {
    fn unimplemented_message(&self) -> Option<&'static str> {
        match self {
            Answer::NotImplemented => Some("NotImplemented returned."),
            Answer::Value(v) => v.unimplemented_message(),
        }
    }
}

impl Unimplemented for Value {
    fn unimplemented_message(&self) -> Option<&'static str> {
        self.is_null().then_some("None returned.")
    }
}

impl<T> Unimplemented for Option<T> {
    fn unimplemented_message(&self) -> Option<&'static str> {
        self.is_none().then_some("None returned.")
    }
}

/// The score and message of one question.
///
/// This is also the record form of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoresheet {
    pub name: String,
    pub max_points: u32,
    /// Time budget in seconds.
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,
    pub score: i64,
    pub message: String,
}

impl Scoresheet {
    pub fn new(name: impl Into<String>, max_points: u32) -> Self {
        Self {
            name: name.into(),
            max_points,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            score: 0,
            message: String::new(),
        }
    }

    /// Fail outright: no partial credit.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.score = 0;
        self.message = message.into();
    }

    pub fn full_credit(&mut self) {
        self.score = i64::from(self.max_points);
    }

    /// Append a message line and adjust the score by `delta`.
    ///
    /// The score is not clamped to `0..=max_points`.
    pub fn add_message(&mut self, message: &str, delta: i64) {
        if !self.message.is_empty() {
            self.message.push('\n');
        }
        self.message.push_str(message);
        self.score += delta;
    }

    /// Fail the question if `value` means "not implemented".
    ///
    /// Returns `true` when the question was failed; the caller should stop
    /// scoring.
    pub fn check_not_implemented<V: Unimplemented + ?Sized>(&mut self, value: &V) -> bool {
        match value.unimplemented_message() {
            Some(message) => {
                self.fail(message);
                true
            }
            None => false,
        }
    }

    /// Render `"<prefix><name>: <score> / <max>"` and the indented message.
    pub fn scoring_report(&self, prefix: &str) -> String {
        let mut prefix = prefix.to_string();
        if !prefix.is_empty() && !prefix.ends_with(' ') {
            prefix.push(' ');
        }

        let mut lines = vec![format!(
            "{prefix}{}: {} / {}",
            self.name, self.score, self.max_points
        )];
        if !self.message.is_empty() {
            lines.extend(self.message.split('\n').map(|line| format!("   {line}")));
        }
        lines.join("\n")
    }
}

/// A gradeable unit: a scoresheet plus the procedure that fills it in.
#[derive(Clone)]
pub struct Question {
    sheet: Scoresheet,
    scorer: Option<Arc<dyn ScoreQuestion>>,
}

impl fmt::Debug for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Question")
            .field("sheet", &self.sheet)
            .field("gradeable", &self.scorer.is_some())
            .finish()
    }
}

impl PartialEq for Question {
    fn eq(&self, other: &Self) -> bool {
        self.sheet == other.sheet
    }
}

impl Question {
    pub fn new(name: impl Into<String>, max_points: u32, scorer: Arc<dyn ScoreQuestion>) -> Self {
        Self {
            sheet: Scoresheet::new(name, max_points),
            scorer: Some(scorer),
        }
    }

    /// Override the default time budget. Zero is raised to one second.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.sheet.timeout_secs = timeout_secs.max(1);
        self
    }

    /// Rebuild a results-only question from its record.
    pub fn from_record(sheet: Scoresheet) -> Self {
        Self {
            sheet,
            scorer: None,
        }
    }

    pub fn to_record(&self) -> Scoresheet {
        self.sheet.clone()
    }

    pub fn name(&self) -> &str {
        &self.sheet.name
    }

    pub fn max_points(&self) -> u32 {
        self.sheet.max_points
    }

    pub fn timeout_secs(&self) -> u64 {
        self.sheet.timeout_secs
    }

    pub fn score(&self) -> i64 {
        self.sheet.score
    }

    pub fn message(&self) -> &str {
        &self.sheet.message
    }

    pub fn sheet(&self) -> &Scoresheet {
        &self.sheet
    }

    /// Whether this question has a scoring procedure.
    pub fn is_gradeable(&self) -> bool {
        self.scorer.is_some()
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.sheet.fail(message);
    }

    pub fn full_credit(&mut self) {
        self.sheet.full_credit();
    }

    pub fn add_message(&mut self, message: &str, delta: i64) {
        self.sheet.add_message(message, delta);
    }

    pub fn check_not_implemented<V: Unimplemented + ?Sized>(&mut self, value: &V) -> bool {
        self.sheet.check_not_implemented(value)
    }

    pub fn scoring_report(&self, prefix: &str) -> String {
        self.sheet.scoring_report(prefix)
    }

    /// Run the scoring procedure under this question's timeout.
    ///
    /// Failures inside the procedure zero the score and are recorded in the
    /// message; only grading a results-only question is an error.
    pub async fn grade(
        &mut self,
        submission: Arc<Submission>,
        additional: Arc<AdditionalData>,
        show_exceptions: bool,
    ) -> Result<i64, GradingError> {
        let scorer = self
            .scorer
            .clone()
            .ok_or_else(|| GradingError::ResultsOnly {
                question: self.sheet.name.clone(),
            })?;

        tracing::debug!(question = %self.sheet.name, "scoring");

        let mut sheet = self.sheet.clone();
        let timeout = Duration::from_secs(self.sheet.timeout_secs);
        let outcome = invoke_with_timeout(timeout, async move {
            scorer
                .score_question(&submission, &additional, &mut sheet)
                .await?;
            Ok::<_, anyhow::Error>((sheet.score, sheet.message))
        })
        .await;

        Ok(self.settle(outcome, show_exceptions))
    }

    /// Apply the outcome of one scoring run to this question's scoresheet.
    fn settle(
        &mut self,
        outcome: anyhow::Result<Invocation<(i64, String)>>,
        show_exceptions: bool,
    ) -> i64 {
        let failure = match outcome {
            Ok(Invocation::Completed((score, message))) => {
                self.sheet.score = score;
                self.sheet.message = message;
                tracing::info!(
                    question = %self.sheet.name,
                    "scored {} / {}",
                    score,
                    self.sheet.max_points
                );
                return score;
            }
            Ok(Invocation::TimedOut) => CheckFailure::Timeout(self.sheet.timeout_secs),
            Ok(Invocation::Failed(reason)) => CheckFailure::Execution(reason),
            Err(e) => {
                if show_exceptions {
                    tracing::error!(question = %self.sheet.name, "scoring raised: {e:?}");
                }
                CheckFailure::Exception(format!("{e:#}"))
            }
        };

        tracing::warn!(question = %self.sheet.name, "{failure}");
        self.sheet.fail(failure.to_string());
        0
    }
}
