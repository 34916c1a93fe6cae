//! Assignments: an ordered set of questions graded as one submission.
//!
//! Grading is sequential in declared question order. A question that fails,
//! times out or panics scores zero and grading moves on; only API misuse
//! surfaces as an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GradingError;
use crate::question::{Question, Scoresheet};
use crate::submission::{AdditionalData, Submission};

/// Timestamp format used in transcripts.
pub const PRETTY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A collection of questions to be scored.
#[derive(Debug, Clone)]
pub struct Assignment {
    name: String,
    questions: Vec<Question>,
    submission_dir: PathBuf,
    grading_start: Option<DateTime<Utc>>,
    grading_end: Option<DateTime<Utc>>,
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.questions == other.questions
            && self.grading_start == other.grading_start
            && self.grading_end == other.grading_end
    }
}

impl Assignment {
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            name: name.into(),
            questions,
            submission_dir: PathBuf::from("."),
            grading_start: None,
            grading_end: None,
        }
    }

    pub fn with_submission_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.submission_dir = dir.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn submission_dir(&self) -> &Path {
        &self.submission_dir
    }

    pub fn grading_start(&self) -> Option<DateTime<Utc>> {
        self.grading_start
    }

    pub fn grading_end(&self) -> Option<DateTime<Utc>> {
        self.grading_end
    }

    /// Grade every question in order and return the summed score.
    ///
    /// Refuses to start if any question carries results only.
    pub async fn grade(
        &mut self,
        submission: Arc<Submission>,
        additional: Arc<AdditionalData>,
        show_exceptions: bool,
    ) -> Result<i64, GradingError> {
        if let Some(question) = self.questions.iter().find(|q| !q.is_gradeable()) {
            return Err(GradingError::ResultsOnly {
                question: question.name().to_string(),
            });
        }

        tracing::info!(
            assignment = %self.name,
            questions = self.questions.len(),
            "grading started"
        );
        self.grading_start = Some(Utc::now());

        let mut total = 0;
        for question in &mut self.questions {
            total += question
                .grade(
                    Arc::clone(&submission),
                    Arc::clone(&additional),
                    show_exceptions,
                )
                .await?;
        }

        self.grading_end = Some(Utc::now());

        let (_, max) = self.get_score();
        tracing::info!(assignment = %self.name, "grading finished: {total} / {max}");
        Ok(total)
    }

    /// Return `(total score, max score)` over the current question states.
    pub fn get_score(&self) -> (i64, u64) {
        sum_scores(self.questions.iter().map(Question::sheet))
    }

    /// The human-readable grading transcript.
    pub fn report(&self, question_prefix: &str) -> Result<String, GradingError> {
        let (start, end) = self.grading_window()?;
        Ok(render_transcript(
            &self.name,
            start,
            end,
            self.questions.iter().map(Question::sheet),
            question_prefix,
        ))
    }

    /// Convert into the plain record form used for persistence.
    pub fn to_record(&self) -> Result<AssignmentRecord, GradingError> {
        let (start, end) = self.grading_window()?;
        Ok(AssignmentRecord {
            name: self.name.clone(),
            start,
            end,
            questions: self.questions.iter().map(Question::to_record).collect(),
        })
    }

    /// Rebuild a results-only assignment from its record.
    pub fn from_record(record: AssignmentRecord) -> Self {
        let questions = record
            .questions
            .into_iter()
            .map(Question::from_record)
            .collect();

        Self {
            name: record.name,
            questions,
            submission_dir: PathBuf::from("."),
            grading_start: Some(record.start),
            grading_end: Some(record.end),
        }
    }

    fn grading_window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), GradingError> {
        match (self.grading_start, self.grading_end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(GradingError::NotGraded {
                assignment: self.name.clone(),
            }),
        }
    }
}

/// The persisted form of a graded assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub questions: Vec<Scoresheet>,
}

impl AssignmentRecord {
    pub fn get_score(&self) -> (i64, u64) {
        sum_scores(self.questions.iter())
    }

    /// The transcript this record was produced from.
    pub fn transcript(&self, question_prefix: &str) -> String {
        render_transcript(
            &self.name,
            self.start,
            self.end,
            self.questions.iter(),
            question_prefix,
        )
    }

    /// Save the record as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a record from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        let record: AssignmentRecord =
            serde_json::from_str(&content).context("failed to parse result JSON")?;
        Ok(record)
    }
}

fn sum_scores<'a>(sheets: impl Iterator<Item = &'a Scoresheet>) -> (i64, u64) {
    sheets.fold((0, 0), |(total, max), sheet| {
        (total + sheet.score, max + u64::from(sheet.max_points))
    })
}

fn render_transcript<'a>(
    name: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    sheets: impl Iterator<Item = &'a Scoresheet>,
    question_prefix: &str,
) -> String {
    let mut output = vec![
        format!("Autograder transcript for project: {name}."),
        format!(
            "Grading started at {} and ended at {}.",
            start.format(PRETTY_TIMESTAMP_FORMAT),
            end.format(PRETTY_TIMESTAMP_FORMAT)
        ),
    ];

    let mut total = 0;
    let mut max = 0;
    for sheet in sheets {
        total += sheet.score;
        max += u64::from(sheet.max_points);
        output.push(sheet.scoring_report(question_prefix));
    }

    output.push(String::new());
    output.push(format!("Total: {total} / {max}"));
    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::scorer_fn;
    use chrono::TimeZone;

    fn full_credit(name: &str, points: u32) -> Question {
        Question::new(
            name,
            points,
            scorer_fn(|_, _, sheet| {
                sheet.full_credit();
                Ok(())
            }),
        )
    }

    fn raises(name: &str, points: u32) -> Question {
        Question::new(
            name,
            points,
            scorer_fn(|_, _, _| anyhow::bail!("KeyError: 'total'")),
        )
    }

    async fn grade(assignment: &mut Assignment) -> i64 {
        assignment
            .grade(
                Arc::new(Submission::new(".")),
                Arc::new(AdditionalData::new()),
                false,
            )
            .await
            .unwrap()
    }

    #[test]
    fn score_before_grading() {
        let assignment = Assignment::new("hw0", vec![full_credit("A", 3), full_credit("B", 4)]);
        assert_eq!(assignment.get_score(), (0, 7));
    }

    #[test]
    fn report_before_grading_is_usage_error() {
        let assignment = Assignment::new("hw0", vec![full_credit("A", 3)]);
        assert!(matches!(
            assignment.report(""),
            Err(GradingError::NotGraded { .. })
        ));
        assert!(assignment.to_record().is_err());
    }

    #[tokio::test]
    async fn failing_question_does_not_stop_grading() {
        let mut assignment = Assignment::new(
            "hw1",
            vec![full_credit("Add", 1), raises("Sub", 1)],
        );

        let total = grade(&mut assignment).await;
        assert_eq!(total, 1);
        assert_eq!(assignment.get_score(), (1, 2));

        let report = assignment.report("").unwrap();
        assert!(report.starts_with("Autograder transcript for project: hw1."));
        assert!(report.contains("Add: 1 / 1"));
        assert!(report.contains("Sub: 0 / 1\n   Raised an exception"));
        assert!(report.ends_with("\n\nTotal: 1 / 2"));
    }

    #[tokio::test]
    async fn later_questions_still_graded_after_failure() {
        let mut assignment = Assignment::new(
            "hw1",
            vec![raises("First", 2), full_credit("Second", 3), full_credit("Third", 5)],
        );
        assert_eq!(grade(&mut assignment).await, 8);
        assert!(assignment.grading_start().unwrap() <= assignment.grading_end().unwrap());
    }

    #[tokio::test]
    async fn grading_refuses_results_only_questions() {
        let mut assignment = Assignment::new(
            "hw1",
            vec![
                full_credit("Live", 1),
                Question::from_record(Scoresheet::new("Restored", 1)),
            ],
        );
        let err = assignment
            .grade(
                Arc::new(Submission::new(".")),
                Arc::new(AdditionalData::new()),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GradingError::ResultsOnly { question } if question == "Restored"));
        assert!(assignment.grading_start().is_none());
    }

    #[tokio::test]
    async fn record_round_trip_preserves_equality() {
        let mut assignment = Assignment::new(
            "hw2",
            vec![full_credit("Add", 2), raises("Mul", 3), full_credit("Div", 1)],
        );
        grade(&mut assignment).await;

        let record = assignment.to_record().unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let parsed: AssignmentRecord = serde_json::from_str(&json).unwrap();
        let restored = Assignment::from_record(parsed);

        assert_eq!(restored, assignment);
        assert_eq!(restored.get_score(), assignment.get_score());
        assert_eq!(restored.report("Q").unwrap(), assignment.report("Q").unwrap());
        let order: Vec<&str> = restored.questions().iter().map(Question::name).collect();
        assert_eq!(order, vec!["Add", "Mul", "Div"]);
    }

    #[test]
    fn record_json_shape() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 9, 31, 0).unwrap();
        let mut sheet = Scoresheet::new("Add", 5);
        sheet.score = 4;
        sheet.message = "missing edge case".into();

        let record = AssignmentRecord {
            name: "hw3".into(),
            start,
            end,
            questions: vec![sheet],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "hw3");
        assert_eq!(value["start"], "2024-03-01T09:30:00Z");
        assert_eq!(value["questions"][0]["timeout"], 60);
        assert_eq!(value["questions"][0]["score"], 4);

        let transcript = record.transcript("");
        assert!(transcript.contains("Grading started at 2024-03-01 09:30 and ended at 2024-03-01 09:31."));
        assert!(transcript.contains("Add: 4 / 5\n   missing edge case"));
    }

    #[test]
    fn record_accepts_offset_timestamps() {
        let json = r#"{
            "name": "hw4",
            "start": "2024-03-01T09:30:00.123456+00:00",
            "end": "2024-03-01T09:45:00.000001+00:00",
            "questions": [
                {"name": "A", "max_points": 2, "timeout": 60, "score": 2, "message": ""}
            ]
        }"#;
        let record: AssignmentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.get_score(), (2, 2));
        assert!(record.transcript("").ends_with("Total: 2 / 2"));
    }

    #[tokio::test]
    async fn save_and_load_json() {
        let mut assignment = Assignment::new("hw5", vec![full_credit("A", 1)]);
        grade(&mut assignment).await;
        let record = assignment.to_record().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("result.json");
        record.save_json(&path).unwrap();

        let loaded = AssignmentRecord::load_json(&path).unwrap();
        assert_eq!(loaded, record);
    }
}
