// src/models/progress.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Lifecycle of one (student, exercise) attempt record.
///
/// `Completed` and `Submitted` are equivalent terminal states for analytics;
/// the submit endpoint writes `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
    Submitted,
}

impl AttemptStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::Submitted)
    }
}

/// One submitted answer, keyed to a question by index.
/// The response payload is deliberately loose JSON; the evaluator interprets
/// it according to the question type and treats anything unusable as
/// incorrect rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_index: usize,
    pub answer: serde_json::Value,
}

/// Per-question grading outcome returned to the student and stored on the
/// progress record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question_index: usize,
    /// `None` means the question is pending manual grading (essay).
    pub is_correct: Option<bool>,
    pub points_awarded: f64,
    pub explanation: String,
}

/// Result of scoring one submission.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub total_score: f64,
    pub max_score: f64,
    /// total_score as a percentage of max_score, rounded to 2 decimals.
    pub percentage: f64,
    /// `None` while manual grading is pending.
    pub passed: Option<bool>,
    pub requires_manual_grading: bool,
    pub feedback: Vec<QuestionFeedback>,
}

/// Represents the 'progress_records' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProgressRecord {
    pub id: i64,
    pub student_id: i64,
    pub exercise_id: i64,
    pub status: AttemptStatus,
    pub attempts: i64,
    pub time_spent_seconds: i64,
    /// Answers of the best-scoring attempt, kept in lockstep with `score`
    /// and `feedback` so the stored trio always describes one submission.
    pub answers: Option<Json<Vec<SubmittedAnswer>>>,
    /// Best score across attempts. Retained through a re-opened attempt;
    /// `completed_at` is what signals terminality.
    pub score: Option<f64>,
    pub feedback: Option<Json<Vec<QuestionFeedback>>>,
    pub requires_manual_grading: bool,
    pub is_late: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting answers to an exercise.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(length(min = 1, message = "At least one answer is required."))]
    pub answers: Vec<SubmittedAnswer>,
    #[validate(range(min = 0))]
    pub time_spent_seconds: Option<i64>,
}

/// Query parameters for listing the current student's progress.
#[derive(Debug, Deserialize)]
pub struct ProgressListParams {
    pub subject: Option<String>,
    pub status: Option<AttemptStatus>,
}

/// Progress row joined with exercise info, for listings.
#[derive(Debug, Serialize, FromRow)]
pub struct ProgressListEntry {
    pub id: i64,
    pub exercise_id: i64,
    pub exercise_title: String,
    pub subject: String,
    pub status: AttemptStatus,
    pub attempts: i64,
    pub score: Option<f64>,
    pub max_score: f64,
    pub requires_manual_grading: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}
