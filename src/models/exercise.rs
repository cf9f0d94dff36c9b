// src/models/exercise.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Calculation,
    Essay,
}

/// One question inside an exercise. Only multiple_choice questions carry
/// options; everything else is free-form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Stored solution for one question. The variant must agree with the
/// exercise's declared question type; that is checked at authoring time so
/// scoring can treat a mismatch as a data-integrity problem.
///
/// Untagged on purpose: authors write `{"correct_option": 1}`,
/// `{"answer": true}`, `{"answer": 4.0}` or `{"answer": "Paris"}` directly.
/// `Essay` matches the empty object and must stay the last variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Solution {
    MultipleChoice {
        correct_option: usize,
    },
    TrueFalse {
        answer: bool,
    },
    Calculation {
        answer: f64,
    },
    ShortAnswer {
        answer: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        accepted: Vec<String>,
    },
    Essay {},
}

/// Represents the 'exercises' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exercise {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    pub questions: Json<Vec<Question>>,

    /// Never serialized: solutions must not leak to students.
    #[serde(skip_serializing)]
    pub solutions: Json<Vec<Solution>>,

    pub max_score: f64,

    /// Percentage of max_score required to pass.
    pub pass_threshold: f64,

    pub time_limit_seconds: Option<i64>,
    pub max_attempts: i64,
    pub is_published: bool,
    pub course_id: Option<i64>,
    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Listing row for exercise catalogs (no question payloads, no solutions).
#[derive(Debug, Serialize, FromRow)]
pub struct ExerciseSummary {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    pub max_score: f64,
    pub is_published: bool,
    pub course_id: Option<i64>,
    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new exercise.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExerciseRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub subject: String,
    pub difficulty: Option<Difficulty>,
    pub question_type: QuestionType,
    #[validate(length(min = 1))]
    pub questions: Vec<Question>,
    #[validate(length(min = 1))]
    pub solutions: Vec<Solution>,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub max_score: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub pass_threshold: Option<f64>,
    #[validate(range(min = 1, max = 28800))]
    pub time_limit_seconds: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: Option<i64>,
    pub is_published: Option<bool>,
    pub course_id: Option<i64>,
}

/// DTO for updating an exercise. All fields optional; questions and
/// solutions can only be replaced together.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExerciseRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub questions: Option<Vec<Question>>,
    pub solutions: Option<Vec<Solution>>,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub max_score: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub pass_threshold: Option<f64>,
    #[validate(range(min = 1, max = 28800))]
    pub time_limit_seconds: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: Option<i64>,
    pub is_published: Option<bool>,
    pub course_id: Option<i64>,
}

/// Query parameters for listing exercises.
#[derive(Debug, Deserialize)]
pub struct ExerciseListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub course_id: Option<i64>,
    pub search: Option<String>,
}

/// Cross-field validation of an exercise's question/solution set.
///
/// Enforced at authoring time so the scorer can assume well-formed content:
/// parallel lengths, solution variants agreeing with the declared question
/// type, option lists of at least two entries with an in-range correct index.
pub fn validate_question_set(
    question_type: QuestionType,
    questions: &[Question],
    solutions: &[Solution],
) -> Result<(), AppError> {
    if questions.len() != solutions.len() {
        return Err(AppError::BadRequest(format!(
            "Number of questions ({}) must match number of solutions ({})",
            questions.len(),
            solutions.len()
        )));
    }

    for (i, (question, solution)) in questions.iter().zip(solutions.iter()).enumerate() {
        if question.text.trim().is_empty() {
            return Err(AppError::BadRequest(format!(
                "Question {} must have non-empty text",
                i + 1
            )));
        }

        match (question_type, solution) {
            (QuestionType::MultipleChoice, Solution::MultipleChoice { correct_option }) => {
                let options = question.options.as_deref().unwrap_or(&[]);
                if options.len() < 2 {
                    return Err(AppError::BadRequest(format!(
                        "Multiple choice question {} must have at least 2 options",
                        i + 1
                    )));
                }
                if *correct_option >= options.len() {
                    return Err(AppError::BadRequest(format!(
                        "Solution {} has correct_option {} out of range (0..{})",
                        i + 1,
                        correct_option,
                        options.len()
                    )));
                }
            }
            (QuestionType::TrueFalse, Solution::TrueFalse { .. }) => {}
            (QuestionType::Calculation, Solution::Calculation { answer }) => {
                if !answer.is_finite() {
                    return Err(AppError::BadRequest(format!(
                        "Solution {} must have a finite numeric answer",
                        i + 1
                    )));
                }
            }
            (QuestionType::ShortAnswer, Solution::ShortAnswer { answer, .. }) => {
                if answer.trim().is_empty() {
                    return Err(AppError::BadRequest(format!(
                        "Solution {} must have a non-empty answer",
                        i + 1
                    )));
                }
            }
            (QuestionType::Essay, Solution::Essay {}) => {}
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Solution {} does not match question type",
                    i + 1
                )));
            }
        }
    }

    Ok(())
}
