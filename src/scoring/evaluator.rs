// src/scoring/evaluator.rs

use serde_json::Value;

use crate::{
    config::ScoringConfig,
    error::AppError,
    models::exercise::{QuestionType, Solution},
};

/// Correctness verdict for a single question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// `None` means ungraded (essay, pending manual review).
    pub is_correct: Option<bool>,
    /// Fractional credit in [0, 1].
    pub partial_score: f64,
}

impl Verdict {
    fn correct() -> Self {
        Verdict {
            is_correct: Some(true),
            partial_score: 1.0,
        }
    }

    fn incorrect() -> Self {
        Verdict {
            is_correct: Some(false),
            partial_score: 0.0,
        }
    }

    fn ungraded() -> Self {
        Verdict {
            is_correct: None,
            partial_score: 0.0,
        }
    }
}

/// Evaluates one submitted answer against the stored solution.
///
/// Pure function: no side effects, no hidden state. Unusable student input
/// (missing, wrong JSON shape, non-numeric where a number is expected) is
/// simply incorrect; only a solution that does not match the declared
/// question type is an error, since that indicates broken exercise data.
pub fn evaluate(
    question_type: QuestionType,
    answer: Option<&Value>,
    solution: &Solution,
    scoring: &ScoringConfig,
) -> Result<Verdict, AppError> {
    // Null is indistinguishable from "not answered".
    let answer = answer.filter(|v| !v.is_null());

    let verdict = match (question_type, solution) {
        (QuestionType::MultipleChoice, Solution::MultipleChoice { correct_option }) => {
            match answer.and_then(selected_index) {
                Some(selected) if selected == *correct_option => Verdict::correct(),
                _ => Verdict::incorrect(),
            }
        }
        (QuestionType::TrueFalse, Solution::TrueFalse { answer: expected }) => {
            match answer.and_then(Value::as_bool) {
                Some(submitted) if submitted == *expected => Verdict::correct(),
                _ => Verdict::incorrect(),
            }
        }
        (QuestionType::Calculation, Solution::Calculation { answer: expected }) => {
            match answer.and_then(numeric_value) {
                Some(submitted) => {
                    let allowed = scoring
                        .absolute_tolerance
                        .max(scoring.relative_tolerance * expected.abs());
                    if (submitted - expected).abs() <= allowed {
                        Verdict::correct()
                    } else {
                        Verdict::incorrect()
                    }
                }
                None => Verdict::incorrect(),
            }
        }
        (QuestionType::ShortAnswer, Solution::ShortAnswer { answer: expected, accepted }) => {
            match answer.and_then(Value::as_str) {
                Some(submitted) => {
                    let submitted = normalize(submitted);
                    let matched = std::iter::once(expected.as_str())
                        .chain(accepted.iter().map(String::as_str))
                        .any(|variant| normalize(variant) == submitted);
                    if matched {
                        Verdict::correct()
                    } else {
                        Verdict::incorrect()
                    }
                }
                None => Verdict::incorrect(),
            }
        }
        (QuestionType::Essay, Solution::Essay {}) => Verdict::ungraded(),
        (question_type, _) => {
            return Err(AppError::Configuration(format!(
                "Solution variant does not match question type {:?}",
                question_type
            )));
        }
    };

    Ok(verdict)
}

/// Extracts a selected option index. Negative numbers are not an index.
fn selected_index(value: &Value) -> Option<usize> {
    value.as_u64().map(|v| v as usize)
}

/// Accepts JSON numbers as well as numeric strings ("3.14").
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Case-insensitive, whitespace-normalized comparison key.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
