// src/scoring/scorer.rs

use crate::{
    config::ScoringConfig,
    error::AppError,
    models::{
        exercise::Exercise,
        progress::{QuestionFeedback, ScoreResult, SubmittedAnswer},
    },
    scoring::evaluator::evaluate,
};

/// Scores a full submission against an exercise.
///
/// Every question carries equal weight (`max_score / len(questions)`). A
/// question with no matching submitted answer earns zero credit. Essay
/// questions contribute zero to the automated total and flip
/// `requires_manual_grading`, which downstream analytics use to exclude the
/// attempt from score averages until regraded.
///
/// The total is clamped to `[0, max_score]` and rounded half-away-from-zero
/// to 2 decimals, so scoring the same submission twice always yields the
/// identical result.
pub fn score_submission(
    exercise: &Exercise,
    answers: &[SubmittedAnswer],
    scoring: &ScoringConfig,
) -> Result<ScoreResult, AppError> {
    let questions = &exercise.questions.0;
    let solutions = &exercise.solutions.0;

    if questions.is_empty() || questions.len() != solutions.len() {
        return Err(AppError::Configuration(format!(
            "Exercise {} has {} questions but {} solutions",
            exercise.id,
            questions.len(),
            solutions.len()
        )));
    }

    let weight = exercise.max_score / questions.len() as f64;

    let mut total = 0.0;
    let mut requires_manual_grading = false;
    let mut feedback = Vec::with_capacity(questions.len());

    for (index, solution) in solutions.iter().enumerate() {
        // First matching answer wins; duplicates and out-of-range indices
        // are ignored rather than rejected.
        let answer = answers
            .iter()
            .find(|a| a.question_index == index)
            .map(|a| &a.answer);

        let verdict = evaluate(exercise.question_type, answer, solution, scoring)?;

        let points = round2(verdict.partial_score * weight);
        total += verdict.partial_score * weight;

        let explanation = match verdict.is_correct {
            Some(true) => "Correct".to_string(),
            Some(false) if answer.is_none() => "Not answered".to_string(),
            Some(false) => "Incorrect".to_string(),
            None => {
                requires_manual_grading = true;
                "Pending manual grading".to_string()
            }
        };

        feedback.push(QuestionFeedback {
            question_index: index,
            is_correct: verdict.is_correct,
            points_awarded: points,
            explanation,
        });
    }

    let total_score = round2(total.clamp(0.0, exercise.max_score));
    let percentage = if exercise.max_score > 0.0 {
        round2(total_score / exercise.max_score * 100.0)
    } else {
        0.0
    };

    let passed = if requires_manual_grading {
        None
    } else {
        Some(percentage >= exercise.pass_threshold)
    };

    Ok(ScoreResult {
        total_score,
        max_score: exercise.max_score,
        percentage,
        passed,
        requires_manual_grading,
        feedback,
    })
}

/// Fixed rounding policy: half away from zero, 2 decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
