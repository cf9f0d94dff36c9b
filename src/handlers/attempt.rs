// src/handlers/attempt.rs
//
// Progress Record Manager: owns the per-(student, exercise) attempt state
// machine. All terminal transitions are conditional UPDATEs keyed on the
// observed state, so of two racing submissions exactly one wins and the
// other sees a 409.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::exercise::fetch_exercise,
    models::{
        exercise::Exercise,
        progress::{
            AttemptStatus, ProgressListEntry, ProgressListParams, ProgressRecord,
            SubmitAttemptRequest,
        },
    },
    scoring::score_submission,
    utils::jwt::Claims,
};

const RECORD_COLUMNS: &str = "id, student_id, exercise_id, status, attempts, \
                              time_spent_seconds, answers, score, feedback, \
                              requires_manual_grading, is_late, started_at, completed_at";

/// Starts (or resumes) an attempt on an exercise.
///
/// Idempotent while in progress: a second start returns the existing record
/// unchanged, without counting another attempt. A terminal record is
/// re-opened with `attempts + 1` as long as the exercise's attempt limit
/// allows it.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exercise_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exercise = fetch_exercise(&pool, exercise_id).await?;
    authorize_attempt(&pool, &claims, &exercise).await?;

    let existing = fetch_record(&pool, claims.user_id(), exercise_id).await?;

    let Some(record) = existing else {
        return match insert_record(&pool, claims.user_id(), exercise_id).await {
            Ok(record) => {
                tracing::info!(
                    "Exercise {} started by student {}",
                    exercise_id,
                    claims.user_id()
                );
                Ok((StatusCode::CREATED, Json(record)))
            }
            // A concurrent start inserted first; the UNIQUE constraint
            // coalesces the race and we hand back the winner's record.
            Err(AppError::Conflict(_)) => {
                let record = fetch_record(&pool, claims.user_id(), exercise_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalServerError("Progress record vanished".to_string())
                    })?;
                Ok((StatusCode::OK, Json(record)))
            }
            Err(e) => Err(e),
        };
    };

    if record.status == AttemptStatus::InProgress {
        return Ok((StatusCode::OK, Json(record)));
    }

    if record.attempts >= exercise.max_attempts {
        return Err(AppError::Conflict(format!(
            "Attempt limit reached ({} of {})",
            record.attempts, exercise.max_attempts
        )));
    }

    // Re-open a terminal record. CAS on (status, attempts) so two racing
    // re-starts only count one new attempt. The best score survives the
    // re-open; the completion timestamp does not.
    let reopened = sqlx::query_as::<_, ProgressRecord>(&format!(
        r#"
        UPDATE progress_records
        SET status = 'in_progress', attempts = attempts + 1,
            started_at = ?, completed_at = NULL
        WHERE id = ? AND status = ? AND attempts = ?
        RETURNING {}
        "#,
        RECORD_COLUMNS
    ))
    .bind(chrono::Utc::now())
    .bind(record.id)
    .bind(record.status)
    .bind(record.attempts)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::Conflict(
        "Attempt state changed concurrently".to_string(),
    ))?;

    Ok((StatusCode::OK, Json(reopened)))
}

/// Submits answers for an attempt and returns the scored result.
///
/// Scoring happens before any write, so a scoring failure leaves the record
/// in its prior state. The stored score, answers and feedback all describe
/// the best attempt so far; the response always reflects this submission.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(exercise_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exercise = fetch_exercise(&pool, exercise_id).await?;
    authorize_attempt(&pool, &claims, &exercise).await?;

    let record = fetch_record(&pool, claims.user_id(), exercise_id)
        .await?
        .ok_or(AppError::Conflict(
            "No attempt in progress. Start the exercise first".to_string(),
        ))?;

    let result = score_submission(&exercise, &payload.answers, &config.scoring)?;

    let time_spent = payload.time_spent_seconds.unwrap_or(0);
    // Late submissions are accepted but flagged.
    let is_late = exercise
        .time_limit_seconds
        .map(|limit| time_spent > limit)
        .unwrap_or(false);
    let now = chrono::Utc::now();

    // Answers, feedback and the grading flags travel with the score: when
    // this submission does not beat the stored best, the record keeps the
    // best attempt's columns as one coherent set. The CAS in the WHERE
    // clause makes the observed `record` authoritative.
    let improved = record
        .score
        .map_or(true, |best| result.total_score > best);
    let (answers, feedback, manual, late) = if improved {
        (
            Some(sqlx::types::Json(payload.answers.clone())),
            Some(sqlx::types::Json(result.feedback.clone())),
            result.requires_manual_grading,
            is_late,
        )
    } else {
        (
            record.answers.clone(),
            record.feedback.clone(),
            record.requires_manual_grading,
            record.is_late,
        )
    };

    let rows_affected = match record.status {
        AttemptStatus::InProgress => {
            sqlx::query(
                r#"
                UPDATE progress_records
                SET status = 'completed',
                    score = CASE WHEN score IS NULL OR ? > score THEN ? ELSE score END,
                    answers = ?, feedback = ?, requires_manual_grading = ?,
                    is_late = ?, time_spent_seconds = ?, completed_at = ?
                WHERE id = ? AND status = 'in_progress'
                "#,
            )
            .bind(result.total_score)
            .bind(result.total_score)
            .bind(answers)
            .bind(feedback)
            .bind(manual)
            .bind(late)
            .bind(time_spent)
            .bind(now)
            .bind(record.id)
            .execute(&pool)
            .await?
            .rows_affected()
        }
        AttemptStatus::Completed | AttemptStatus::Submitted => {
            if record.attempts >= exercise.max_attempts {
                return Err(AppError::Conflict(format!(
                    "Attempt limit reached ({} of {})",
                    record.attempts, exercise.max_attempts
                )));
            }
            // Direct re-submission: an implicit in_progress -> completed
            // transition that counts a fresh attempt. CAS on the observed
            // attempt count.
            sqlx::query(
                r#"
                UPDATE progress_records
                SET attempts = attempts + 1,
                    score = CASE WHEN score IS NULL OR ? > score THEN ? ELSE score END,
                    answers = ?, feedback = ?, requires_manual_grading = ?,
                    is_late = ?, time_spent_seconds = ?, completed_at = ?
                WHERE id = ? AND attempts = ?
                      AND status IN ('completed', 'submitted')
                "#,
            )
            .bind(result.total_score)
            .bind(result.total_score)
            .bind(answers)
            .bind(feedback)
            .bind(manual)
            .bind(late)
            .bind(time_spent)
            .bind(now)
            .bind(record.id)
            .bind(record.attempts)
            .execute(&pool)
            .await?
            .rows_affected()
        }
        AttemptStatus::NotStarted => 0,
    };

    if rows_affected == 0 {
        return Err(AppError::Conflict(
            "Attempt was already submitted".to_string(),
        ));
    }

    tracing::info!(
        "Exercise {} submitted by student {}, score {}",
        exercise_id,
        claims.user_id(),
        result.total_score
    );
    Ok(Json(result))
}

/// Lists the current student's progress records, joined with exercise info.
pub async fn list_my_progress(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ProgressListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT p.id, p.exercise_id, e.title AS exercise_title, e.subject, \
                p.status, p.attempts, p.score, e.max_score, \
                p.requires_manual_grading, p.started_at, p.completed_at \
         FROM progress_records p \
         JOIN exercises e ON p.exercise_id = e.id \
         WHERE p.student_id = ",
    );
    builder.push_bind(claims.user_id());

    if let Some(subject) = &params.subject {
        builder
            .push(" AND e.subject LIKE ")
            .push_bind(format!("%{}%", subject));
    }
    if let Some(status) = params.status {
        builder.push(" AND p.status = ").push_bind(status);
    }
    builder.push(" ORDER BY p.started_at DESC");

    let entries: Vec<ProgressListEntry> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list progress: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(entries))
}

/// A student may only attempt published exercises, and only when enrolled in
/// the owning course (if any).
async fn authorize_attempt(
    pool: &SqlitePool,
    claims: &Claims,
    exercise: &Exercise,
) -> Result<(), AppError> {
    if !claims.is_student() {
        return Err(AppError::Forbidden(
            "Only students can attempt exercises".to_string(),
        ));
    }

    if !exercise.is_published {
        return Err(AppError::Forbidden(
            "Exercise is not published".to_string(),
        ));
    }

    if let Some(course_id) = exercise.course_id {
        let enrolled: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = ? AND student_id = ?",
        )
        .bind(course_id)
        .bind(claims.user_id())
        .fetch_one(pool)
        .await?;

        if enrolled == 0 {
            return Err(AppError::Forbidden(
                "Not enrolled in this exercise's course".to_string(),
            ));
        }
    }

    Ok(())
}

async fn fetch_record(
    pool: &SqlitePool,
    student_id: i64,
    exercise_id: i64,
) -> Result<Option<ProgressRecord>, AppError> {
    let record = sqlx::query_as::<_, ProgressRecord>(&format!(
        "SELECT {} FROM progress_records WHERE student_id = ? AND exercise_id = ?",
        RECORD_COLUMNS
    ))
    .bind(student_id)
    .bind(exercise_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

async fn insert_record(
    pool: &SqlitePool,
    student_id: i64,
    exercise_id: i64,
) -> Result<ProgressRecord, AppError> {
    sqlx::query_as::<_, ProgressRecord>(&format!(
        r#"
        INSERT INTO progress_records
            (student_id, exercise_id, status, attempts, started_at)
        VALUES (?, ?, 'in_progress', 1, ?)
        RETURNING {}
        "#,
        RECORD_COLUMNS
    ))
    .bind(student_id)
    .bind(exercise_id)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict("Attempt already exists".to_string())
        } else {
            AppError::from(e)
        }
    })
}
