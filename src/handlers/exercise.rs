// src/handlers/exercise.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::exercise::{
        CreateExerciseRequest, Difficulty, Exercise, ExerciseListParams, ExerciseSummary,
        UpdateExerciseRequest, validate_question_set,
    },
    utils::jwt::Claims,
};

const SUMMARY_COLUMNS: &str = "id, title, subject, difficulty, question_type, max_score, \
                               is_published, course_id, created_by, created_at";

const FULL_COLUMNS: &str = "id, title, description, subject, difficulty, question_type, \
                            questions, solutions, max_score, pass_threshold, \
                            time_limit_seconds, max_attempts, is_published, course_id, \
                            created_by, created_at, updated_at";

fn apply_filters(builder: &mut QueryBuilder<'_, Sqlite>, params: &ExerciseListParams) {
    if let Some(subject) = &params.subject {
        builder
            .push(" AND subject LIKE ")
            .push_bind(format!("%{}%", subject));
    }
    if let Some(difficulty) = params.difficulty {
        builder.push(" AND difficulty = ").push_bind(difficulty);
    }
    if let Some(question_type) = params.question_type {
        builder
            .push(" AND question_type = ")
            .push_bind(question_type);
    }
    if let Some(course_id) = params.course_id {
        builder.push(" AND course_id = ").push_bind(course_id);
    }
    if let Some(search) = &params.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR description LIKE ")
            .push_bind(pattern.clone())
            .push(" OR subject LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Lists published exercises with filters and pagination.
pub async fn list_exercises(
    State(pool): State<SqlitePool>,
    Query(params): Query<ExerciseListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(10).clamp(1, 100);

    let mut count_builder =
        QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM exercises WHERE is_published = 1");
    apply_filters(&mut count_builder, &params);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count exercises: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM exercises WHERE is_published = 1",
        SUMMARY_COLUMNS
    ));
    apply_filters(&mut builder, &params);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind((page - 1) * per_page);

    let exercises: Vec<ExerciseSummary> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list exercises: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(serde_json::json!({
        "exercises": exercises,
        "total": total,
        "page": page,
        "per_page": per_page,
    })))
}

/// Fetches one exercise. Solutions are never serialized.
///
/// Unpublished exercises are only visible to their creator and admins;
/// everyone else gets 404 so drafts stay invisible.
pub async fn get_exercise(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exercise = fetch_exercise(&pool, id).await?;

    if !exercise.is_published
        && exercise.created_by != claims.user_id()
        && !claims.is_admin()
    {
        return Err(AppError::NotFound("Exercise not found".to_string()));
    }

    Ok(Json(exercise))
}

/// Creates a new exercise. Professor only (enforced by route middleware).
///
/// The question/solution set is validated here, once, so the scorer can
/// treat any inconsistency it meets later as corrupted data.
pub async fn create_exercise(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    validate_question_set(payload.question_type, &payload.questions, &payload.solutions)?;

    let now = chrono::Utc::now();
    let exercise = sqlx::query_as::<_, Exercise>(&format!(
        r#"
        INSERT INTO exercises
            (title, description, subject, difficulty, question_type, questions,
             solutions, max_score, pass_threshold, time_limit_seconds,
             max_attempts, is_published, course_id, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        FULL_COLUMNS
    ))
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.subject)
    .bind(payload.difficulty.unwrap_or(Difficulty::Medium))
    .bind(payload.question_type)
    .bind(sqlx::types::Json(&payload.questions))
    .bind(sqlx::types::Json(&payload.solutions))
    .bind(payload.max_score.unwrap_or(100.0))
    .bind(payload.pass_threshold.unwrap_or(60.0))
    .bind(payload.time_limit_seconds)
    .bind(payload.max_attempts.unwrap_or(1))
    .bind(payload.is_published.unwrap_or(false))
    .bind(payload.course_id)
    .bind(claims.user_id())
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exercise: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "Exercise {} created by user {}",
        exercise.id,
        claims.user_id()
    );
    Ok((StatusCode::CREATED, Json(exercise)))
}

/// Updates an exercise. Only the creating professor (or an admin) may edit.
pub async fn update_exercise(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing = fetch_exercise(&pool, id).await?;
    if existing.created_by != claims.user_id() && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to update this exercise".to_string(),
        ));
    }

    if payload.questions.is_some() != payload.solutions.is_some() {
        return Err(AppError::BadRequest(
            "Questions and solutions must be replaced together".to_string(),
        ));
    }

    let question_type = payload.question_type.unwrap_or(existing.question_type);
    let questions = payload.questions.unwrap_or_else(|| existing.questions.0.clone());
    let solutions = payload.solutions.unwrap_or_else(|| existing.solutions.0.clone());
    validate_question_set(question_type, &questions, &solutions)?;

    let exercise = sqlx::query_as::<_, Exercise>(&format!(
        r#"
        UPDATE exercises SET
            title = ?, description = ?, subject = ?, difficulty = ?,
            question_type = ?, questions = ?, solutions = ?, max_score = ?,
            pass_threshold = ?, time_limit_seconds = ?, max_attempts = ?,
            is_published = ?, course_id = ?, updated_at = ?
        WHERE id = ?
        RETURNING {}
        "#,
        FULL_COLUMNS
    ))
    .bind(payload.title.unwrap_or(existing.title))
    .bind(payload.description.or(existing.description))
    .bind(payload.subject.unwrap_or(existing.subject))
    .bind(payload.difficulty.unwrap_or(existing.difficulty))
    .bind(question_type)
    .bind(sqlx::types::Json(&questions))
    .bind(sqlx::types::Json(&solutions))
    .bind(payload.max_score.unwrap_or(existing.max_score))
    .bind(payload.pass_threshold.unwrap_or(existing.pass_threshold))
    .bind(payload.time_limit_seconds.or(existing.time_limit_seconds))
    .bind(payload.max_attempts.unwrap_or(existing.max_attempts))
    .bind(payload.is_published.unwrap_or(existing.is_published))
    .bind(payload.course_id.or(existing.course_id))
    .bind(chrono::Utc::now())
    .bind(id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update exercise {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("Exercise {} updated", id);
    Ok(Json(exercise))
}

/// Deletes an exercise. Rejected once students have attempted it, so
/// progress history is never orphaned.
pub async fn delete_exercise(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let existing = fetch_exercise(&pool, id).await?;
    if existing.created_by != claims.user_id() && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to delete this exercise".to_string(),
        ));
    }

    let attempts: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM progress_records WHERE exercise_id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await?;
    if attempts > 0 {
        return Err(AppError::Conflict(
            "Exercise has student attempts and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM exercises WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    tracing::info!("Exercise {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_exercise(pool: &SqlitePool, id: i64) -> Result<Exercise, AppError> {
    sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {} FROM exercises WHERE id = ?",
        FULL_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Exercise not found".to_string()))
}
