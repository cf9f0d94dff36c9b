// src/handlers/dashboard.rs
//
// Analytics endpoints. Handlers fetch one consistent set of joined rows and
// hand them to the pure aggregator; nothing here mutates progress data.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    analytics::aggregate,
    error::AppError,
    models::analytics::{AttemptRow, DashboardParams},
    utils::jwt::Claims,
};

/// Analytics for the current student's own attempts.
pub async fn my_dashboard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<DashboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = fetch_attempt_rows(&pool, Some(claims.user_id()), None, &params).await?;
    let snapshot = aggregate(&rows, params.group_by.unwrap_or_default());
    Ok(Json(snapshot))
}

/// Analytics for one student. Professor/admin only (route middleware).
pub async fn student_dashboard(
    State(pool): State<SqlitePool>,
    Path(student_id): Path<i64>,
    Query(params): Query<DashboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(student_id)
        .fetch_one(&pool)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    let rows = fetch_attempt_rows(&pool, Some(student_id), None, &params).await?;
    let snapshot = aggregate(&rows, params.group_by.unwrap_or_default());
    Ok(Json(snapshot))
}

/// Class-level analytics. Professors see attempts on their own exercises;
/// admins see everything the filters select.
pub async fn class_dashboard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<DashboardParams>,
) -> Result<impl IntoResponse, AppError> {
    if let (Some(course_id), false) = (params.course_id, claims.is_admin()) {
        let owner: Option<i64> =
            sqlx::query_scalar("SELECT professor_id FROM courses WHERE id = ?")
                .bind(course_id)
                .fetch_optional(&pool)
                .await?;
        if owner != Some(claims.user_id()) {
            return Err(AppError::Forbidden(
                "Not authorized to view this course's analytics".to_string(),
            ));
        }
    }

    let creator_scope = if claims.is_admin() {
        None
    } else {
        Some(claims.user_id())
    };

    let rows = fetch_attempt_rows(&pool, None, creator_scope, &params).await?;
    let snapshot = aggregate(&rows, params.group_by.unwrap_or_default());
    Ok(Json(snapshot))
}

/// System-wide overview. Admin only (route middleware).
pub async fn overview_dashboard(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    let total_students: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'student'")
            .fetch_one(&pool)
            .await?;
    let total_professors: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'professor'")
            .fetch_one(&pool)
            .await?;
    let total_exercises: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercises")
        .fetch_one(&pool)
        .await?;
    let total_submissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM progress_records")
        .fetch_one(&pool)
        .await?;

    let month_ago = chrono::Utc::now() - chrono::Duration::days(30);
    let recent_registrations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= ?")
            .bind(month_ago)
            .fetch_one(&pool)
            .await?;
    let recent_exercises: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE created_at >= ?")
            .bind(month_ago)
            .fetch_one(&pool)
            .await?;
    let recent_submissions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM progress_records WHERE started_at >= ?")
            .bind(month_ago)
            .fetch_one(&pool)
            .await?;

    let popular_subjects: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT e.subject, COUNT(p.id) AS attempts
        FROM progress_records p
        JOIN exercises e ON p.exercise_id = e.id
        GROUP BY e.subject
        ORDER BY attempts DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let popular_subjects: Vec<serde_json::Value> = popular_subjects
        .into_iter()
        .map(|(subject, attempts)| {
            serde_json::json!({ "subject": subject, "attempts": attempts })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "system_overview": {
            "total_users": total_users,
            "total_students": total_students,
            "total_professors": total_professors,
            "total_exercises": total_exercises,
            "total_submissions": total_submissions,
        },
        "recent_activity": {
            "new_registrations": recent_registrations,
            "new_exercises": recent_exercises,
            "new_submissions": recent_submissions,
        },
        "popular_subjects": popular_subjects,
    })))
}

/// Fetches joined (progress x exercise) rows for the aggregator, applying
/// all filters in one query so the snapshot sees a consistent set.
async fn fetch_attempt_rows(
    pool: &SqlitePool,
    student_id: Option<i64>,
    exercise_creator_id: Option<i64>,
    params: &DashboardParams,
) -> Result<Vec<AttemptRow>, AppError> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT p.status, p.score, e.max_score, p.requires_manual_grading, \
                p.time_spent_seconds, e.subject, e.difficulty, p.completed_at \
         FROM progress_records p \
         JOIN exercises e ON p.exercise_id = e.id \
         WHERE 1 = 1",
    );

    if let Some(student_id) = student_id {
        builder.push(" AND p.student_id = ").push_bind(student_id);
    }
    if let Some(creator_id) = exercise_creator_id {
        builder.push(" AND e.created_by = ").push_bind(creator_id);
    }
    if let Some(course_id) = params.course_id {
        builder.push(" AND e.course_id = ").push_bind(course_id);
    }
    if let Some(subject) = &params.subject {
        builder
            .push(" AND e.subject LIKE ")
            .push_bind(format!("%{}%", subject));
    }
    if let Some(difficulty) = params.difficulty {
        builder.push(" AND e.difficulty = ").push_bind(difficulty);
    }
    if let Some(start_date) = params.start_date {
        builder.push(" AND p.started_at >= ").push_bind(start_date);
    }
    if let Some(end_date) = params.end_date {
        builder.push(" AND p.started_at <= ").push_bind(end_date);
    }

    let rows = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch analytics rows: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(rows)
}
