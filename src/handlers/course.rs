// src/handlers/course.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::course::{Course, CreateCourseRequest, EnrolledStudent},
    utils::jwt::Claims,
};

/// Creates a new course owned by the current professor.
pub async fn create_course(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (title, description, professor_id, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, title, description, professor_id, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(claims.user_id())
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await?;

    tracing::info!("Course {} created by user {}", course.id, claims.user_id());
    Ok((StatusCode::CREATED, Json(course)))
}

/// Lists all courses.
pub async fn list_courses(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, title, description, professor_id, created_at
        FROM courses
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(courses))
}

/// Enrolls the current student into a course. Idempotent: enrolling twice
/// returns 200 with the existing enrollment untouched.
pub async fn enroll(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.is_student() {
        return Err(AppError::Forbidden(
            "Only students can enroll in courses".to_string(),
        ));
    }

    let course_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_one(&pool)
        .await?;
    if course_exists == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO enrollments (course_id, student_id, enrolled_at)
        VALUES (?, ?, ?)
        ON CONFLICT (course_id, student_id) DO NOTHING
        "#,
    )
    .bind(course_id)
    .bind(claims.user_id())
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await?;

    let status = if inserted.rows_affected() > 0 {
        tracing::info!(
            "Student {} enrolled in course {}",
            claims.user_id(),
            course_id
        );
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(serde_json::json!({ "course_id": course_id }))))
}

/// Lists students enrolled in a course. Owning professor or admin only.
pub async fn list_students(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let professor_id: Option<i64> =
        sqlx::query_scalar("SELECT professor_id FROM courses WHERE id = ?")
            .bind(course_id)
            .fetch_optional(&pool)
            .await?;

    let professor_id = professor_id.ok_or(AppError::NotFound("Course not found".to_string()))?;
    if professor_id != claims.user_id() && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this course's roster".to_string(),
        ));
    }

    let students = sqlx::query_as::<_, EnrolledStudent>(
        r#"
        SELECT en.student_id, u.username, en.enrolled_at
        FROM enrollments en
        JOIN users u ON en.student_id = u.id
        WHERE en.course_id = ?
        ORDER BY en.enrolled_at ASC
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(students))
}
