// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub professor_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// A student enrolled in a course, joined with user info.
#[derive(Debug, Serialize, FromRow)]
pub struct EnrolledStudent {
    pub student_id: i64,
    pub username: String,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}
