// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::user::{Role, User},
    utils::{hash::hash_password, jwt::Claims},
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, created_at
        FROM users
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

/// Updates user information.
/// Admin only.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Check existence
    let _exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(id)
        .fetch_one(&pool)
        .await?;
    if _exists == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    // Perform updates sequentially if fields are present
    if let Some(new_username) = payload.username {
        sqlx::query("UPDATE users SET username = ? WHERE id = ?")
            .bind(new_username)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    AppError::Conflict("Username already exists".to_string())
                } else {
                    AppError::InternalServerError(e.to_string())
                }
            })?;
    }

    if let Some(new_role) = payload.role {
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(new_role)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(new_password) = payload.password {
        let hashed = hash_password(&new_password)?;
        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(hashed)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if claims.user_id() == id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("User {} deleted by admin {}", id, claims.user_id());
    Ok(StatusCode::NO_CONTENT)
}
