// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{error::AppError, models::user::User, utils::jwt::Claims};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, avatar_url, created_at
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

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Prevent self-deletion
    if id == claims.user_id() {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for the result purge.
#[derive(Debug, Deserialize)]
pub struct PurgeParams {
    /// When present, only that subject's results are purged.
    pub subject: Option<String>,
}

/// Bulk-purges quiz results, optionally scoped to one subject.
/// Admin only. This is the sole deletion path for results; there is no
/// single-record delete and no update path at all.
pub async fn purge_results(
    State(pool): State<PgPool>,
    Query(params): Query<PurgeParams>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quiz_results WHERE ($1::TEXT IS NULL OR subject = $1)")
        .bind(&params.subject)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to purge quiz results: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!(
        "Purged {} quiz results (subject: {:?})",
        result.rows_affected(),
        params.subject
    );

    Ok(Json(serde_json::json!({
        "deleted": result.rows_affected()
    })))
}
