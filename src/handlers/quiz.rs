// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    bank::QuestionBank,
    error::AppError,
    models::quiz::{CreateQuizRequest, PublicQuiz, Quiz},
    utils::jwt::Claims,
};

/// Creates a new quiz.
/// Teacher role enforced by middleware; the caller becomes the quiz's author.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let questions_json = serde_json::to_value(&payload.questions)?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (teacher_id, title, subject, questions)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(claims.user_id())
    .bind(&payload.title)
    .bind(&payload.subject)
    .bind(questions_json)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Query parameters for listing quizzes.
#[derive(Debug, Deserialize)]
pub struct QuizListParams {
    pub subject: Option<String>,
}

/// Lists active quizzes, optionally filtered by subject.
/// Correct answers are stripped before the response.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, teacher_id, title, subject, questions, is_active, created_at
        FROM quizzes
        WHERE is_active = TRUE
          AND ($1::TEXT IS NULL OR subject = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(params.subject)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let public: Vec<PublicQuiz> = quizzes.into_iter().map(PublicQuiz::from).collect();

    Ok(Json(public))
}

/// Retrieves a single active quiz by ID, answers stripped.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, teacher_id, title, subject, questions, is_active, created_at
        FROM quizzes
        WHERE id = $1 AND is_active = TRUE
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(PublicQuiz::from(quiz)))
}

/// Deactivates a quiz (soft delete).
/// Requires: Login + (Author OR Admin).
/// Existing results keep their question snapshots, so history survives.
pub async fn deactivate_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id: i64 = sqlx::query_scalar("SELECT teacher_id FROM quizzes WHERE id = $1 AND is_active = TRUE")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if teacher_id != claims.user_id() && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this quiz".to_string(),
        ));
    }

    sqlx::query("UPDATE quizzes SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to deactivate quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for fetching external questions.
#[derive(Debug, Deserialize)]
pub struct ExternalQuestionsParams {
    pub subject: String,
    pub amount: Option<usize>,
}

/// Fetches a question set from the external question bank, through the
/// TTL-cached client. Returned verbatim, answer key included: the client
/// grades these locally and records the outcome via the external-result path.
pub async fn external_questions(
    State(bank): State<Arc<QuestionBank>>,
    Query(params): Query<ExternalQuestionsParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.subject.is_empty() {
        return Err(AppError::BadRequest("subject is required".to_string()));
    }

    let amount = params.amount.unwrap_or(10).min(50);
    let questions = bank.get_questions(&params.subject, amount).await?;

    Ok(Json(questions))
}
