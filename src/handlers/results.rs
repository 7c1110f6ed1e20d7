// src/handlers/results.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::NO_ANSWER,
    error::AppError,
    models::{
        quiz::{Question, Quiz},
        quiz_result::{QuizResult, RecordExternalResultRequest, SubmitQuizRequest},
    },
    utils::jwt::Claims,
};

/// Counts correct answers for an authored quiz.
///
/// `answers[i]` is compared against question i's correct-answer index.
/// A missing, skipped (-1) or out-of-range entry simply never matches;
/// permissive by contract, not a validation error.
fn grade_answers(answers: &[i32], questions: &[Question]) -> i32 {
    let mut correct = 0;
    for (i, question) in questions.iter().enumerate() {
        if let Some(answer) = answers.get(i) {
            if *answer == question.correct_answer {
                correct += 1;
            }
        }
    }
    correct
}

/// Percentage score over the quiz's question count, round-half-up.
///
/// The denominator is the question count, never the answer count, so a
/// short or empty answer list yields a low score instead of a division
/// error.
fn percent_score(correct_answers: i32, total_questions: i32) -> i32 {
    if total_questions <= 0 {
        return 0;
    }
    (correct_answers as f64 / total_questions as f64 * 100.0).round() as i32
}

/// Pads the submitted answer list to one entry per question, using the
/// no-answer sentinel for questions the student never reached.
fn pad_answers(answers: &[i32], total_questions: usize) -> Vec<i32> {
    let mut padded = answers.to_vec();
    padded.truncate(total_questions);
    padded.resize(total_questions, NO_ANSWER);
    padded
}

const RESULT_COLUMNS: &str = "id, user_id, quiz_id, subject, score, total_questions, \
     correct_answers, time_spent, user_answers, questions, completed_at";

/// Submits an authored quiz: the server holds the answer key, recomputes
/// correctness and persists an immutable result.
///
/// * Requires the 'student' role.
/// * 404 if the quiz does not exist or was deactivated.
/// * 409 on a second submission for the same (user, quiz) pair; the
///   guarantee comes from a unique index, never from check-then-insert.
pub async fn submit_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != "student" {
        return Err(AppError::Forbidden(
            "Only students can submit quiz results".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, teacher_id, title, subject, questions, is_active, created_at
        FROM quizzes
        WHERE id = $1 AND is_active = TRUE
        "#,
    )
    .bind(payload.quiz_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = &quiz.questions.0;
    let total_questions = questions.len() as i32;
    let correct_answers = grade_answers(&payload.answers, questions);
    let score = percent_score(correct_answers, total_questions);
    let user_answers = pad_answers(&payload.answers, questions.len());

    let sql = format!(
        r#"
        INSERT INTO quiz_results
        (user_id, quiz_id, subject, score, total_questions, correct_answers,
         time_spent, user_answers, questions, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {RESULT_COLUMNS}
        "#
    );

    let result = sqlx::query_as::<_, QuizResult>(&sql)
        .bind(claims.user_id())
        .bind(quiz.id)
        .bind(&quiz.subject)
        .bind(score)
        .bind(total_questions)
        .bind(correct_answers)
        .bind(payload.time_spent)
        .bind(serde_json::to_value(&user_answers)?)
        .bind(serde_json::to_value(questions)?)
        .bind(Utc::now())
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            // Postgres error code for unique violation is 23505
            if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
                AppError::Conflict("You have already submitted this quiz".to_string())
            } else {
                tracing::error!("Failed to insert quiz result: {:?}", e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// Records a result for an externally fetched quiz.
///
/// The answer key never touched the server, so correctness is
/// client-reported and stored verbatim with no quiz to key a duplicate
/// check on. This trust relaxation is part of the contract for the
/// external path.
pub async fn record_external_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RecordExternalResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != "student" {
        return Err(AppError::Forbidden(
            "Only students can submit quiz results".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.correct_answers > payload.total_questions {
        return Err(AppError::BadRequest(
            "correct_answers cannot exceed total_questions".to_string(),
        ));
    }

    let questions_json = payload
        .questions
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;

    let sql = format!(
        r#"
        INSERT INTO quiz_results
        (user_id, quiz_id, subject, score, total_questions, correct_answers,
         time_spent, user_answers, questions, completed_at)
        VALUES ($1, NULL, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {RESULT_COLUMNS}
        "#
    );

    let result = sqlx::query_as::<_, QuizResult>(&sql)
        .bind(claims.user_id())
        .bind(&payload.subject)
        .bind(payload.score)
        .bind(payload.total_questions)
        .bind(payload.correct_answers)
        .bind(payload.time_spent)
        .bind(serde_json::to_value(&payload.user_answers)?)
        .bind(questions_json)
        .bind(payload.completed_at.unwrap_or_else(Utc::now))
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record external result: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// Lists the caller's own results, newest first.
pub async fn list_my_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        r#"
        SELECT {RESULT_COLUMNS}
        FROM quiz_results
        WHERE user_id = $1
        ORDER BY completed_at DESC
        "#
    );

    let results = sqlx::query_as::<_, QuizResult>(&sql)
        .bind(claims.user_id())
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list results: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(results))
}
