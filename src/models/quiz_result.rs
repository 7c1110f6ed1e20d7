// src/models/quiz_result.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::quiz::Question;

/// Represents the 'quiz_results' table in the database.
///
/// A result is immutable once created: there is no update handler anywhere,
/// corrections happen by submitting again (a different quiz) and deletions
/// only through the admin bulk purge.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: i64,

    pub user_id: i64,

    /// The source quiz. NULL for results recorded from the external
    /// question bank, where no local quiz exists.
    pub quiz_id: Option<i64>,

    /// Leaderboard partition key, copied from the quiz at submission time.
    pub subject: String,

    /// Percentage score, 0 to 100. Computed server-side on the authored
    /// path; client-reported on the external path.
    pub score: i32,

    pub total_questions: i32,

    pub correct_answers: i32,

    /// Seconds the student spent, as reported by the client.
    pub time_spent: i32,

    /// One entry per question; an option index, or -1 for "no answer".
    pub user_answers: Json<Vec<i32>>,

    /// Snapshot of the question set at submission time, so results stay
    /// interpretable if the source quiz is later edited or deleted.
    pub questions: Option<Json<Vec<Question>>>,

    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for the authored-quiz path: the server holds the answer key and
/// recomputes correctness.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    pub quiz_id: i64,

    /// Ordered answer indices, one per question. May be shorter than the
    /// question count; missing entries never match.
    pub answers: Vec<i32>,

    #[validate(range(min = 0, message = "time_spent must not be negative"))]
    pub time_spent: i32,
}

/// DTO for the external-quiz path: the answer key lives with the question
/// bank, so the client reports correctness and the server records it
/// verbatim. An accepted trust tradeoff, not an oversight.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordExternalResultRequest {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,

    #[validate(range(min = 0, max = 100))]
    pub score: i32,

    #[validate(range(min = 1, message = "total_questions must be at least 1"))]
    pub total_questions: i32,

    #[validate(range(min = 0))]
    pub correct_answers: i32,

    #[validate(range(min = 0, message = "time_spent must not be negative"))]
    pub time_spent: i32,

    pub user_answers: Vec<i32>,

    /// Optional snapshot of the externally fetched question set.
    pub questions: Option<Vec<Question>>,

    /// Completion time; defaults to now when omitted.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One raw result row joined with the user directory, the input to the
/// in-process leaderboard aggregation.
#[derive(Debug, Clone, FromRow)]
pub struct RankedResultRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub subject: String,
    pub score: i32,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Subject leaderboard row: per-user projection over that subject's history.
#[derive(Debug, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub latest_score: i32,
    pub latest_completed_at: chrono::DateTime<chrono::Utc>,
    /// Mean of all scores, rounded to 1 decimal place.
    pub average_score: f64,
    pub best_score: i32,
    pub total_quizzes: i64,
}

/// Overall leaderboard row, aggregated across all subjects.
#[derive(Debug, PartialEq, Serialize)]
pub struct OverallEntry {
    pub user_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub total_score: i64,
    pub total_quizzes: i64,
    /// Mean of all scores, rounded to 1 decimal place.
    pub average_score: f64,
    pub last_quiz: chrono::DateTime<chrono::Utc>,
}
