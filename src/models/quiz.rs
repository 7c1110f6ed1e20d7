// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// One question inside a quiz's JSONB `questions` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// The text content of the question.
    pub content: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    pub options: Vec<String>,

    /// Index into `options` of the correct answer.
    pub correct_answer: i32,

    /// Points awarded for this question. Informational; scoring is
    /// percentage-based over the question count.
    pub points: i32,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    /// The teacher who authored the quiz.
    pub teacher_id: i64,

    pub title: String,

    /// Free-text subject label, also the leaderboard partition key.
    pub subject: String,

    /// Question set stored as a JSON array.
    pub questions: Json<Vec<Question>>,

    /// Deactivated quizzes are hidden and reject new submissions.
    pub is_active: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A question as sent to students: the correct answer stays server-side.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub content: String,
    pub options: Vec<String>,
    pub points: i32,
}

/// A quiz as sent to students, with answers stripped.
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub questions: Vec<PublicQuestion>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Quiz> for PublicQuiz {
    fn from(quiz: Quiz) -> Self {
        let questions = quiz
            .questions
            .0
            .into_iter()
            .map(|q| PublicQuestion {
                content: q.content,
                options: q.options,
                points: q.points,
            })
            .collect();

        PublicQuiz {
            id: quiz.id,
            title: quiz.title,
            subject: quiz.subject,
            questions,
            created_at: quiz.created_at,
        }
    }
}

/// DTO for a teacher creating a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,
}

fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }
    for q in questions {
        if q.content.is_empty() || q.content.len() > 1000 {
            return Err(validator::ValidationError::new("question_content_length"));
        }
        if q.options.len() < 2 {
            return Err(validator::ValidationError::new("too_few_options"));
        }
        if q.correct_answer < 0 || q.correct_answer as usize >= q.options.len() {
            return Err(validator::ValidationError::new("correct_answer_out_of_range"));
        }
        if q.points < 0 {
            return Err(validator::ValidationError::new("negative_points"));
        }
    }
    Ok(())
}
