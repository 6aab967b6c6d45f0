// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::{Choice, ChoiceTexts, PublicQuestion};

/// Represents the 'attempts' table in the database.
/// An attempt is in progress until `completed_at` is set by a submission.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Number of correct answers in the latest submission.
    pub raw: i64,
}

impl Attempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Represents the 'attempt_answers' table. At most one row per (attempt, question).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttemptAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected: Choice,
}

/// Form body for `POST /exam/start`.
/// `exam_id` stays raw so a missing or non-numeric id reads as an unknown exam.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    #[serde(default)]
    pub exam_id: Option<String>,
}

impl StartAttemptRequest {
    pub fn exam_id(&self) -> Option<i64> {
        self.exam_id.as_deref()?.trim().parse().ok()
    }
}

#[derive(Debug, Serialize)]
pub struct ExamHeader {
    pub id: i64,
    pub title: String,
}

/// DTO for `GET /exam/take/{id}`.
#[derive(Debug, Serialize)]
pub struct TakeAttemptResponse {
    pub attempt_id: i64,
    pub exam: ExamHeader,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions: Vec<PublicQuestion>,
    pub submit_url: String,
}

/// Per-question line of an attempt result.
#[derive(Debug, Serialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub order_index: i64,
    pub text: String,
    pub choices: ChoiceTexts,
    pub selected: Option<Choice>,
    /// Only revealed once the attempt has been submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

/// DTO for `GET /exam/result/{id}`.
#[derive(Debug, Serialize)]
pub struct AttemptResultResponse {
    pub attempt_id: i64,
    pub exam: ExamHeader,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub total: usize,
    pub raw: i64,
    pub questions: Vec<QuestionResult>,
}
