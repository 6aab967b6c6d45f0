// src/models/exam.rs

use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exam {
    pub id: i64,

    /// Globally unique title.
    pub title: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Row for the exam listing, with the number of questions joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct ExamSummary {
    pub id: i64,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub question_count: i64,
}
