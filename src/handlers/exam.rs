// src/handlers/exam.rs

use std::collections::HashMap;

use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        attempt::{
            Attempt, AttemptAnswer, AttemptResultResponse, ExamHeader, QuestionResult,
            StartAttemptRequest, TakeAttemptResponse,
        },
        exam::{Exam, ExamSummary},
        question::{Choice, PublicQuestion, Question},
    },
    utils::jwt::Claims,
};

/// Helper struct for fetching answer keys from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnswerKey {
    pub id: i64,
    pub correct: Choice,
}

/// Outcome of grading one submission.
#[derive(Debug, PartialEq)]
pub struct Grade {
    /// Number of accepted answers matching the question's correct marker.
    pub raw: i64,
    /// Accepted answers, as (question id, selected choice), in question order.
    pub answers: Vec<(i64, Choice)>,
}

/// Form field carrying the answer for a question.
pub fn answer_field(question_id: i64) -> String {
    format!("q_{}", question_id)
}

/// Grades a submitted form against the exam's answer keys.
///
/// Only questions of the exam are considered. A value that is not one of the four
/// symbols (blank, malformed) counts as unanswered: it is neither stored nor scored.
pub fn grade_submission(keys: &[AnswerKey], form: &HashMap<String, String>) -> Grade {
    let mut raw = 0;
    let mut answers = Vec::new();

    for key in keys {
        let Some(selected) = form
            .get(&answer_field(key.id))
            .and_then(|value| Choice::parse_lenient(value))
        else {
            continue;
        };

        if selected == key.correct {
            raw += 1;
        }
        answers.push((key.id, selected));
    }

    Grade { raw, answers }
}

/// Loads an attempt and checks it belongs to the caller.
/// Unknown ids are 404; someone else's attempt is 403.
async fn fetch_owned_attempt(
    pool: &SqlitePool,
    attempt_id: i64,
    claims: &Claims,
) -> Result<Attempt, AppError> {
    let user_id = claims.user_id()?;

    let attempt = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, user_id, exam_id, started_at, completed_at, raw
        FROM attempts
        WHERE id = ?
        "#,
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.user_id != user_id {
        tracing::warn!(attempt_id, user_id, "attempt accessed by non-owner");
        return Err(AppError::Forbidden(
            "This attempt belongs to another user.".to_string(),
        ));
    }

    Ok(attempt)
}

async fn fetch_exam(pool: &SqlitePool, exam_id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>("SELECT id, title, created_at FROM exams WHERE id = ?")
        .bind(exam_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Questions of an exam in display order.
async fn fetch_questions(pool: &SqlitePool, exam_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_id, order_index, text, choice_a, choice_b, choice_c, choice_d, correct
        FROM questions
        WHERE exam_id = ?
        ORDER BY order_index ASC, id ASC
        "#,
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(questions)
}

/// Lists all exams, newest first, with their question counts.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, ExamSummary>(
        r#"
        SELECT e.id, e.title, e.created_at, COUNT(q.id) AS question_count
        FROM exams e
        LEFT JOIN questions q ON q.exam_id = e.id
        GROUP BY e.id, e.title, e.created_at
        ORDER BY e.created_at DESC, e.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exams: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(exams))
}

/// Starts a new attempt on an exam for the current user.
/// Refuses exams that have no questions yet.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    WithRejection(Form(req), _): WithRejection<Form<StartAttemptRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let exam_id = req
        .exam_id()
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;
    let exam = fetch_exam(&pool, exam_id).await?;

    let question_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE exam_id = ?")
            .bind(exam.id)
            .fetch_one(&pool)
            .await?;

    if question_count == 0 {
        return Err(AppError::BadRequest(
            "This exam has no questions yet.".to_string(),
        ));
    }

    let attempt = sqlx::query_as::<_, Attempt>(
        r#"
        INSERT INTO attempts (user_id, exam_id, started_at, raw)
        VALUES (?, ?, ?, 0)
        RETURNING id, user_id, exam_id, started_at, completed_at, raw
        "#,
    )
    .bind(user_id)
    .bind(exam.id)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to start attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(attempt_id = attempt.id, exam_id = exam.id, user_id, "attempt started");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "attempt_id": attempt.id,
            "exam_id": exam.id,
            "started_at": attempt.started_at,
            "take_url": format!("/exam/take/{}", attempt.id),
        })),
    ))
}

/// Returns the attempt's exam and its questions in display order, without answers.
pub async fn take_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = fetch_owned_attempt(&pool, attempt_id, &claims).await?;
    let exam = fetch_exam(&pool, attempt.exam_id).await?;
    let questions = fetch_questions(&pool, exam.id).await?;

    Ok(Json(TakeAttemptResponse {
        attempt_id: attempt.id,
        exam: ExamHeader {
            id: exam.id,
            title: exam.title,
        },
        started_at: attempt.started_at,
        completed_at: attempt.completed_at,
        questions: questions.iter().map(PublicQuestion::from).collect(),
        submit_url: format!("/exam/submit/{}", attempt.id),
    }))
}

/// Grades and stores a submission.
///
/// Resubmitting replaces the previous answers: prior rows are deleted, the valid
/// answers inserted, and `raw` recomputed, all in one transaction.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    WithRejection(Form(form), _): WithRejection<Form<HashMap<String, String>>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = fetch_owned_attempt(&pool, attempt_id, &claims).await?;

    let keys = sqlx::query_as::<_, AnswerKey>(
        "SELECT id, correct FROM questions WHERE exam_id = ? ORDER BY order_index ASC, id ASC",
    )
    .bind(attempt.exam_id)
    .fetch_all(&pool)
    .await?;

    let grade = grade_submission(&keys, &form);
    let completed_at = chrono::Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM attempt_answers WHERE attempt_id = ?")
        .bind(attempt.id)
        .execute(&mut *tx)
        .await?;

    for &(question_id, selected) in &grade.answers {
        sqlx::query(
            "INSERT INTO attempt_answers (attempt_id, question_id, selected) VALUES (?, ?, ?)",
        )
        .bind(attempt.id)
        .bind(question_id)
        .bind(selected)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store answer: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    sqlx::query("UPDATE attempts SET raw = ?, completed_at = ? WHERE id = ?")
        .bind(grade.raw)
        .bind(completed_at)
        .bind(attempt.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        attempt_id = attempt.id,
        raw = grade.raw,
        answered = grade.answers.len(),
        total = keys.len(),
        "attempt submitted"
    );

    Ok(Json(serde_json::json!({
        "attempt_id": attempt.id,
        "raw": grade.raw,
        "answered": grade.answers.len(),
        "total": keys.len(),
        "completed_at": completed_at,
        "result_url": format!("/exam/result/{}", attempt.id),
    })))
}

/// Returns the score and the selected choice for every question of the attempt.
pub async fn attempt_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = fetch_owned_attempt(&pool, attempt_id, &claims).await?;
    let exam = fetch_exam(&pool, attempt.exam_id).await?;
    let questions = fetch_questions(&pool, exam.id).await?;

    let answers: HashMap<i64, Choice> = sqlx::query_as::<_, AttemptAnswer>(
        "SELECT id, attempt_id, question_id, selected FROM attempt_answers WHERE attempt_id = ?",
    )
    .bind(attempt.id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(|a| (a.question_id, a.selected))
    .collect();

    let reveal = attempt.is_completed();
    let results = questions
        .iter()
        .map(|q| {
            let selected = answers.get(&q.id).copied();
            QuestionResult {
                question_id: q.id,
                order_index: q.order_index,
                text: q.text.clone(),
                choices: q.choices(),
                selected,
                correct: reveal.then_some(q.correct),
                is_correct: reveal.then(|| selected == Some(q.correct)),
            }
        })
        .collect();

    Ok(Json(AttemptResultResponse {
        attempt_id: attempt.id,
        exam: ExamHeader {
            id: exam.id,
            title: exam.title,
        },
        started_at: attempt.started_at,
        completed_at: attempt.completed_at,
        total: questions.len(),
        raw: attempt.raw,
        questions: results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<AnswerKey> {
        vec![
            AnswerKey { id: 1, correct: Choice::D },
            AnswerKey { id: 2, correct: Choice::C },
        ]
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn grades_the_demo_exam() {
        let first = grade_submission(&keys(), &form(&[("q_1", "D"), ("q_2", "A")]));
        assert_eq!(first.raw, 1);
        assert_eq!(first.answers, vec![(1, Choice::D), (2, Choice::A)]);

        let second = grade_submission(&keys(), &form(&[("q_1", "D"), ("q_2", "C")]));
        assert_eq!(second.raw, 2);
        assert_eq!(second.answers.len(), 2);
    }

    #[test]
    fn invalid_or_blank_choices_are_unanswered() {
        let grade = grade_submission(&keys(), &form(&[("q_1", ""), ("q_2", "Z")]));
        assert_eq!(grade, Grade { raw: 0, answers: vec![] });
    }

    #[test]
    fn lowercase_choices_are_accepted() {
        let grade = grade_submission(&keys(), &form(&[("q_1", "d")]));
        assert_eq!(grade.raw, 1);
        assert_eq!(grade.answers, vec![(1, Choice::D)]);
    }

    #[test]
    fn fields_for_other_questions_are_ignored() {
        let grade = grade_submission(&keys(), &form(&[("q_99", "A"), ("exam_id", "1")]));
        assert!(grade.answers.is_empty());
        assert_eq!(grade.raw, 0);
    }
}
