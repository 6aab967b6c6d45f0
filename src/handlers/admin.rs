// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, is_unique_violation},
    models::question::NewQuestion,
    utils::import::{self, ACCEPTED_EXTENSIONS, REQUIRED_CSV_COLUMNS, UploadFormat},
};

/// Fields collected from the multipart upload form.
#[derive(Debug, Default)]
struct UploadForm {
    title: String,
    file: Option<UploadedFile>,
}

#[derive(Debug)]
struct UploadedFile {
    filename: String,
    data: Vec<u8>,
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => form.title = field.text().await?,
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?.to_vec();
                form.file = Some(UploadedFile { filename, data });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Describes what the upload endpoint accepts.
/// Admin only.
pub async fn upload_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "fields": ["title", "file"],
        "accepted_extensions": ACCEPTED_EXTENSIONS,
        "csv_columns": REQUIRED_CSV_COLUMNS,
        "json_shape": "{\"questions\": [{\"order_index\", \"text\", \"choice_a\"..\"choice_d\" | \"choices\": {\"A\"..\"D\"}, \"correct\"}]} or a bare list",
    }))
}

/// Creates an exam from an uploaded CSV or JSON document.
/// Admin only.
///
/// * Rejects a blank title, a missing file, or a title that is already taken (before parsing).
/// * Dispatches on the file extension and parses the whole document up front.
/// * Inserts the exam and all of its questions in one transaction.
pub async fn upload_exam(
    State(pool): State<SqlitePool>,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload_form(&mut multipart).await?;

    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required.".to_string()));
    }

    let file = match form.file {
        Some(file) if !file.filename.trim().is_empty() => file,
        _ => return Err(AppError::BadRequest("Choose a .csv or .json file.".to_string())),
    };

    if exam_title_exists(&pool, title).await? {
        return Err(AppError::Conflict(
            "An exam with this title already exists.".to_string(),
        ));
    }

    let format = UploadFormat::from_filename(&file.filename)?;
    let questions = import::parse_upload(format, &file.data)?;

    if questions.is_empty() {
        return Err(AppError::BadRequest("No questions parsed.".to_string()));
    }

    let exam_id = insert_exam_with_questions(&pool, title, &questions).await?;

    tracing::info!(
        exam_id,
        title,
        questions = questions.len(),
        "exam uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": exam_id,
            "title": title,
            "question_count": questions.len(),
            "message": format!("Uploaded exam '{}' with {} questions.", title, questions.len()),
        })),
    ))
}

/// Deletes an exam; its questions, attempts and answers go with it.
/// Admin only.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exams WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    tracing::info!(exam_id = id, "exam deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn exam_title_exists(pool: &SqlitePool, title: &str) -> Result<bool, AppError> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE title = ?")
        .bind(title)
        .fetch_optional(pool)
        .await?;

    Ok(existing.is_some())
}

/// Inserts an exam and its questions atomically. Either every row is committed or none is.
pub(crate) async fn insert_exam_with_questions(
    pool: &SqlitePool,
    title: &str,
    questions: &[NewQuestion],
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let exam_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO exams (title, created_at) VALUES (?, ?) RETURNING id",
    )
    .bind(title)
    .bind(chrono::Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("An exam with this title already exists.".to_string())
        } else {
            tracing::error!("Failed to create exam: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    for question in questions {
        sqlx::query(
            r#"
            INSERT INTO questions
            (exam_id, order_index, text, choice_a, choice_b, choice_c, choice_d, correct)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(exam_id)
        .bind(question.order_index)
        .bind(&question.text)
        .bind(&question.choice_a)
        .bind(&question.choice_b)
        .bind(&question.choice_c)
        .bind(&question.choice_d)
        .bind(question.correct)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    tx.commit().await?;

    Ok(exam_id)
}
