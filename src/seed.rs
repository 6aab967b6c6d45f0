// src/seed.rs

use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    handlers::admin::{exam_title_exists, insert_exam_with_questions},
    models::{
        question::{Choice, NewQuestion},
        user::normalize_email,
    },
    utils::hash::hash_password,
};

pub const DEMO_EXAM_TITLE: &str = "SAT Quick Demo";

/// Creates the admin account from `ADMIN_EMAIL` / `ADMIN_PASSWORD` when both are set.
/// An existing account with that email is promoted to admin instead.
pub async fn seed_admin_user(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };
    let email = normalize_email(email);

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(id) => {
            sqlx::query("UPDATE users SET is_admin = TRUE WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await?;
        }
        None => {
            tracing::info!("Seeding admin user: {}", email);
            let hashed_password = hash_password(password)?;

            sqlx::query(
                "INSERT INTO users (email, password_hash, is_admin, created_at) VALUES (?, ?, TRUE, ?)",
            )
            .bind(&email)
            .bind(&hashed_password)
            .bind(chrono::Utc::now())
            .execute(pool)
            .await?;
            tracing::info!("Admin user created successfully.");
        }
    }

    Ok(())
}

pub fn demo_questions() -> Vec<NewQuestion> {
    vec![
        NewQuestion {
            order_index: 1,
            text: "2 + 2 = ?".to_string(),
            choice_a: "1".to_string(),
            choice_b: "2".to_string(),
            choice_c: "3".to_string(),
            choice_d: "4".to_string(),
            correct: Choice::D,
        },
        NewQuestion {
            order_index: 2,
            text: "Select a vowel.".to_string(),
            choice_a: "B".to_string(),
            choice_b: "C".to_string(),
            choice_c: "A".to_string(),
            choice_d: "D".to_string(),
            correct: Choice::C,
        },
    ]
}

/// Inserts the two-question demo exam unless it already exists.
/// Returns the new exam id, or `None` when nothing was inserted.
pub async fn seed_demo_exam(pool: &SqlitePool) -> Result<Option<i64>, AppError> {
    if exam_title_exists(pool, DEMO_EXAM_TITLE).await? {
        return Ok(None);
    }

    let exam_id = insert_exam_with_questions(pool, DEMO_EXAM_TITLE, &demo_questions()).await?;
    tracing::info!(exam_id, "demo exam seeded");

    Ok(Some(exam_id))
}
