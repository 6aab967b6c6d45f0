// src/handlers/auth.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::{CookieJar, WithRejection};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{LoginRequest, RegisterRequest, User, normalize_email},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{clear_session_cookie, session_cookie, sign_jwt},
        redirect::safe_redirect_target,
    },
};

/// Registers a new (non-admin) user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    WithRejection(Json(mut payload), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = normalize_email(&payload.email);
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, is_admin, created_at)
        VALUES (?, ?, FALSE, ?)
        RETURNING id, email, password_hash, is_admin, created_at
        "#,
    )
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(user_id = user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and establishes a session.
///
/// The token is returned in the body and set as an HttpOnly cookie.
/// `redirect_to` echoes `next` only if it points back at this host.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    headers: HeaderMap,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = normalize_email(&payload.email);
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, is_admin, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let invalid = || AppError::AuthError("Invalid email or password.".to_string());
    let user = user.ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = sign_jwt(&user, &config.secret_key, config.session_ttl)?;

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let redirect_to = payload
        .next
        .as_deref()
        .and_then(|next| safe_redirect_target(next, host))
        .unwrap_or_else(|| "/".to_string());

    Ok((
        jar.add(session_cookie(token.clone(), config.session_ttl)),
        Json(json!({
            "token": token,
            "type": "Bearer",
            "is_admin": user.is_admin,
            "redirect_to": redirect_to,
        })),
    ))
}

/// Ends the session by expiring the cookie. Bearer tokens are simply discarded by the client.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (StatusCode::NO_CONTENT, jar.add(clear_session_cookie()))
}
