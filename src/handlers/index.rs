// src/handlers/index.rs

use axum::{Json, response::IntoResponse};

/// Service landing document with links to the main entry points.
pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "links": {
            "login": "/auth/login",
            "register": "/auth/register",
            "exams": "/exam/",
            "upload": "/admin/upload",
        },
    }))
}
