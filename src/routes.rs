// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam, index},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: index and auth routes.
/// * Login required: exam listing and the attempt lifecycle.
/// * Admin required: exam upload and deletion.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    // Attempt routes check ownership inside the handlers.
    let exam_routes = Router::new()
        .route("/exam", get(exam::list_exams))
        .route("/exam/", get(exam::list_exams))
        .route("/exam/start", post(exam::start_attempt))
        .route("/exam/take/{attempt_id}", get(exam::take_attempt))
        .route("/exam/submit/{attempt_id}", post(exam::submit_attempt))
        .route("/exam/result/{attempt_id}", get(exam::attempt_result))
        // route_layer: unmatched paths fall through to the 404 fallback
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/upload", get(admin::upload_info).post(admin::upload_exam))
        .route("/exams/{id}", delete(admin::delete_exam))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        // Auth runs first (outermost), then the admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(index::index))
        .nest("/auth", auth_routes)
        .merge(exam_routes)
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
