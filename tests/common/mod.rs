// tests/common/mod.rs
#![allow(dead_code)]

use std::net::SocketAddr;
use std::str::FromStr;

use exam_portal::{config::Config, db, routes, state::AppState};
use reqwest::multipart::{Form, Part};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        secret_key: "test_secret_for_integration_tests".to_string(),
        session_ttl: 600,
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        admin_email: None,
        admin_password: None,
        seed_demo_exam: false,
        max_upload_bytes: 1024 * 1024,
    }
}

/// Spawns the app on a random port against a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    // A single connection that never expires keeps the in-memory database alive.
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Invalid database url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to migrate database");

    exam_portal::seed::seed_admin_user(&pool, &config)
        .await
        .expect("Failed to seed admin");

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Register request failed")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// Registers (if needed) and logs in, returning the bearer token.
    pub async fn user_token(&self, email: &str) -> String {
        self.register(email, PASSWORD).await;
        let body: serde_json::Value = self
            .login(email, PASSWORD)
            .await
            .json()
            .await
            .expect("Failed to parse login json");
        body["token"].as_str().expect("Token not found").to_string()
    }

    /// Registers a user, flips the admin flag directly in the database, then logs in.
    pub async fn admin_token(&self) -> String {
        self.register("admin@example.com", PASSWORD).await;
        sqlx::query("UPDATE users SET is_admin = TRUE WHERE email = ?")
            .bind("admin@example.com")
            .execute(&self.pool)
            .await
            .unwrap();
        self.user_token("admin@example.com").await
    }

    pub async fn upload(
        &self,
        token: &str,
        title: &str,
        filename: &str,
        data: &[u8],
    ) -> reqwest::Response {
        let form = Form::new().text("title", title.to_string()).part(
            "file",
            Part::bytes(data.to_vec()).file_name(filename.to_string()),
        );

        self.client
            .post(self.url("/admin/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    pub async fn start_attempt(&self, token: &str, exam_id: i64) -> reqwest::Response {
        self.client
            .post(self.url("/exam/start"))
            .bearer_auth(token)
            .form(&[("exam_id", exam_id.to_string())])
            .send()
            .await
            .expect("Start request failed")
    }

    pub async fn submit(
        &self,
        token: &str,
        attempt_id: i64,
        answers: &[(String, String)],
    ) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/exam/submit/{}", attempt_id)))
            .bearer_auth(token)
            .form(answers)
            .send()
            .await
            .expect("Submit request failed")
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .expect("Count query failed")
    }
}

pub const DEMO_CSV: &str = "order_index,text,choice_a,choice_b,choice_c,choice_d,correct\n\
                            1,2 + 2 = ?,1,2,3,4,D\n\
                            2,Select a vowel.,B,C,A,D,C\n";
