// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

/// Signing key used when `SECRET_KEY` is not set. Local development only.
pub const DEV_SECRET_KEY: &str = "dev";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    /// Lifetime of a session token, in seconds.
    pub session_ttl: u64,
    pub rust_log: String,
    pub log_dir: String,
    pub bind_addr: SocketAddr,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub seed_demo_exam: bool,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://exam_portal.db".to_string());

        let secret_key = env::var("SECRET_KEY").unwrap_or_else(|_| DEV_SECRET_KEY.to_string());

        let session_ttl = env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60 * 60 * 24);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse::<SocketAddr>().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let seed_demo_exam = env::var("SEED_DEMO_EXAM")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(2 * 1024 * 1024);

        Self {
            database_url,
            secret_key,
            session_ttl,
            rust_log,
            log_dir,
            bind_addr,
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
            seed_demo_exam,
            max_upload_bytes,
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }
}
