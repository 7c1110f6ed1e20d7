// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Default number of leaderboard rows returned when the caller omits `limit`.
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

/// Hard cap on leaderboard rows per request.
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Sentinel stored in `user_answers` for a question the student skipped.
pub const NO_ANSWER: i32 = -1;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Base URL of the external question bank API.
    pub question_bank_url: String,
    /// Seconds a cached question-bank response stays fresh.
    pub bank_cache_ttl: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let question_bank_url = env::var("QUESTION_BANK_URL")
            .unwrap_or_else(|_| "https://quizapi.io/api/v1".to_string());

        let bank_cache_ttl = env::var("BANK_CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
            question_bank_url,
            bank_cache_ttl,
        }
    }
}
