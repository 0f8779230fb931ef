// src/config.rs

use std::{env, time::Duration};

use dotenvy::dotenv;

use crate::engine::AttemptSettings;

#[derive(Debug, Clone)]
pub struct Config {
    /// When unset, sessions live in memory only.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    pub log_dir: String,
    pub cors_origins: Vec<String>,
    /// Countdown for sessions without their own duration. `None` = untimed.
    pub default_duration_secs: Option<u32>,
    pub warning_ttl_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = parse_or("PORT", 3500);

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let default_duration_secs = Some(parse_or("EXAM_DEFAULT_DURATION_SECS", 3600u32))
            .filter(|secs| *secs > 0);

        let warning_ttl_ms = parse_or("EXAM_WARNING_TTL_MS", 3000);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            port,
            log_dir,
            cors_origins,
            default_duration_secs,
            warning_ttl_ms,
        }
    }

    pub fn attempt_settings(&self) -> AttemptSettings {
        AttemptSettings {
            default_duration_secs: self.default_duration_secs,
            warning_ttl: Duration::from_millis(self.warning_ttl_ms),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
