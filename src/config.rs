// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Tolerances applied when grading calculation questions.
///
/// A submitted value is accepted when
/// `|submitted - expected| <= max(absolute, relative * |expected|)`.
/// Explicit configuration rather than per-question data, so boundary
/// behavior is deterministic and testable.
#[derive(Debug, Clone, Copy)]
pub struct ScoringConfig {
    pub absolute_tolerance: f64,
    pub relative_tolerance: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            absolute_tolerance: 0.01,
            relative_tolerance: 0.001,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub scoring: ScoringConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://edlab.db".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let defaults = ScoringConfig::default();
        let scoring = ScoringConfig {
            absolute_tolerance: env::var("SCORING_ABSOLUTE_TOLERANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.absolute_tolerance),
            relative_tolerance: env::var("SCORING_RELATIVE_TOLERANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.relative_tolerance),
        };

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            scoring,
        }
    }
}
