use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base of the stable résumé URLs handed back to clients.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    /// Upload preset: the object-storage namespace résumés are written under.
    pub resume_upload_preset: String,
    pub question_count: u32,
    pub min_recording_secs: u64,
    pub min_answer_chars: usize,
    /// Pause between a confirmed save and advancing the flow.
    pub advance_delay: Duration,
    /// Running attempts untouched for this long are discarded.
    pub session_idle: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_endpoint = require_env("S3_ENDPOINT")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_public_url: std::env::var("S3_PUBLIC_URL").unwrap_or_else(|_| s3_endpoint.clone()),
            s3_endpoint,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            resume_upload_preset: std::env::var("RESUME_UPLOAD_PRESET")
                .unwrap_or_else(|_| "resumes".to_string()),
            question_count: parse_env("INTERVIEW_QUESTION_COUNT", 5)?,
            min_recording_secs: parse_env("MIN_RECORDING_SECS", 30)?,
            min_answer_chars: parse_env("MIN_ANSWER_CHARS", 30)?,
            advance_delay: Duration::from_millis(parse_env("ADVANCE_DELAY_MS", 500)?),
            session_idle: Duration::from_secs(parse_env("SESSION_IDLE_SECS", 1800)?),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional numeric variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
