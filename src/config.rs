use std::env;

use crate::error::AppError;
use crate::flow::lifecycle::CodePolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub event_buffer_size: usize,
    pub code_policy: CodePolicy,
    pub public_base_url: String,
    pub max_photo_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            json_logs: false,
            event_buffer_size: 1024,
            code_policy: CodePolicy::Verify,
            public_base_url: "http://localhost:3000".to_string(),
            max_photo_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logs: parse_or_default("LOG_JSON", defaults.json_logs)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            code_policy: parse_or_default("CODE_POLICY", defaults.code_policy)?,
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            max_photo_bytes: parse_or_default("MAX_PHOTO_BYTES", defaults.max_photo_bytes)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
