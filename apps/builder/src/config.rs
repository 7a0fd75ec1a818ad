use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::sync::SyncSettings;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_SESSION_FILE: &str = ".resume-session.json";

/// Client configuration loaded from environment variables.
/// Every variable is optional.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub session_file: PathBuf,
    pub sync: SyncSettings,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let mut sync = match optional_millis("AUTOSAVE_DELAY_MS")? {
            Some(delay) => SyncSettings::uniform(delay),
            None => SyncSettings::default(),
        };
        if let Some(ttl) = optional_millis("SAVE_NOTICE_MS")? {
            sync.notice_ttl = ttl;
        }

        Ok(Config {
            api_url: std::env::var("RESUME_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            session_file: std::env::var("RESUME_SESSION_FILE")
                .unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_string())
                .into(),
            sync,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn optional_millis(key: &str) -> Result<Option<Duration>> {
    match std::env::var(key) {
        Ok(raw) => parse_millis(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration> {
    let ms = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got '{raw}'"))?;
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_millis() {
        assert_eq!(parse_millis("X", " 250 ").unwrap(), Duration::from_millis(250));
        let err = parse_millis("AUTOSAVE_DELAY_MS", "soon").unwrap_err();
        assert!(err.to_string().contains("AUTOSAVE_DELAY_MS"));
    }
}
