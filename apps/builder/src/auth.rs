//! Persisted login session: the bearer token sent to the Resume Store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// JSON file holding the tokens of the logged-in user.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nobody is logged in.
    pub fn load(&self) -> Result<Option<AuthTokens>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no session file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading session file {}", self.path.display()))
            }
        };
        let tokens: AuthTokens = serde_json::from_str(&raw)
            .with_context(|| format!("parsing session file {}", self.path.display()))?;
        if tokens.access.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(tokens))
    }

    pub fn save(&self, tokens: &AuthTokens) -> Result<()> {
        let raw = serde_json::to_string_pretty(tokens)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing session file {}", self.path.display()))
    }

    /// Logs out. Missing files are fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("removing session file {}", self.path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));
        assert_eq!(store.load().unwrap(), None);

        let tokens = AuthTokens {
            access: "abc".into(),
            refresh: Some("def".into()),
        };
        store.save(&tokens).unwrap();
        assert_eq!(store.load().unwrap(), Some(tokens));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_blank_access_token_counts_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{ "access": "  " }"#).unwrap();
        assert_eq!(TokenStore::new(path).load().unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        let err = TokenStore::new(path).load().unwrap_err();
        assert!(err.to_string().contains("parsing session file"));
    }
}
