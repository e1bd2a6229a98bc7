//! Configuration for citizen-store.
//!
//! The environment is read exactly once, in [`Config::from_env`]; everything
//! downstream receives the resulting values explicitly.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// File used by the embedded backend when no database URL is configured.
pub const DEFAULT_SQLITE_PATH: &str = "citizenconnect.db";

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database: DatabaseConfig::from_env()?,
        })
    }
}

/// Which engine a [`DatabaseConfig`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Postgres,
    Sqlite,
}

/// Database configuration.
///
/// A non-empty `DATABASE_URL` selects PostgreSQL. Without one, the embedded
/// SQLite file at `sqlite_path` is used.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<SecretString>,
    pub sqlite_path: PathBuf,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = optional_env("DATABASE_URL")?;
        Ok(Self::from_parts(url))
    }

    fn from_parts(url: Option<String>) -> Self {
        Self {
            url: url
                .filter(|u| !u.trim().is_empty())
                .map(SecretString::from),
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
        }
    }

    /// Config for tests: a `postgres://` / `postgresql://` URL selects
    /// PostgreSQL, anything else is treated as a SQLite file path.
    pub fn for_test(target: &str) -> Self {
        if is_postgres_url(target) {
            Self::from_parts(Some(target.to_string()))
        } else {
            Self {
                url: None,
                sqlite_path: PathBuf::from(target),
            }
        }
    }

    /// Backend selected by this config.
    pub fn kind(&self) -> DbKind {
        if self.url.is_some() {
            DbKind::Postgres
        } else {
            DbKind::Sqlite
        }
    }

    /// Get the database URL (exposes the secret).
    pub fn url(&self) -> Option<&str> {
        self.url.as_ref().map(|u| u.expose_secret())
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }
}

fn is_postgres_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("postgres://") || s.starts_with("postgresql://")
}

// Helper functions

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.trim().is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}
