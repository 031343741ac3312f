//! Runtime configuration
//!
//! Loaded once at startup from the process environment, optionally layered
//! with a local `.env` file, and handed explicitly to the components that
//! need it.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// Database pool configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Connection string; only commands that touch the database require it
    pub database_url: Option<String>,
    /// Directory holding one sub-directory per migration unit
    pub migrations_dir: PathBuf,
    /// Table name for tracking applied migrations
    pub migrations_table: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub log_level: String,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            migrations_dir: PathBuf::from("migrations"),
            migrations_table: "migrations".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            log_level: "info".to_string(),
        }
    }
}

impl MigrateConfig {
    /// Load configuration from `.env` (if present) and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is not an error
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if let Some(dir) = lookup("MIGRATIONS_DIR") {
            config.migrations_dir = PathBuf::from(dir);
        }

        if let Some(table) = lookup("MIGRATIONS_TABLE") {
            if !is_identifier(&table) {
                return Err(ConfigError::InvalidValue {
                    field: "MIGRATIONS_TABLE".to_string(),
                    value: table,
                    expected: "a plain SQL identifier ([A-Za-z_][A-Za-z0-9_]*)".to_string(),
                });
            }
            config.migrations_table = table;
        }

        if let Some(max_str) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = match max_str.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "DATABASE_MAX_CONNECTIONS".to_string(),
                        value: max_str,
                        expected: "a positive integer".to_string(),
                    })
                }
            };
        }

        if let Some(timeout_str) = lookup("DATABASE_ACQUIRE_TIMEOUT") {
            let secs = timeout_str.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                field: "DATABASE_ACQUIRE_TIMEOUT".to_string(),
                value: timeout_str,
                expected: "a number of seconds".to_string(),
            })?;
            config.acquire_timeout = Duration::from_secs(secs);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Pool settings, failing if no connection string was configured
    pub fn database(&self) -> Result<DatabaseConfig, ConfigError> {
        let url = self
            .database_url
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "DATABASE_URL".to_string(),
                hint: "Set it in the environment or in a .env file".to_string(),
            })?;

        Ok(DatabaseConfig {
            url,
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout,
        })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
