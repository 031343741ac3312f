//! Structured logging setup
//!
//! Thin wrapper over `tracing-subscriber`. `RUST_LOG` always wins over the
//! configured filter.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Emit one JSON object per event instead of plain text
    pub json_format: bool,
    /// Environment filter (supports directives like "tidemark_migrate=debug,sqlx=warn")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Plain text at the given level, with sqlx statement logging quietened
    pub fn cli(level: &str) -> Self {
        Self {
            level: level.to_string(),
            json_format: false,
            env_filter: Some(format!("{},sqlx=warn", level)),
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json_format = json;
        self
    }

    /// The filter directive that applies when `RUST_LOG` is unset
    pub fn directive(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(&self.level)
    }
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config.directive()))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).with_target(false))
            .try_init()?;
    }

    tracing::debug!(
        "Logging initialized (filter: {}, format: {})",
        config.directive(),
        if config.json_format { "JSON" } else { "text" }
    );

    Ok(())
}
