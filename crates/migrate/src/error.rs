//! Error types for the migration system
//!
//! Every failure is fatal to the current invocation. Database errors raised by
//! a script or by the bookkeeping write are passed through untouched so the
//! user sees the driver's own message.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Result type alias for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error types for migration operations
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The migrations root could not be read
    #[error("Failed to read migrations from {}: {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog contents are inconsistent (e.g. a duplicated key)
    #[error("Invalid migration catalog: {message}")]
    InvalidCatalog { message: String },

    /// A new migration unit could not be scaffolded
    #[error("Failed to create migration at {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The migration title normalizes to nothing usable
    #[error("Invalid migration name: '{title}'")]
    InvalidName { title: String },

    /// Pool construction, connection acquisition, begin or commit failed
    #[error(transparent)]
    Connection(sqlx::Error),

    /// The up/down script was rejected by the database
    #[error(transparent)]
    Script(sqlx::Error),

    /// Inserting or deleting the applied record failed
    #[error(transparent)]
    Bookkeeping(sqlx::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl MigrateError {
    /// Whether this error came from the database driver
    pub fn is_database(&self) -> bool {
        matches!(
            self,
            MigrateError::Connection(_) | MigrateError::Script(_) | MigrateError::Bookkeeping(_)
        )
    }
}
