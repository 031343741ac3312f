//! # tidemark-migrate
//!
//! Ordered, versioned SQL migrations for PostgreSQL and SQLite.
//!
//! Each migration unit is a directory `{key}-{Name}` holding an `up.sql` and
//! a `down.sql`. Applied units are recorded in a bookkeeping table inside the
//! target database, written in the same transaction as the script itself, so
//! re-running `migrate` only ever applies what is still pending.

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod migrations;

pub use config::{ConfigError, DatabaseConfig, MigrateConfig};
pub use database::Database;
pub use error::{MigrateError, MigrateResult};
pub use logging::{init_logging, LoggingConfig};
pub use migrations::*;
