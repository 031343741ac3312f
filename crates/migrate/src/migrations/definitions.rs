//! Migration Definitions - Core types shared by the catalog, store and runner

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ordering key of a migration unit (milliseconds since the Unix epoch at creation)
pub type MigrationKey = i64;

/// A named, ordered pair of change scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationUnit {
    /// Unique, totally ordered identifier
    pub key: MigrationKey,
    /// Human-readable name (PascalCase)
    pub name: String,
    /// SQL applied by `migrate`; may be empty
    pub up_script: String,
    /// SQL applied by `rollback`; may be empty
    pub down_script: String,
    /// Directory the scripts were read from
    #[serde(skip)]
    pub path: PathBuf,
}

impl MigrationUnit {
    /// Directory name under the catalog root: `{key}-{name}`
    pub fn dir_name(&self) -> String {
        unit_dir_name(self.key, &self.name)
    }
}

pub(crate) fn unit_dir_name(key: MigrationKey, name: &str) -> String {
    format!("{}-{}", key, name)
}

/// One row of the bookkeeping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRecord {
    pub key: MigrationKey,
    pub name: String,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run the up script)
    Up,
    /// Revert the migration (run the down script)
    Down,
}

impl MigrationDirection {
    /// Log label for a completed step
    pub fn action(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "MIGRATED",
            MigrationDirection::Down => "REVERTED",
        }
    }
}

/// Options for `rollback`
#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackOptions {
    /// Revert every applied migration instead of only the most recent one
    pub all: bool,
}

/// Result of running migrations
#[derive(Debug, Default)]
pub struct MigrationRunResult {
    /// Keys applied by this run, in order
    pub applied: Vec<MigrationKey>,
    /// Pending keys skipped because their up script is empty
    pub skipped_empty: Vec<MigrationKey>,
    /// Number of catalog units that were already applied
    pub already_applied: usize,
}

/// Result of rolling back migrations
#[derive(Debug, Default)]
pub struct RollbackResult {
    /// Keys reverted by this run, most recent first
    pub reverted: Vec<MigrationKey>,
    /// Applied keys skipped because their down script is empty
    pub skipped_empty: Vec<MigrationKey>,
}

/// Status of one migration, as reported by `status`
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub key: MigrationKey,
    pub name: String,
    pub applied: bool,
    /// Applied in the database but no longer present in the catalog
    pub missing: bool,
}

/// Whether a script has nothing to execute
pub fn is_empty_script(script: &str) -> bool {
    script.trim().is_empty()
}
