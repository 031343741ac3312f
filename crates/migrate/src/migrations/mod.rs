//! Migration System
//!
//! Discovers migration units on disk, tracks which ones are applied in a
//! bookkeeping table, and applies or reverts them one transaction at a time.

pub mod catalog;
pub mod definitions;
pub mod executor;
pub mod rollback;
pub mod runner;
pub mod store;

pub use catalog::{normalize_name, MigrationCatalog, DOWN_SCRIPT, UP_SCRIPT};
pub use definitions::*;
pub use executor::{Bookkeeping, TransactionalExecutor};
pub use rollback::MigrationRollback;
pub use runner::MigrationRunner;
pub use store::MigrationStore;
