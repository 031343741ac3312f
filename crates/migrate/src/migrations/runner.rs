//! Migration Runner - Applies pending migrations in key order
//!
//! Ties together the catalog (what exists), the store (what is applied) and
//! the executor (how a single step runs). Units are processed strictly one
//! after another; the first failure aborts the run and leaves everything
//! committed before it in place.

use super::catalog::MigrationCatalog;
use super::definitions::{is_empty_script, MigrationRunResult, MigrationStatus};
use super::executor::{Bookkeeping, TransactionalExecutor};
use super::store::MigrationStore;
use crate::config::MigrateConfig;
use crate::database::Database;
use crate::error::MigrateResult;

/// Migration runner that executes migrations against a database
pub struct MigrationRunner {
    catalog: MigrationCatalog,
    store: MigrationStore,
    executor: TransactionalExecutor,
    db: Database,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(catalog: MigrationCatalog, store: MigrationStore, db: Database) -> Self {
        let executor = TransactionalExecutor::new(db.clone(), store.clone());
        Self {
            catalog,
            store,
            executor,
            db,
        }
    }

    /// Connect to the configured database and build a runner around it
    pub async fn from_config(config: &MigrateConfig) -> MigrateResult<Self> {
        let db = Database::connect(&config.database()?).await?;
        Ok(Self::new(
            MigrationCatalog::new(&config.migrations_dir),
            MigrationStore::new(&config.migrations_table),
            db,
        ))
    }

    pub fn catalog(&self) -> &MigrationCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &MigrationStore {
        &self.store
    }

    pub fn executor(&self) -> &TransactionalExecutor {
        &self.executor
    }

    /// Get the database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Apply every pending migration in ascending key order
    ///
    /// A pending unit whose up script is empty is skipped without being
    /// recorded, so it stays pending on every later run.
    pub async fn migrate(&self) -> MigrateResult<MigrationRunResult> {
        self.store.ensure_schema(&self.db).await?;

        let units = self.catalog.list()?;
        let applied_keys = self.store.list_applied_keys(&self.db).await?;

        let mut result = MigrationRunResult::default();
        for unit in units {
            if applied_keys.contains(&unit.key) {
                result.already_applied += 1;
                continue;
            }

            if is_empty_script(&unit.up_script) {
                tracing::warn!(
                    "Skipping migration {}-{}: up script is empty",
                    unit.key,
                    unit.name
                );
                result.skipped_empty.push(unit.key);
                continue;
            }

            self.executor
                .run(
                    &unit.up_script,
                    Bookkeeping::Record {
                        key: unit.key,
                        name: unit.name.clone(),
                    },
                    &unit.name,
                )
                .await?;
            result.applied.push(unit.key);
        }

        tracing::debug!(
            "Migrate finished: {} applied, {} skipped, {} already applied",
            result.applied.len(),
            result.skipped_empty.len(),
            result.already_applied
        );

        Ok(result)
    }

    /// Every catalog unit with its applied flag, followed by applied records
    /// whose unit is missing from the catalog
    pub async fn status(&self) -> MigrateResult<Vec<MigrationStatus>> {
        self.store.ensure_schema(&self.db).await?;

        let units = self.catalog.list()?;
        let applied = self.store.list_applied(&self.db).await?;

        let mut statuses: Vec<MigrationStatus> = units
            .iter()
            .map(|unit| MigrationStatus {
                key: unit.key,
                name: unit.name.clone(),
                applied: applied.iter().any(|record| record.key == unit.key),
                missing: false,
            })
            .collect();

        statuses.extend(
            applied
                .into_iter()
                .filter(|record| !units.iter().any(|unit| unit.key == record.key))
                .map(|record| MigrationStatus {
                    key: record.key,
                    name: record.name,
                    applied: true,
                    missing: true,
                }),
        );

        Ok(statuses)
    }
}
