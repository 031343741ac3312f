//! Migration Rollback - Reverts applied migrations, newest key first

use super::definitions::{is_empty_script, RollbackOptions, RollbackResult};
use super::executor::Bookkeeping;
use super::runner::MigrationRunner;
use crate::error::MigrateResult;

/// Extension trait for MigrationRunner to add rollback functionality
pub trait MigrationRollback {
    /// Revert the most recent applied migration, or all of them with `options.all`
    async fn rollback(&self, options: RollbackOptions) -> MigrateResult<RollbackResult>;
}

impl MigrationRollback for MigrationRunner {
    async fn rollback(&self, options: RollbackOptions) -> MigrateResult<RollbackResult> {
        self.store().ensure_schema(self.database()).await?;

        let applied_keys = self.store().list_applied_keys(self.database()).await?;
        let mut applied: Vec<_> = self
            .catalog()
            .list()?
            .into_iter()
            .filter(|unit| applied_keys.contains(&unit.key))
            .collect();
        applied.reverse();

        let mut result = RollbackResult::default();
        for unit in applied {
            // Only reverted units count toward the single-step limit, so an
            // empty down script lets the scan continue to the next unit.
            if !options.all && !result.reverted.is_empty() {
                break;
            }

            if is_empty_script(&unit.down_script) {
                tracing::warn!(
                    "Skipping rollback of {}-{}: down script is empty",
                    unit.key,
                    unit.name
                );
                result.skipped_empty.push(unit.key);
                continue;
            }

            self.executor()
                .run(
                    &unit.down_script,
                    Bookkeeping::Remove { key: unit.key },
                    &unit.name,
                )
                .await?;
            result.reverted.push(unit.key);
        }

        tracing::debug!(
            "Rollback finished: {} reverted, {} skipped",
            result.reverted.len(),
            result.skipped_empty.len()
        );

        Ok(result)
    }
}
