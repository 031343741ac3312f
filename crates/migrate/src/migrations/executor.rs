//! Transactional Executor - Runs one script and its bookkeeping write atomically
//!
//! The script and the insert/delete of the applied record share a single
//! transaction on a single pooled connection. Either both commit or neither
//! does, so the store never disagrees with the schema.

use sqlx::Executor;

use super::definitions::{MigrationDirection, MigrationKey};
use super::store::MigrationStore;
use crate::database::Database;
use crate::error::{MigrateError, MigrateResult};

/// Store mutation performed alongside a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bookkeeping {
    /// Mark a unit as applied
    Record { key: MigrationKey, name: String },
    /// Mark a unit as no longer applied
    Remove { key: MigrationKey },
}

impl Bookkeeping {
    pub fn key(&self) -> MigrationKey {
        match self {
            Bookkeeping::Record { key, .. } | Bookkeeping::Remove { key } => *key,
        }
    }

    fn direction(&self) -> MigrationDirection {
        match self {
            Bookkeeping::Record { .. } => MigrationDirection::Up,
            Bookkeeping::Remove { .. } => MigrationDirection::Down,
        }
    }
}

/// Executes scripts against the target database
#[derive(Debug, Clone)]
pub struct TransactionalExecutor {
    db: Database,
    store: MigrationStore,
}

impl TransactionalExecutor {
    pub fn new(db: Database, store: MigrationStore) -> Self {
        Self { db, store }
    }

    /// Run `script` and apply `bookkeeping` in one transaction
    ///
    /// On failure the transaction is rolled back and the original error is
    /// returned. The connection goes back to the pool when the transaction
    /// is dropped, whichever way this returns.
    pub async fn run(
        &self,
        script: &str,
        bookkeeping: Bookkeeping,
        unit_name: &str,
    ) -> MigrateResult<()> {
        let mut tx = self.db.begin().await?;

        let outcome: MigrateResult<()> = async {
            (&mut *tx)
                .execute(script)
                .await
                .map_err(MigrateError::Script)?;

            match &bookkeeping {
                Bookkeeping::Record { key, name } => {
                    self.store.record_applied(&mut tx, *key, name).await
                }
                Bookkeeping::Remove { key } => self.store.remove_applied(&mut tx, *key).await,
            }
        }
        .await;

        if let Err(e) = outcome {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    "Failed to roll back migration {}: {}",
                    bookkeeping.key(),
                    rollback_err
                );
            }
            return Err(e);
        }

        tx.commit().await.map_err(MigrateError::Connection)?;

        tracing::info!(
            key = bookkeeping.key(),
            name = %unit_name,
            "{}",
            bookkeeping.direction().action()
        );

        Ok(())
    }
}
