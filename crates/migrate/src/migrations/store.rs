//! Migration Store - Bookkeeping table inside the target database
//!
//! One row per applied migration. The mutating operations take a connection
//! borrowed from an open transaction so that the row and the schema change
//! commit or roll back together.

use std::collections::BTreeSet;

use sqlx::{AnyConnection, Row};

use super::definitions::{AppliedRecord, MigrationKey};
use crate::database::Database;
use crate::error::{MigrateError, MigrateResult};

/// Applied-migration bookkeeping for one table
#[derive(Debug, Clone)]
pub struct MigrationStore {
    table: String,
}

impl MigrationStore {
    /// `table` must be a plain identifier; `MigrateConfig` validates it
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the bookkeeping table if it does not exist yet
    pub async fn ensure_schema(&self, db: &Database) -> MigrateResult<()> {
        let mut conn = db.acquire().await?;
        sqlx::query(&self.create_table_sql())
            .execute(&mut *conn)
            .await
            .map_err(MigrateError::Bookkeeping)?;
        Ok(())
    }

    /// Every applied record, ascending by key
    pub async fn list_applied(&self, db: &Database) -> MigrateResult<Vec<AppliedRecord>> {
        let mut conn = db.acquire().await?;
        let rows = sqlx::query(&self.list_applied_sql())
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrateError::Bookkeeping)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let key: i64 = row.try_get("key").map_err(MigrateError::Bookkeeping)?;
            let name: String = row.try_get("name").map_err(MigrateError::Bookkeeping)?;
            records.push(AppliedRecord { key, name });
        }

        Ok(records)
    }

    /// Keys currently recorded as applied
    pub async fn list_applied_keys(&self, db: &Database) -> MigrateResult<BTreeSet<MigrationKey>> {
        Ok(self
            .list_applied(db)
            .await?
            .into_iter()
            .map(|record| record.key)
            .collect())
    }

    /// Insert the row for `key`; only called inside the executor's transaction
    pub(crate) async fn record_applied(
        &self,
        conn: &mut AnyConnection,
        key: MigrationKey,
        name: &str,
    ) -> MigrateResult<()> {
        sqlx::query(&self.record_applied_sql())
            .bind(key)
            .bind(name)
            .execute(conn)
            .await
            .map_err(MigrateError::Bookkeeping)?;
        Ok(())
    }

    /// Delete the row for `key`; only called inside the executor's transaction
    pub(crate) async fn remove_applied(
        &self,
        conn: &mut AnyConnection,
        key: MigrationKey,
    ) -> MigrateResult<()> {
        sqlx::query(&self.remove_applied_sql())
            .bind(key)
            .execute(conn)
            .await
            .map_err(MigrateError::Bookkeeping)?;
        Ok(())
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                \"key\" BIGINT NOT NULL UNIQUE,\n    \
                name TEXT NOT NULL\n\
            )",
            self.table
        )
    }

    fn list_applied_sql(&self) -> String {
        format!("SELECT \"key\", name FROM {} ORDER BY \"key\"", self.table)
    }

    fn record_applied_sql(&self) -> String {
        format!("INSERT INTO {} (\"key\", name) VALUES ($1, $2)", self.table)
    }

    fn remove_applied_sql(&self) -> String {
        format!("DELETE FROM {} WHERE \"key\" = $1", self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_sql_generation() {
        let store = MigrationStore::new("schema_history");

        let create_sql = store.create_table_sql();
        assert!(create_sql.contains("CREATE TABLE IF NOT EXISTS schema_history"));
        assert!(create_sql.contains("\"key\" BIGINT NOT NULL UNIQUE"));
        assert!(create_sql.contains("name TEXT NOT NULL"));

        assert_eq!(
            store.record_applied_sql(),
            "INSERT INTO schema_history (\"key\", name) VALUES ($1, $2)"
        );
        assert_eq!(
            store.remove_applied_sql(),
            "DELETE FROM schema_history WHERE \"key\" = $1"
        );
        assert!(store.list_applied_sql().ends_with("ORDER BY \"key\""));
    }
}
