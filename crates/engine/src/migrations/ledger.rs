//! Applied-state ledger
//!
//! A single table in the target database recording which migrations are
//! applied, in insertion order. Rows are appended on apply and deleted on
//! rollback; they are never updated. The identity column is named
//! `filename` so ledgers written by older releases stay readable.

use crate::backends::{DatabasePool, DatabaseTransaction, DatabaseValue, SqlDialect};
use crate::error::{DatabaseResult, MigrationError, MigrationResult};

use super::definitions::LedgerEntry;

/// SQL adapter for the ledger table
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
    dialect: SqlDialect,
}

impl Ledger {
    pub fn new(table: impl Into<String>, dialect: SqlDialect) -> Self {
        Self {
            table: table.into(),
            dialect,
        }
    }

    /// Create the ledger table and its index if they are absent
    pub async fn ensure(&self, pool: &dyn DatabasePool) -> MigrationResult<()> {
        for sql in self.create_table_sql() {
            pool.execute(&sql, &[])
                .await
                .map_err(|source| MigrationError::Ledger {
                    operation: "create",
                    source,
                })?;
        }
        Ok(())
    }

    /// Applied identities in insertion order
    pub async fn list_applied(&self, pool: &dyn DatabasePool) -> MigrationResult<Vec<String>> {
        Ok(self
            .list_entries(pool)
            .await?
            .into_iter()
            .map(|entry| entry.identity)
            .collect())
    }

    /// Applied identities with their recorded checksums, in insertion order
    pub async fn list_entries(&self, pool: &dyn DatabasePool) -> MigrationResult<Vec<LedgerEntry>> {
        let read_error = |source| MigrationError::Ledger {
            operation: "read",
            source,
        };

        let rows = pool
            .fetch_all(&self.select_sql(), &[])
            .await
            .map_err(read_error)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let identity = row
                .get_by_index(0)
                .and_then(DatabaseValue::into_string)
                .map_err(read_error)?;
            let checksum = row
                .get_by_index(1)
                .and_then(DatabaseValue::into_string)
                .map_err(read_error)?;
            entries.push(LedgerEntry { identity, checksum });
        }
        Ok(entries)
    }

    /// Append a ledger row inside `tx`
    pub async fn record_applied(
        &self,
        tx: &mut dyn DatabaseTransaction,
        identity: &str,
        checksum: &str,
    ) -> DatabaseResult<()> {
        tx.execute(&self.insert_sql(), &[identity.into(), checksum.into()])
            .await?;
        Ok(())
    }

    /// Delete the ledger row for `identity` inside `tx`; absent rows are a no-op
    pub async fn record_removed(
        &self,
        tx: &mut dyn DatabaseTransaction,
        identity: &str,
    ) -> DatabaseResult<u64> {
        tx.execute(&self.delete_sql(), &[identity.into()]).await
    }

    /// DDL creating the ledger table and identity index
    pub fn create_table_sql(&self) -> Vec<String> {
        let table = &self.table;
        let index = format!("idx_{}_filename", table.replace('.', "_"));

        match self.dialect {
            SqlDialect::PostgreSQL => vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (\n    \
                        id SERIAL PRIMARY KEY,\n    \
                        filename VARCHAR(255) NOT NULL UNIQUE,\n    \
                        applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,\n    \
                        checksum VARCHAR(32) NOT NULL\n\
                    )",
                    table
                ),
                format!("CREATE INDEX IF NOT EXISTS {} ON {}(filename)", index, table),
            ],
            SqlDialect::MySQL => vec![format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                    id INT AUTO_INCREMENT PRIMARY KEY,\n    \
                    filename VARCHAR(255) NOT NULL UNIQUE,\n    \
                    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,\n    \
                    checksum VARCHAR(32) NOT NULL,\n    \
                    INDEX {} (filename)\n\
                ) ENGINE=InnoDB",
                table, index
            )],
            SqlDialect::SQLite => vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (\n    \
                        id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
                        filename TEXT NOT NULL UNIQUE,\n    \
                        applied_at DATETIME DEFAULT CURRENT_TIMESTAMP,\n    \
                        checksum TEXT NOT NULL\n\
                    )",
                    table
                ),
                format!("CREATE INDEX IF NOT EXISTS {} ON {}(filename)", index, table),
            ],
        }
    }

    pub fn select_sql(&self) -> String {
        format!("SELECT filename, checksum FROM {} ORDER BY id", self.table)
    }

    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (filename, checksum) VALUES ({}, {})",
            self.table,
            self.dialect.parameter_placeholder(0),
            self.dialect.parameter_placeholder(1)
        )
    }

    pub fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE filename = {}",
            self.table,
            self.dialect.parameter_placeholder(0)
        )
    }
}
