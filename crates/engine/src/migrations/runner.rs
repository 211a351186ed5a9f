//! Migration Runner - Executes migrations against the database
//!
//! Every migration runs in its own transaction together with the ledger
//! write that records it, so a migration is either fully applied and
//! recorded or not applied at all. Runs stop at the first failure; earlier
//! commits are kept.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::backends::{AnyDatabasePool, DatabasePool, DatabasePoolConfig, DatabaseTransaction};
use crate::error::{MigrationError, MigrationResult};

use super::definitions::{
    CreatedMigration, Migration, MigrationConfig, MigrationDirection, MigrationRunResult,
    MigrationStatus, MigrationStatusEntry, StatusReport,
};
use super::ledger::Ledger;
use super::manager::MigrationManager;
use super::statements::split_statements;

/// Applies, rolls back and reports on migrations for one database
pub struct Migrator {
    manager: MigrationManager,
    pool: Arc<dyn DatabasePool>,
    ledger: Ledger,
}

impl Migrator {
    /// Create a migrator over an existing pool
    pub fn new(config: MigrationConfig, pool: Arc<dyn DatabasePool>) -> Self {
        let ledger = Ledger::new(config.migrations_table.clone(), pool.sql_dialect());
        Self {
            manager: MigrationManager::with_config(config),
            pool,
            ledger,
        }
    }

    /// Connect to `database_url` and create a migrator
    pub async fn connect(config: MigrationConfig, database_url: &str) -> MigrationResult<Self> {
        let pool =
            AnyDatabasePool::connect_with(database_url, DatabasePoolConfig::default()).await?;
        Ok(Self::new(config, Arc::new(pool)))
    }

    pub fn pool(&self) -> &dyn DatabasePool {
        self.pool.as_ref()
    }

    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply every pending migration in timestamp order
    pub async fn up(&self) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();

        self.ledger.ensure(self.pool()).await?;
        let set = self.manager.load_migrations()?;
        let applied: HashSet<String> = self
            .ledger
            .list_applied(self.pool())
            .await?
            .into_iter()
            .collect();

        let pending = set.pending(&applied);
        let skipped_count = set.len() - pending.len();

        if pending.is_empty() {
            tracing::debug!("no pending migrations");
            return Ok(MigrationRunResult {
                skipped_count,
                execution_time_ms: start_time.elapsed().as_millis(),
                ..Default::default()
            });
        }

        tracing::info!(count = pending.len(), "found pending migrations");

        let mut applied_migrations = Vec::with_capacity(pending.len());
        for migration in pending {
            tracing::debug!(identity = %migration.identity, "applying migration");
            self.run_migration(migration, MigrationDirection::Up).await?;
            applied_migrations.push(migration.identity.clone());
        }

        tracing::info!(count = applied_migrations.len(), "migrations applied");

        Ok(MigrationRunResult {
            applied_count: applied_migrations.len(),
            applied_migrations,
            skipped_count,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Report which on-disk migrations are applied or pending
    pub async fn status(&self) -> MigrationResult<StatusReport> {
        self.ledger.ensure(self.pool()).await?;
        let set = self.manager.load_migrations()?;
        let applied = self.ledger.list_applied(self.pool()).await?;
        let applied_ids: HashSet<&str> = applied.iter().map(String::as_str).collect();

        let migrations: Vec<MigrationStatusEntry> = set
            .iter()
            .map(|m| MigrationStatusEntry {
                identity: m.identity.clone(),
                status: if applied_ids.contains(m.identity.as_str()) {
                    MigrationStatus::Applied
                } else {
                    MigrationStatus::Pending
                },
            })
            .collect();

        let orphaned: Vec<String> = applied
            .iter()
            .filter(|identity| !set.contains(identity))
            .cloned()
            .collect();
        if !orphaned.is_empty() {
            tracing::warn!(
                count = orphaned.len(),
                "ledger contains migrations with no file on disk"
            );
        }

        let applied_count = migrations
            .iter()
            .filter(|entry| entry.status == MigrationStatus::Applied)
            .count();

        Ok(StatusReport {
            total: migrations.len(),
            applied: applied_count,
            pending: migrations.len() - applied_count,
            migrations,
            orphaned,
        })
    }

    /// Write a new up/down migration pair
    pub fn create(&self, name: &str) -> MigrationResult<CreatedMigration> {
        self.manager.create_migration(name)
    }

    /// Run one migration in `direction` inside a single transaction.
    ///
    /// The transaction is rolled back on any failure; an error from that
    /// rollback is logged and the original error is returned. Each commit is
    /// logged at `info`, so a run that stops early still reports what it kept.
    pub(crate) async fn run_migration(
        &self,
        migration: &Migration,
        direction: MigrationDirection,
    ) -> MigrationResult<()> {
        let mut tx = self
            .pool
            .begin_transaction()
            .await
            .map_err(|source| MigrationError::Transaction {
                identity: migration.identity.clone(),
                direction,
                source,
            })?;

        if let Err(e) = self
            .execute_in_transaction(tx.as_mut(), migration, direction)
            .await
        {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(
                    identity = %migration.identity,
                    %direction,
                    "failed to roll back transaction: {}",
                    rollback_error
                );
            }
            return Err(e);
        }

        tx.commit()
            .await
            .map_err(|source| MigrationError::Transaction {
                identity: migration.identity.clone(),
                direction,
                source,
            })?;

        tracing::info!(identity = %migration.identity, %direction, "migration committed");
        Ok(())
    }

    async fn execute_in_transaction(
        &self,
        tx: &mut dyn DatabaseTransaction,
        migration: &Migration,
        direction: MigrationDirection,
    ) -> MigrationResult<()> {
        let sql = match direction {
            MigrationDirection::Up => &migration.up_sql,
            MigrationDirection::Down => &migration.down_sql,
        };

        let statements = split_statements(
            sql,
            self.manager.config().splitter,
            self.pool.sql_dialect(),
        );

        for statement in statements {
            tracing::debug!(identity = %migration.identity, "executing: {}", statement);
            if let Err(source) = tx.execute(&statement, &[]).await {
                return Err(MigrationError::Statement {
                    identity: migration.identity.clone(),
                    direction,
                    statement,
                    source,
                });
            }
        }

        let recorded = match direction {
            MigrationDirection::Up => {
                self.ledger
                    .record_applied(tx, &migration.identity, &migration.checksum)
                    .await
            }
            MigrationDirection::Down => self
                .ledger
                .record_removed(tx, &migration.identity)
                .await
                .map(|_| ()),
        };

        recorded.map_err(|source| MigrationError::LedgerWrite {
            identity: migration.identity.clone(),
            direction,
            source,
        })
    }
}
