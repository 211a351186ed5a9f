//! Migration Rollback - Reverses applied migrations
//!
//! Targets are chosen by ledger insertion order, not by timestamp, so the
//! most recently applied migration is always the first one undone.

use std::time::Instant;

use crate::error::{MigrationError, MigrationResult};

use super::definitions::{MigrationDirection, RollbackResult};
use super::runner::Migrator;

impl Migrator {
    /// Roll back the last `steps` applied migrations, newest first.
    ///
    /// `steps <= 0` or more than the number applied rolls back everything.
    pub async fn down(&self, steps: i64) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();

        self.ledger().ensure(self.pool()).await?;
        let applied = self.ledger().list_applied(self.pool()).await?;

        if applied.is_empty() {
            tracing::debug!("ledger is empty, nothing to roll back");
            return Ok(RollbackResult {
                execution_time_ms: start_time.elapsed().as_millis(),
                ..Default::default()
            });
        }

        let count = clamp_steps(steps, applied.len());
        let set = self.manager().load_migrations()?;

        let mut rolled_back_migrations = Vec::with_capacity(count);
        for identity in applied.iter().rev().take(count) {
            let migration = set
                .by_identity(identity)
                .map_err(|_| MigrationError::MigrationFileMissing {
                    identity: identity.clone(),
                })?;

            if !migration.is_reversible() {
                return Err(MigrationError::NoDownScript {
                    identity: identity.clone(),
                });
            }

            tracing::debug!(identity = %identity, "rolling back migration");
            self.run_migration(migration, MigrationDirection::Down)
                .await?;
            rolled_back_migrations.push(identity.clone());
        }

        tracing::info!(count = rolled_back_migrations.len(), "migrations rolled back");

        Ok(RollbackResult {
            rolled_back_count: rolled_back_migrations.len(),
            rolled_back_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}

fn clamp_steps(steps: i64, applied: usize) -> usize {
    match usize::try_from(steps) {
        Ok(n) if n > 0 && n <= applied => n,
        _ => applied,
    }
}
