//! Checksum verification of applied migrations
//!
//! Read-only. `up` never compares checksums; this is the explicit check.

use crate::error::MigrationResult;

use super::definitions::{ChecksumMismatch, VerifyReport};
use super::runner::Migrator;

impl Migrator {
    /// Compare the checksum recorded for each applied migration with the
    /// checksum of its up script on disk
    pub async fn verify(&self) -> MigrationResult<VerifyReport> {
        self.ledger().ensure(self.pool()).await?;
        let entries = self.ledger().list_entries(self.pool()).await?;
        let set = self.manager().load_migrations()?;

        let mut report = VerifyReport::default();
        for entry in entries {
            let Ok(migration) = set.by_identity(&entry.identity) else {
                report.missing.push(entry.identity);
                continue;
            };

            if migration.checksum == entry.checksum {
                report.verified += 1;
            } else {
                tracing::warn!(identity = %entry.identity, "checksum mismatch");
                report.mismatched.push(ChecksumMismatch {
                    current: migration.checksum.clone(),
                    identity: entry.identity,
                    recorded: entry.checksum,
                });
            }
        }

        Ok(report)
    }
}
