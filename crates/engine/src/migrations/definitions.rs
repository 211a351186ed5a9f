//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the fundamental types used throughout the migration system:
//! the parsed [`Migration`] record, the ledger entry, the migrator
//! configuration and the result/report types returned by each operation.

use chrono::NaiveDateTime;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A migration discovered on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Unique identifier, `<14-digit timestamp>_<slug>`
    pub identity: String,
    /// Time parsed from the identity prefix; only used for ordering
    pub timestamp: NaiveDateTime,
    /// SQL statements to apply the migration
    pub up_sql: String,
    /// SQL statements to roll back the migration (empty when irreversible)
    pub down_sql: String,
    /// MD5 of `up_sql`, lowercase hex
    pub checksum: String,
    /// Location of the up script
    pub source_path: PathBuf,
}

impl Migration {
    /// Whether this migration can be rolled back
    pub fn is_reversible(&self) -> bool {
        !self.down_sql.is_empty()
    }
}

/// Compute the content fingerprint of an up script
pub fn checksum(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// A row of the applied-state ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub identity: String,
    pub checksum: String,
}

/// How migration scripts are split into executable statements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementSplitter {
    /// Split on every `;`
    #[default]
    Naive,
    /// Parse with sqlparser, falling back to `Naive` on parse errors
    Parsed,
}

impl std::str::FromStr for StatementSplitter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "naive" => Ok(StatementSplitter::Naive),
            "parsed" => Ok(StatementSplitter::Parsed),
            _ => Err(format!("unknown statement splitter: {}", s)),
        }
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
    /// Statement splitting strategy
    pub splitter: StatementSplitter,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("./migrations"),
            migrations_table: "schema_migrations".to_string(),
            splitter: StatementSplitter::Naive,
        }
    }
}

/// Result of running migrations
#[derive(Debug, Default, Serialize)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// Identities of migrations that were applied, in application order
    pub applied_migrations: Vec<String>,
    /// Number of migrations that were already applied
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of rolling back migrations
#[derive(Debug, Default, Serialize)]
pub struct RollbackResult {
    /// Number of migrations that were rolled back
    pub rolled_back_count: usize,
    /// Identities of migrations that were rolled back, in rollback order
    pub rolled_back_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    /// Apply the migration (run UP statements)
    Up,
    /// Rollback the migration (run DOWN statements)
    Down,
}

impl std::fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "apply"),
            MigrationDirection::Down => write!(f, "rollback"),
        }
    }
}

/// Migration status in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// On disk, not recorded in the ledger
    Pending,
    /// Recorded in the ledger
    Applied,
}

/// Status of one on-disk migration
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatusEntry {
    pub identity: String,
    pub status: MigrationStatus,
}

/// Report returned by `Migrator::status`
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// Every on-disk migration in set order
    pub migrations: Vec<MigrationStatusEntry>,
    /// Ledger identities with no migration on disk, in ledger order
    pub orphaned: Vec<String>,
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
}

/// Checksum mismatch between the ledger and the file on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumMismatch {
    pub identity: String,
    pub recorded: String,
    pub current: String,
}

/// Report returned by `Migrator::verify`
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    /// Applied migrations whose checksum still matches
    pub verified: usize,
    pub mismatched: Vec<ChecksumMismatch>,
    /// Applied identities with no migration on disk
    pub missing: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }
}

/// Files written by `MigrationManager::create_migration`
#[derive(Debug, Clone)]
pub struct CreatedMigration {
    pub identity: String,
    pub up_path: PathBuf,
    pub down_path: PathBuf,
}
