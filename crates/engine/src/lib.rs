//! # migr8-engine: SQL migration engine
//!
//! Loads timestamped `up`/`down` SQL scripts from a directory, compares them
//! with the ledger table in the target database and applies or rolls them
//! back one transaction per migration.
//!
//! ```no_run
//! use migr8_engine::{MigrationConfig, Migrator};
//!
//! # async fn run() -> migr8_engine::MigrationResult<()> {
//! let migrator = Migrator::connect(MigrationConfig::default(), "sqlite://app.db?mode=rwc").await?;
//! let result = migrator.up().await?;
//! println!("applied {} migrations", result.applied_count);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod error;
pub mod migrations;

pub use backends::{
    AnyDatabasePool, DatabasePool, DatabasePoolConfig, DatabaseRow, DatabaseTransaction,
    DatabaseValue, SqlDialect,
};
pub use error::*;
pub use migrations::*;
