//! Migration System
//!
//! Discovery of migration files, the applied-state ledger and the
//! [`Migrator`] that ties them to a database.

pub mod definitions;
pub mod ledger;
pub mod manager;
pub mod rollback;
pub mod runner;
pub mod set;
pub mod statements;
pub mod verify;

pub use definitions::*;
pub use ledger::Ledger;
pub use manager::{slugify, MigrationManager};
pub use runner::Migrator;
pub use set::MigrationSet;
pub use statements::split_statements;
