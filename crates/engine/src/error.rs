//! Error types for the migration engine
//!
//! Load failures are kept apart from execution failures so callers can tell
//! "nothing ran" from "something ran and then failed".

use std::path::PathBuf;

use thiserror::Error;

use crate::migrations::definitions::MigrationDirection;

/// Result type alias for engine operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Result type alias for backend operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised while discovering migrations on disk
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read migration directory {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read migration file {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing up migration for {identity}")]
    MissingUpScript { identity: String },
}

/// Errors raised by a database backend
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),
}

/// Errors raised by the migrator
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("migration not found: {identity}")]
    NotFound { identity: String },

    #[error("failed to {direction} migration {identity}: failed to execute statement '{statement}': {source}")]
    Statement {
        identity: String,
        direction: MigrationDirection,
        statement: String,
        #[source]
        source: DatabaseError,
    },

    #[error("migration file missing for applied migration {identity}")]
    MigrationFileMissing { identity: String },

    #[error("migration {identity} has no down migration")]
    NoDownScript { identity: String },

    #[error("failed to update ledger for {direction} of migration {identity}: {source}")]
    LedgerWrite {
        identity: String,
        direction: MigrationDirection,
        #[source]
        source: DatabaseError,
    },

    #[error("ledger {operation} failed: {source}")]
    Ledger {
        operation: &'static str,
        #[source]
        source: DatabaseError,
    },

    #[error("transaction failed during {direction} of migration {identity}: {source}")]
    Transaction {
        identity: String,
        direction: MigrationDirection,
        #[source]
        source: DatabaseError,
    },

    #[error("migration file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl MigrationError {
    /// The migration identity this error is attached to, if any
    pub fn identity(&self) -> Option<&str> {
        match self {
            MigrationError::Load(LoadError::MissingUpScript { identity })
            | MigrationError::NotFound { identity }
            | MigrationError::Statement { identity, .. }
            | MigrationError::MigrationFileMissing { identity }
            | MigrationError::NoDownScript { identity }
            | MigrationError::LedgerWrite { identity, .. }
            | MigrationError::Transaction { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Whether the error happened before anything was executed
    pub fn is_load_error(&self) -> bool {
        matches!(self, MigrationError::Load(_))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Query(err.to_string())
    }
}
