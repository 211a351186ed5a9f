//! Core Database Backend Traits
//!
//! The migrator only talks to the database through these traits, so the
//! engine stays agnostic of the concrete driver. The one dialect-specific
//! concern it needs (placeholder syntax and ledger DDL) is exposed through
//! [`SqlDialect`].

use async_trait::async_trait;

use crate::error::{DatabaseError, DatabaseResult};

/// Abstract database pool
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Begin a transaction on a connection owned exclusively by the caller
    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn DatabaseTransaction>>;

    /// Execute a statement outside of any explicit transaction
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<u64>;

    /// Execute a query and return all result rows
    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>>;

    /// Round-trip a trivial query and report the latency
    async fn health_check(&self) -> DatabaseResult<std::time::Duration>;

    /// Close the pool
    async fn close(&self) -> DatabaseResult<()>;

    /// SQL dialect spoken by this pool
    fn sql_dialect(&self) -> SqlDialect;
}

/// Abstract database transaction
#[async_trait]
pub trait DatabaseTransaction: Send {
    /// Execute a statement within the transaction
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<u64>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> DatabaseResult<()>;

    /// Roll the transaction back
    async fn rollback(self: Box<Self>) -> DatabaseResult<()>;
}

/// Abstract database row
pub trait DatabaseRow: Send {
    /// Get a column value by index
    fn get_by_index(&self, index: usize) -> DatabaseResult<DatabaseValue>;
}

/// Database value enumeration for parameter binding and row access
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl DatabaseValue {
    /// Borrow the value as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Consume the value as a string, failing for any other variant
    pub fn into_string(self) -> DatabaseResult<String> {
        match self {
            DatabaseValue::String(s) => Ok(s),
            other => Err(DatabaseError::Query(format!(
                "expected a text value, got {:?}",
                other
            ))),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl SqlDialect {
    /// Get the parameter placeholder for the zero-based parameter `index`
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::MySQL | SqlDialect::SQLite => "?".to_string(),
        }
    }

    /// Detect the dialect from a database URL scheme
    pub fn from_url(url: &str) -> DatabaseResult<Self> {
        if url.starts_with("postgresql://") || url.starts_with("postgres://") {
            Ok(SqlDialect::PostgreSQL)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(SqlDialect::MySQL)
        } else if url.starts_with("sqlite:") {
            Ok(SqlDialect::SQLite)
        } else {
            Err(DatabaseError::UnsupportedUrl(format!(
                "unable to detect database backend from URL scheme: {}",
                url.split("://").next().unwrap_or(url)
            )))
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::PostgreSQL => write!(f, "postgresql"),
            SqlDialect::MySQL => write!(f, "mysql"),
            SqlDialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(SqlDialect::PostgreSQL),
            "mysql" | "mariadb" => Ok(SqlDialect::MySQL),
            "sqlite" | "sqlite3" => Ok(SqlDialect::SQLite),
            _ => Err(format!("Unsupported database backend: {}", s)),
        }
    }
}

/// Database pool configuration
#[derive(Debug, Clone)]
pub struct DatabasePoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        // Migrations hold one transaction at a time.
        Self {
            max_connections: 1,
            acquire_timeout_seconds: 30,
        }
    }
}
