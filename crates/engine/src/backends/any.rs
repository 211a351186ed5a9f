//! sqlx Backend Implementation
//!
//! Implements the backend traits on top of sqlx's `Any` driver, which picks
//! PostgreSQL, MySQL or SQLite at runtime from the URL scheme. The driver
//! does not rewrite placeholders, so the dialect detected here is what the
//! ledger uses to build its statements.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::any::{Any, AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{AnyPool, Row as SqlxRow};

use super::core::*;
use crate::error::{DatabaseError, DatabaseResult};

/// Connection pool over sqlx's runtime-selected driver
#[derive(Debug, Clone)]
pub struct AnyDatabasePool {
    pool: AnyPool,
    dialect: SqlDialect,
}

impl AnyDatabasePool {
    /// Connect to `database_url` with the default pool configuration
    pub async fn connect(database_url: &str) -> DatabaseResult<Self> {
        Self::connect_with(database_url, DatabasePoolConfig::default()).await
    }

    /// Connect to `database_url` with an explicit pool configuration
    pub async fn connect_with(
        database_url: &str,
        config: DatabasePoolConfig,
    ) -> DatabaseResult<Self> {
        let dialect = SqlDialect::from_url(database_url)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(database_url)
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create {} pool: {}", dialect, e))
            })?;

        tracing::debug!(%dialect, "database pool created");
        Ok(Self { pool, dialect })
    }
}

#[async_trait]
impl DatabasePool for AnyDatabasePool {
    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn DatabaseTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(AnyDatabaseTransaction::new(tx)))
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<u64> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(format!("Query execution failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(format!("Query fetch failed: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|row| Box::new(AnyDatabaseRow::new(row)) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn health_check(&self) -> DatabaseResult<Duration> {
        let start = Instant::now();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Connection(format!("Health check failed: {}", e)))?;

        Ok(start.elapsed())
    }

    async fn close(&self) -> DatabaseResult<()> {
        self.pool.close().await;
        Ok(())
    }

    fn sql_dialect(&self) -> SqlDialect {
        self.dialect
    }
}

/// Transaction holding a pooled connection until commit or rollback
pub struct AnyDatabaseTransaction {
    tx: Option<sqlx::Transaction<'static, Any>>,
}

impl AnyDatabaseTransaction {
    pub fn new(tx: sqlx::Transaction<'static, Any>) -> Self {
        Self { tx: Some(tx) }
    }
}

#[async_trait]
impl DatabaseTransaction for AnyDatabaseTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<u64> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| DatabaseError::Transaction("Transaction already completed".to_string()))?;

        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| DatabaseError::Query(format!("Query execution failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn commit(mut self: Box<Self>) -> DatabaseResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DatabaseError::Transaction("Transaction already completed".to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("Transaction commit failed: {}", e)))
    }

    async fn rollback(mut self: Box<Self>) -> DatabaseResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DatabaseError::Transaction("Transaction already completed".to_string()))?;

        tx.rollback()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("Transaction rollback failed: {}", e)))
    }
}

/// Row returned by the `Any` driver
pub struct AnyDatabaseRow {
    row: AnyRow,
}

impl AnyDatabaseRow {
    pub fn new(row: AnyRow) -> Self {
        Self { row }
    }
}

impl DatabaseRow for AnyDatabaseRow {
    fn get_by_index(&self, index: usize) -> DatabaseResult<DatabaseValue> {
        any_value_to_database_value(&self.row, index)
    }
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &DatabaseValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
    }
}

/// Convert a column value to DatabaseValue, trying text first
fn any_value_to_database_value(row: &AnyRow, index: usize) -> DatabaseResult<DatabaseValue> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value.map_or(DatabaseValue::Null, DatabaseValue::String));
    }
    if let Ok(value) = row.try_get::<i64, _>(index) {
        return Ok(DatabaseValue::Int64(value));
    }
    if let Ok(value) = row.try_get::<f64, _>(index) {
        return Ok(DatabaseValue::Float64(value));
    }
    if let Ok(value) = row.try_get::<bool, _>(index) {
        return Ok(DatabaseValue::Bool(value));
    }

    row.try_get::<Vec<u8>, _>(index)
        .map(DatabaseValue::Bytes)
        .map_err(|e| DatabaseError::Query(format!("Failed to read column {}: {}", index, e)))
}
