//! SQLite fixture database.
//!
//! Uses an sqlx pool. `:memory:` databases live only as long as their single
//! connection, so they get a one-connection pool that never expires.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::core::traits::{FixtureDatabase, FixtureTransaction};
use crate::core::value::FixtureValue;
use crate::error::{FixtureError, Result};

const MEMORY_PATH: &str = ":memory:";

/// SQLite database implementation using sqlx.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open the database file named by `database.path`, creating it if missing.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let path = config
            .path
            .as_deref()
            .ok_or_else(|| FixtureError::Config("database.path is required for sqlite".into()))?;

        let db = if path == Path::new(MEMORY_PATH) {
            Self::in_memory().await?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections as u32)
                .connect_with(options)
                .await?;
            Self::from_pool(pool)
        };

        info!("Connected to SQLite: {}", path.display());
        Ok(db)
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl FixtureDatabase for SqliteDatabase {
    async fn begin(&self) -> Result<Box<dyn FixtureTransaction>> {
        let tx = self.pool.begin().await?;
        debug!("SQLite transaction started");
        Ok(Box::new(SqliteTransaction { tx: Some(tx) }))
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "sqlite"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// An open SQLite transaction. Dropping it unfinished rolls it back.
pub struct SqliteTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteTransaction {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| FixtureError::pool("transaction already finished", "SQLite transaction"))
    }
}

#[async_trait]
impl FixtureTransaction for SqliteTransaction {
    async fn execute(&mut self, sql: &str, params: &[FixtureValue]) -> Result<u64> {
        let tx = self.tx()?;
        let result = bind_all(sqlx::query(sql), params).execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    async fn query_count(&mut self, sql: &str, params: &[FixtureValue]) -> Result<i64> {
        let tx = self.tx()?;
        let row = bind_all(sqlx::query(sql), params).fetch_one(&mut **tx).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn query_optional_text(
        &mut self,
        sql: &str,
        params: &[FixtureValue],
    ) -> Result<Option<String>> {
        let tx = self.tx()?;
        let row = bind_all(sqlx::query(sql), params)
            .fetch_optional(&mut **tx)
            .await?;
        match row {
            Some(row) => Ok(row.try_get::<Option<String>, _>(0)?),
            None => Ok(None),
        }
    }

    async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            debug!("SQLite transaction committed");
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            debug!("SQLite transaction rolled back");
        }
        Ok(())
    }
}

/// Bind fixture values to a query in order.
fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [FixtureValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            FixtureValue::Null => query.bind(None::<String>),
            FixtureValue::Bool(b) => query.bind(*b),
            FixtureValue::Int(i) => query.bind(*i),
            FixtureValue::Float(f) => query.bind(*f),
            FixtureValue::Text(s) => query.bind(s.as_str()),
            FixtureValue::Now => query.bind(Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
        };
    }
    query
}
