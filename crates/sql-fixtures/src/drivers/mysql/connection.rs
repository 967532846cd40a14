//! MySQL/MariaDB fixture database.
//!
//! Uses mysql_async for connection pooling. A transaction owns a pooled
//! connection and is driven with `START TRANSACTION` / `COMMIT` / `ROLLBACK`.
//! The pool resets connections on return, so a transaction dropped without
//! finishing is rolled back by the server.

use async_trait::async_trait;
use chrono::{Datelike, Timelike, Utc};
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, Params, Pool, PoolConstraints, PoolOpts, Value};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::core::traits::{FixtureDatabase, FixtureTransaction};
use crate::core::value::FixtureValue;
use crate::drivers::common::TlsBuilder;
use crate::error::{FixtureError, Result};

/// MySQL database implementation using mysql_async.
pub struct MysqlDatabase {
    pool: Pool,
}

impl MysqlDatabase {
    /// Create a new MySQL pool from configuration and test a connection.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let ssl_opts = TlsBuilder::parse(&config.ssl_mode)?.build_mysql();

        let constraints = PoolConstraints::new(1, config.max_connections).ok_or_else(|| {
            FixtureError::Config("database.max_connections must be at least 1".into())
        })?;
        let pool_opts = PoolOpts::new()
            .with_constraints(constraints)
            .with_reset_connection(true);

        let builder = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port_or_default())
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            .ssl_opts(ssl_opts)
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"])
            .pool_opts(pool_opts);

        let opts: Opts = builder.into();
        let db = Self::from_pool(Pool::new(opts));
        db.health_check().await?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host,
            config.port_or_default(),
            config.database
        );

        Ok(db)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    /// Get a clone of the underlying connection pool.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }
}

#[async_trait]
impl FixtureDatabase for MysqlDatabase {
    async fn begin(&self) -> Result<Box<dyn FixtureTransaction>> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| FixtureError::pool(e, "beginning MySQL transaction"))?;
        conn.query_drop("START TRANSACTION").await?;
        debug!("MySQL transaction started");

        Ok(Box::new(MysqlTransaction {
            conn,
            finished: false,
        }))
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| FixtureError::pool(e, "testing MySQL connection"))?;
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| FixtureError::pool(e, "testing MySQL connection"))?;
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "mysql"
    }

    async fn close(&self) {
        let _ = self.pool.clone().disconnect().await;
    }
}

/// An open MySQL transaction on a pooled connection.
pub struct MysqlTransaction {
    conn: Conn,
    finished: bool,
}

#[async_trait]
impl FixtureTransaction for MysqlTransaction {
    async fn execute(&mut self, sql: &str, params: &[FixtureValue]) -> Result<u64> {
        self.conn.exec_drop(sql, to_params(params)).await?;
        Ok(self.conn.affected_rows())
    }

    async fn query_count(&mut self, sql: &str, params: &[FixtureValue]) -> Result<i64> {
        let count: Option<i64> = self.conn.exec_first(sql, to_params(params)).await?;
        Ok(count.unwrap_or(0))
    }

    async fn query_optional_text(
        &mut self,
        sql: &str,
        params: &[FixtureValue],
    ) -> Result<Option<String>> {
        let value: Option<Option<String>> = self.conn.exec_first(sql, to_params(params)).await?;
        Ok(value.flatten())
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn.query_drop("COMMIT").await?;
        self.finished = true;
        debug!("MySQL transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.conn.query_drop("ROLLBACK").await?;
        self.finished = true;
        debug!("MySQL transaction rolled back");
        Ok(())
    }
}

fn to_params(values: &[FixtureValue]) -> Params {
    if values.is_empty() {
        Params::Empty
    } else {
        Params::Positional(values.iter().map(fixture_value_to_mysql).collect())
    }
}

/// Convert a fixture value to a mysql_async value.
///
/// MySQL coerces text parameters to the column type, so strings pass through.
fn fixture_value_to_mysql(value: &FixtureValue) -> Value {
    match value {
        FixtureValue::Null => Value::NULL,
        FixtureValue::Bool(b) => Value::from(*b),
        FixtureValue::Int(i) => Value::Int(*i),
        FixtureValue::Float(f) => Value::Double(*f),
        FixtureValue::Text(s) => Value::from(s.as_str()),
        FixtureValue::Now => {
            let now = Utc::now().naive_utc();
            Value::Date(
                now.year() as u16,
                now.month() as u8,
                now.day() as u8,
                now.hour() as u8,
                now.minute() as u8,
                now.second() as u8,
                now.nanosecond() / 1_000,
            )
        }
    }
}
