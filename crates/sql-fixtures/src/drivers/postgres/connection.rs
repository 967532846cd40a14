//! PostgreSQL fixture database.
//!
//! Uses deadpool-postgres for connection pooling. Each transaction holds a
//! pooled connection for its whole lifetime and drives `BEGIN` / `COMMIT` /
//! `ROLLBACK` itself, so it does not borrow from the pool.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::types::ToSql;
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::core::traits::{FixtureDatabase, FixtureTransaction};
use crate::core::value::FixtureValue;
use crate::drivers::common::TlsBuilder;
use crate::error::{FixtureError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL database implementation.
pub struct PostgresDatabase {
    pool: Pool,
}

impl PostgresDatabase {
    /// Create a new PostgreSQL pool from configuration and test a connection.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port_or_default());
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.application_name("sql-fixtures");

        pg_config.keepalives(true);
        pg_config.keepalives_idle(Duration::from_secs(30));
        pg_config.connect_timeout(POOL_CONNECTION_TIMEOUT);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match TlsBuilder::parse(&config.ssl_mode)?.build_postgres()? {
            None => {
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(config.max_connections)
                    .build()
                    .map_err(|e| FixtureError::pool(e, "creating PostgreSQL pool"))?
            }
            Some(tls_connector) => {
                let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
                Pool::builder(mgr)
                    .max_size(config.max_connections)
                    .build()
                    .map_err(|e| FixtureError::pool(e, "creating PostgreSQL pool"))?
            }
        };

        let db = Self::from_pool(pool);
        db.health_check().await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
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

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl FixtureDatabase for PostgresDatabase {
    async fn begin(&self) -> Result<Box<dyn FixtureTransaction>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| FixtureError::pool(e, "beginning PostgreSQL transaction"))?;
        client.batch_execute("BEGIN").await?;
        debug!("PostgreSQL transaction started");

        Ok(Box::new(PostgresTransaction {
            client: Some(client),
            finished: false,
        }))
    }

    async fn health_check(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| FixtureError::pool(e, "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
    }
}

/// An open PostgreSQL transaction on a pooled connection.
pub struct PostgresTransaction {
    client: Option<Object>,
    finished: bool,
}

impl PostgresTransaction {
    fn client(&self) -> Result<&Object> {
        self.client
            .as_ref()
            .ok_or_else(|| FixtureError::pool("connection already released", "PostgreSQL transaction"))
    }
}

fn bind_params(params: &[FixtureValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl FixtureTransaction for PostgresTransaction {
    async fn execute(&mut self, sql: &str, params: &[FixtureValue]) -> Result<u64> {
        let client = self.client()?;
        Ok(client.execute(sql, &bind_params(params)).await?)
    }

    async fn query_count(&mut self, sql: &str, params: &[FixtureValue]) -> Result<i64> {
        let client = self.client()?;
        let row = client.query_one(sql, &bind_params(params)).await?;
        Ok(row.try_get::<_, i64>(0)?)
    }

    async fn query_optional_text(
        &mut self,
        sql: &str,
        params: &[FixtureValue],
    ) -> Result<Option<String>> {
        let client = self.client()?;
        let row = client.query_opt(sql, &bind_params(params)).await?;
        match row {
            Some(row) => Ok(row.try_get::<_, Option<String>>(0)?),
            None => Ok(None),
        }
    }

    async fn commit(&mut self) -> Result<()> {
        self.client()?.batch_execute("COMMIT").await?;
        self.finished = true;
        debug!("PostgreSQL transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.client()?.batch_execute("ROLLBACK").await?;
        self.finished = true;
        debug!("PostgreSQL transaction rolled back");
        Ok(())
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // The session is still inside a transaction; keep it out of the pool.
        if let Some(client) = self.client.take() {
            warn!("PostgreSQL transaction dropped without commit or rollback; discarding connection");
            drop(Object::take(client));
        }
    }
}
