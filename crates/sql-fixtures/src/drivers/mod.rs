//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`postgres`]: PostgreSQL driver (always available)
//! - [`mysql`]: MySQL/MariaDB driver (feature `mysql`)
//! - [`sqlite`]: SQLite driver (feature `sqlite`)
//! - [`common`]: Shared utilities (TLS)
//!
//! # Architecture
//!
//! Each driver module implements:
//! - `Dialect`: SQL syntax strategy for the database engine
//! - `FixtureDatabase` / `FixtureTransaction`: the connection the loader runs on
//!
//! Dialects are always compiled in, so fixtures can be rendered and checked
//! for any engine; only the connection implementations are feature-gated.
//!
//! # Static dispatch
//!
//! [`DialectImpl`] is a closed enum over the supported dialects. The loader
//! selects one variant at entry and dispatches through a `match` instead of a
//! vtable.

pub mod common;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(not(feature = "mysql"))]
#[path = "mysql/dialect.rs"]
mod mysql_dialect;
#[cfg(not(feature = "sqlite"))]
#[path = "sqlite/dialect.rs"]
mod sqlite_dialect;

use std::fmt;
use std::str::FromStr;

pub use common::{SslMode, TlsBuilder};
#[cfg(feature = "mysql")]
pub use mysql::{MysqlDatabase, MysqlDialect};
#[cfg(not(feature = "mysql"))]
pub use mysql_dialect::MysqlDialect;
pub use postgres::{PostgresDatabase, PostgresDialect};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteDialect};
#[cfg(not(feature = "sqlite"))]
pub use sqlite_dialect::SqliteDialect;

use crate::config::DatabaseConfig;
use crate::core::traits::{Dialect, FixtureDatabase, PlaceholderStyle, SchemaStrategy};
use crate::error::{FixtureError, Result};

/// Enum-based static dispatch for dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Postgres(PostgresDialect),
    Mysql(MysqlDialect),
    Sqlite(SqliteDialect),
}

impl DialectImpl {
    /// Create a dialect implementation from a dialect or driver name.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDialect` if the name is not recognized.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::new())),
            "sqlite" | "sqlite3" => Ok(DialectImpl::Sqlite(SqliteDialect::new())),
            other => Err(FixtureError::UnsupportedDialect(other.to_string())),
        }
    }

    fn inner(&self) -> &dyn Dialect {
        match self {
            DialectImpl::Postgres(d) => d,
            DialectImpl::Mysql(d) => d,
            DialectImpl::Sqlite(d) => d,
        }
    }
}

impl FromStr for DialectImpl {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for DialectImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn quote_ident(&self, name: &str) -> String {
        self.inner().quote_ident(name)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.inner().placeholder_style()
    }

    fn schema_strategy(&self) -> SchemaStrategy {
        self.inner().schema_strategy()
    }

    fn supports_sequence_correction(&self) -> bool {
        self.inner().supports_sequence_correction()
    }

    fn search_path_sql(&self, schema: &str) -> Option<String> {
        self.inner().search_path_sql(schema)
    }

    fn reset_search_path_sql(&self) -> Option<String> {
        self.inner().reset_search_path_sql()
    }
}

/// Open a connection pool for the configured database.
///
/// # Errors
///
/// Returns `Config` if the configured type was compiled out, or the driver's
/// connection error.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn FixtureDatabase>> {
    match config.dialect()? {
        DialectImpl::Postgres(_) => Ok(Box::new(PostgresDatabase::new(config).await?)),
        #[cfg(feature = "mysql")]
        DialectImpl::Mysql(_) => Ok(Box::new(MysqlDatabase::new(config).await?)),
        #[cfg(feature = "sqlite")]
        DialectImpl::Sqlite(_) => Ok(Box::new(SqliteDatabase::new(config).await?)),
        #[allow(unreachable_patterns)]
        other => Err(FixtureError::Config(format!(
            "database type '{}' is not enabled in this build",
            other
        ))),
    }
}
