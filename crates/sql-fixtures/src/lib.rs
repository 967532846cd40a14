//! # sql-fixtures
//!
//! Idempotent YAML fixture loading for relational databases.
//!
//! Each fixture row names a table, its primary key and its fields. The loader
//! checks whether a record with that key exists and issues an INSERT or an
//! UPDATE accordingly, so loading the same document twice leaves the database
//! unchanged. Supported backends:
//!
//! - **PostgreSQL** via deadpool-postgres, with sequence realignment after
//!   explicit key inserts
//! - **MySQL / MariaDB** via mysql_async (feature `mysql`)
//! - **SQLite** via sqlx (feature `sqlite`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use sql_fixtures::{connect, load_file, Config};
//!
//! #[tokio::main]
//! async fn main() -> sql_fixtures::Result<()> {
//!     let config = Config::load("fixtures.yaml")?;
//!     let db = connect(&config.database).await?;
//!     let summary = load_file("fixtures/users.yml", db.as_ref(), &config.database.r#type).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod fixture;

// Re-exports for convenient access
pub use config::{Config, DatabaseConfig, LoadConfig};
pub use crate::core::{FixtureDatabase, FixtureTransaction, FixtureValue, RowDescriptor};
pub use drivers::{connect, DialectImpl};
pub use engine::{FixtureLoader, LoadSummary, RowStatements, TransactionMode};
pub use error::{FixtureError, Result};
pub use fixture::{
    load, load_file, load_file_with_mode, load_files, load_files_with_mode, parse_document,
};
