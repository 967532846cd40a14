//! PostgreSQL driver.
//!
//! This module provides PostgreSQL-specific implementations:
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresDatabase`]: pooled fixture database with hand-driven transactions
//! - `ToSql` for [`FixtureValue`](crate::core::FixtureValue): bind-time type conversion

mod connection;
mod dialect;
mod types;

pub use connection::{PostgresDatabase, PostgresTransaction};
pub use dialect::PostgresDialect;
