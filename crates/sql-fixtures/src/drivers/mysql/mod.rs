//! MySQL/MariaDB database driver.
//!
//! This module provides MySQL-specific implementations for:
//! - [`MysqlDialect`]: SQL syntax strategy
//! - [`MysqlDatabase`]: pooled fixture database
//!
//! # Feature Flag
//!
//! The connection half is only available when the `mysql` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! sql-fixtures = { version = "0.1", features = ["mysql"] }
//! ```
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod connection;
mod dialect;

pub use connection::{MysqlDatabase, MysqlTransaction};
pub use dialect::MysqlDialect;
