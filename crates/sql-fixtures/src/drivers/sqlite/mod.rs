//! SQLite database driver.
//!
//! - [`SqliteDialect`]: SQL syntax strategy
//! - [`SqliteDatabase`]: sqlx-backed fixture database
//!
//! The connection half is only available with the `sqlite` feature.

mod connection;
mod dialect;

pub use connection::{SqliteDatabase, SqliteTransaction};
pub use dialect::SqliteDialect;
