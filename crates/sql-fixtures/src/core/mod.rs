//! Core abstractions for database-agnostic fixture loading.
//!
//! - [`identifier`]: identifier validation, quoting and table-name qualification
//! - [`value`]: scalar fixture values
//! - [`row`]: row descriptors and their derived SQL fragments
//! - [`traits`]: dialect strategy and the database/transaction seam
//!
//! The core module defines database-agnostic abstractions that are implemented
//! by driver modules (`drivers/postgres`, `drivers/mysql`, `drivers/sqlite`).
//! Loader logic only ever sees these traits, so it can be exercised against an
//! in-memory transaction in tests.

pub mod identifier;
pub mod row;
pub mod traits;
pub mod value;

pub use identifier::QualifiedTable;
pub use row::{FixtureColumn, RowDescriptor, WriteTiming, ON_INSERT_NOW, ON_UPDATE_NOW};
pub use traits::{Dialect, FixtureDatabase, FixtureTransaction, PlaceholderStyle, SchemaStrategy};
pub use value::FixtureValue;
