//! SQLite SQL dialect (Strategy pattern).

use crate::core::identifier::quote_double;
use crate::core::traits::{Dialect, PlaceholderStyle, SchemaStrategy};

/// SQLite dialect implementation.
///
/// A fixture "schema" is an attached database name (`main`, `temp`, or any
/// `ATTACH`ed alias) and is rendered as a statement qualifier. `INTEGER
/// PRIMARY KEY` rowids always continue from the current maximum, so no
/// sequence correction is needed.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn schema_strategy(&self) -> SchemaStrategy {
        SchemaStrategy::QualifiedName
    }
}
