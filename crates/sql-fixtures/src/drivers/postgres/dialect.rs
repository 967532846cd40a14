//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific SQL syntax for identifier quoting, parameter
//! placeholders and schema resolution.

use crate::core::identifier::quote_double;
use crate::core::traits::{Dialect, PlaceholderStyle, SchemaStrategy};

/// PostgreSQL dialect implementation.
///
/// Schema-qualified fixture tables are resolved with `SET LOCAL search_path`,
/// which only lasts until the surrounding transaction ends. PostgreSQL is the
/// only supported engine whose `SERIAL`/`IDENTITY` sequences do not follow
/// explicitly inserted keys, so it is the only dialect with sequence correction.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        // PostgreSQL uses $1, $2, etc. (1-based)
        PlaceholderStyle::Numbered
    }

    fn schema_strategy(&self) -> SchemaStrategy {
        SchemaStrategy::SearchPath
    }

    fn supports_sequence_correction(&self) -> bool {
        true
    }

    fn search_path_sql(&self, schema: &str) -> Option<String> {
        Some(format!("SET LOCAL search_path TO {}", self.quote_ident(schema)))
    }

    fn reset_search_path_sql(&self) -> Option<String> {
        Some("SET LOCAL search_path TO DEFAULT".to_string())
    }
}
