//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific SQL syntax for identifier quoting and parameter
//! placeholders. Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.

use crate::core::identifier::quote_backtick;
use crate::core::traits::{Dialect, PlaceholderStyle, SchemaStrategy};

/// MySQL/MariaDB dialect implementation.
///
/// A fixture "schema" is a MySQL database, which can be named directly in
/// the statement (`` `db`.`table` ``). `AUTO_INCREMENT` counters advance past
/// explicitly inserted keys on their own, so no sequence correction is needed.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // MySQL uses backticks for identifier quoting
        quote_backtick(name)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn schema_strategy(&self) -> SchemaStrategy {
        SchemaStrategy::QualifiedName
    }
}
