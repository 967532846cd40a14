//! Identifier validation, quoting and table-name qualification.
//!
//! SQL identifiers (table names, column names, schema names) cannot be bound as
//! statement parameters, so fixture loading has to splice them into the SQL
//! text. Every identifier that reaches a statement is validated here and then
//! quoted with the dialect's quoting rules.
//!
//! Table names in fixtures may carry a single schema qualifier:
//!
//! ```text
//! users          -> (None, "users")
//! audit.events   -> (Some("audit"), "events")
//! a.b.c          -> MalformedTableName
//! ""             -> EmptyTableName
//! ```

use crate::error::{FixtureError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - MySQL: 64 characters
/// - SQLite: unlimited
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Separator between schema and table in a fixture `table` value.
pub const SCHEMA_SEPARATOR: char = '.';

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
///
/// # Errors
///
/// Returns `FixtureError::InvalidFixture` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FixtureError::InvalidFixture(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(FixtureError::InvalidFixture(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(FixtureError::InvalidFixture(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote an identifier with ANSI double quotes (PostgreSQL, SQLite).
///
/// Embedded double quotes are doubled.
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a MySQL identifier using backticks.
///
/// Embedded backticks are doubled.
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// A fixture table name split into its optional schema and bare table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedTable<'a> {
    /// Schema qualifier, if the name had one.
    pub schema: Option<&'a str>,
    /// Bare table name.
    pub table: &'a str,
}

impl<'a> QualifiedTable<'a> {
    /// Split a fixture table name on [`SCHEMA_SEPARATOR`].
    ///
    /// # Errors
    ///
    /// - `EmptyTableName` if `name` (or either side of the separator) is empty
    /// - `MalformedTableName` if the separator appears more than once
    pub fn parse(name: &'a str) -> Result<Self> {
        if name.is_empty() {
            return Err(FixtureError::EmptyTableName);
        }

        let mut parts = name.split(SCHEMA_SEPARATOR);
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(FixtureError::MalformedTableName(name.to_string()));
        }

        let qualified = match second {
            Some(table) => QualifiedTable {
                schema: Some(first),
                table,
            },
            None => QualifiedTable {
                schema: None,
                table: first,
            },
        };

        if qualified.table.is_empty() || qualified.schema == Some("") {
            return Err(FixtureError::EmptyTableName);
        }

        Ok(qualified)
    }
}
