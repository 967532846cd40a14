//! Core traits for database-agnostic fixture loading.
//!
//! - [`Dialect`]: SQL syntax strategy for a database engine
//! - [`FixtureDatabase`]: a connection source that can open transactions
//! - [`FixtureTransaction`]: an open transaction the loader issues statements on
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable placeholder, quoting and
//!   schema-resolution rules
//! - **Template Method**: default `Dialect` methods derive placeholders and
//!   qualified names from a few per-engine primitives

use async_trait::async_trait;

use crate::error::Result;

use super::value::FixtureValue;

/// How bind parameters are spelled in statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL).
    Numbered,
    /// `?` for every parameter (MySQL, SQLite).
    Positional,
}

/// How a schema-qualified fixture table is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStrategy {
    /// Switch the transaction's search path and use the bare table name.
    SearchPath,
    /// Render `schema.table` in every statement.
    QualifiedName,
}

/// SQL dialect abstraction (Strategy pattern).
///
/// Dialects are pure lookups: they hold no state and never touch a connection.
pub trait Dialect: Send + Sync {
    /// Dialect name as accepted by [`crate::drivers::DialectImpl::from_name`].
    fn name(&self) -> &str;

    /// Quote an identifier (table, column, or schema name).
    fn quote_ident(&self, name: &str) -> String;

    /// Placeholder syntax for bind parameters.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Schema resolution mechanism.
    fn schema_strategy(&self) -> SchemaStrategy;

    /// Whether explicit primary-key writes need sequence realignment.
    fn supports_sequence_correction(&self) -> bool {
        false
    }

    /// Statement switching the transaction's search path to `schema`.
    ///
    /// Only meaningful for [`SchemaStrategy::SearchPath`] dialects.
    fn search_path_sql(&self, _schema: &str) -> Option<String> {
        None
    }

    /// Statement restoring the session's default search path for the rest of
    /// the transaction.
    fn reset_search_path_sql(&self) -> Option<String> {
        None
    }

    /// Get a parameter placeholder for the given 1-based position.
    fn param_placeholder(&self, index: usize) -> String {
        match self.placeholder_style() {
            PlaceholderStyle::Numbered => format!("${}", index),
            PlaceholderStyle::Positional => "?".to_string(),
        }
    }

    /// Quote a table name, prefixed with its quoted schema when given.
    fn qualify_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote_ident(schema), self.quote_ident(table)),
            None => self.quote_ident(table),
        }
    }
}

/// An open database transaction.
///
/// The fixture loader owns a transaction exclusively for its lifetime and
/// finishes it with exactly one of [`commit`](Self::commit) or
/// [`rollback`](Self::rollback); a rollback may follow a failed commit.
#[async_trait]
pub trait FixtureTransaction: Send {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[FixtureValue]) -> Result<u64>;

    /// Run a query whose first row's first column is an integer (e.g. `COUNT(*)`).
    async fn query_count(&mut self, sql: &str, params: &[FixtureValue]) -> Result<i64>;

    /// Run a query whose first row's first column is nullable text.
    async fn query_optional_text(
        &mut self,
        sql: &str,
        params: &[FixtureValue],
    ) -> Result<Option<String>>;

    /// Commit the transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll the transaction back. Calling it on a finished transaction is a no-op.
    async fn rollback(&mut self) -> Result<()>;
}

/// A database fixtures can be loaded into.
///
/// Implementations wrap a connection pool; every [`begin`](Self::begin) hands
/// out a transaction on a dedicated connection.
#[async_trait]
pub trait FixtureDatabase: Send + Sync {
    /// Begin a new transaction.
    async fn begin(&self) -> Result<Box<dyn FixtureTransaction>>;

    /// Verify the database is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Get the database type identifier (e.g., "postgres", "mysql").
    fn db_type(&self) -> &'static str;

    /// Close the connection pool.
    async fn close(&self);
}
