//! Error types for the fixture loader.

use thiserror::Error;

/// Main error type for fixture loading operations.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Table name in a fixture entry is empty.
    #[error("Table name is empty")]
    EmptyTableName,

    /// Table name has more than one schema separator.
    #[error("Malformed table name '{0}': expected 'table' or 'schema.table'")]
    MalformedTableName(String),

    /// Any failure while processing a specific fixture row (1-based).
    #[error("Error loading row {row}: {source}")]
    RowProcessing {
        row: usize,
        #[source]
        source: Box<FixtureError>,
    },

    /// Fixture file could not be read.
    #[error("Error loading file {filename}: {source}")]
    File {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// Fixture document is structurally invalid (missing primary key, nested values, ...)
    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    /// The existence check matched more than one row for a primary key.
    #[error("Primary key matched {count} rows in table {table}; expected at most one")]
    AmbiguousPrimaryKey { table: String, count: i64 },

    /// Dialect name is not one of the supported backends.
    #[error("Unsupported dialect '{0}'. Supported: postgres, mysql, sqlite")]
    UnsupportedDialect(String),

    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// PostgreSQL query or connection error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL query or connection error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// SQLite query or connection error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// IO error (file operations outside fixture reading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FixtureError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        FixtureError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Wrap an error with the 1-based position of the row that caused it.
    pub fn row(row: usize, cause: FixtureError) -> Self {
        FixtureError::RowProcessing {
            row,
            source: Box::new(cause),
        }
    }

    /// Row number of a row-scoped error.
    pub fn failed_row(&self) -> Option<usize> {
        match self {
            FixtureError::RowProcessing { row, .. } => Some(*row),
            _ => None,
        }
    }

    /// Innermost fixture error, looking through row wrappers.
    pub fn root_cause(&self) -> &FixtureError {
        match self {
            FixtureError::RowProcessing { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            FixtureError::Config(_) | FixtureError::UnsupportedDialect(_) => 2,
            FixtureError::File { .. } | FixtureError::Io(_) => 3,
            FixtureError::Yaml(_)
            | FixtureError::InvalidFixture(_)
            | FixtureError::EmptyTableName
            | FixtureError::MalformedTableName(_) => 4,
            FixtureError::RowProcessing { .. } | FixtureError::AmbiguousPrimaryKey { .. } => 5,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for fixture operations.
pub type Result<T> = std::result::Result<T, FixtureError>;
