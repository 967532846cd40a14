//! Fixture documents and the load entry points.
//!
//! A fixture document is a YAML sequence of rows:
//!
//! ```yaml
//! - table: public.users
//!   pk:
//!     id: 1
//!   fields:
//!     name: alice
//!     created_at: ON_INSERT_NOW()
//! ```
//!
//! Documents are parsed into [`RowDescriptor`]s in document order and handed
//! to the [`FixtureLoader`].

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::info;

use crate::core::row::RowDescriptor;
use crate::core::traits::FixtureDatabase;
use crate::core::value::FixtureValue;
use crate::drivers::DialectImpl;
use crate::engine::{FixtureLoader, LoadSummary, TransactionMode};
use crate::error::{FixtureError, Result};

/// One entry of a fixture document, as written.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureEntry {
    table: String,
    pk: IndexMap<String, FixtureValue>,
    #[serde(default)]
    fields: IndexMap<String, FixtureValue>,
}

/// Parse a fixture document into row descriptors, in document order.
///
/// An empty document yields no rows.
pub fn parse_document(data: &[u8]) -> Result<Vec<RowDescriptor>> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let entries: Option<Vec<FixtureEntry>> = serde_yaml::from_slice(data)?;
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| RowDescriptor::new(entry.table, entry.pk, entry.fields))
        .collect()
}

/// Load a fixture document.
///
/// `dialect` names the database dialect (`postgres`, `mysql`, `sqlite`).
pub async fn load(
    data: &[u8],
    db: &dyn FixtureDatabase,
    dialect: &str,
    mode: TransactionMode,
) -> Result<LoadSummary> {
    let dialect = DialectImpl::from_name(dialect)?;
    let rows = parse_document(data)?;
    FixtureLoader::new(db, dialect, mode).load_rows(&rows).await
}

/// Load a fixture file in a single transaction.
pub async fn load_file<P: AsRef<Path>>(
    path: P,
    db: &dyn FixtureDatabase,
    dialect: &str,
) -> Result<LoadSummary> {
    load_file_with_mode(path, db, dialect, TransactionMode::SingleTransaction).await
}

/// Load a fixture file with an explicit transaction mode.
pub async fn load_file_with_mode<P: AsRef<Path>>(
    path: P,
    db: &dyn FixtureDatabase,
    dialect: &str,
    mode: TransactionMode,
) -> Result<LoadSummary> {
    let path = path.as_ref();
    let data = read_fixture(path)?;
    let summary = load(&data, db, dialect, mode).await?;
    info!("Loaded {}: {}", path.display(), summary);
    Ok(summary)
}

/// Load fixture files in order, stopping at the first failure.
pub async fn load_files<P: AsRef<Path>>(
    paths: &[P],
    db: &dyn FixtureDatabase,
    dialect: &str,
) -> Result<LoadSummary> {
    load_files_with_mode(paths, db, dialect, TransactionMode::SingleTransaction).await
}

/// Load fixture files in order with an explicit transaction mode.
pub async fn load_files_with_mode<P: AsRef<Path>>(
    paths: &[P],
    db: &dyn FixtureDatabase,
    dialect: &str,
    mode: TransactionMode,
) -> Result<LoadSummary> {
    let mut total = LoadSummary::default();
    for path in paths {
        total += load_file_with_mode(path, db, dialect, mode).await?;
    }
    Ok(total)
}

/// Read a fixture file, wrapping failures with the file name.
pub fn read_fixture(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| FixtureError::File {
        filename: path.display().to_string(),
        source,
    })
}
