//! Row descriptors: one declared fixture row and its derived SQL fragments.
//!
//! A [`RowDescriptor`] keeps its columns in a single ordered list with the
//! primary-key columns first, followed by the remaining fields in document
//! order. Every SQL fragment the loader needs (column lists, placeholders,
//! SET assignments, the primary-key predicate) is derived from that list, so
//! column order in statements always matches bind order.

use crate::core::identifier::{validate_identifier, QualifiedTable};
use crate::core::traits::Dialect;
use crate::core::value::FixtureValue;
use crate::error::{FixtureError, Result};

/// Field value marker: write the current timestamp on INSERT only.
pub const ON_INSERT_NOW: &str = "ON_INSERT_NOW()";

/// Field value marker: write the current timestamp on UPDATE only.
pub const ON_UPDATE_NOW: &str = "ON_UPDATE_NOW()";

/// Which statements write a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteTiming {
    /// Written by both INSERT and UPDATE.
    #[default]
    Always,
    /// Written by INSERT only.
    InsertOnly,
    /// Written by UPDATE only.
    UpdateOnly,
}

/// A single column of a fixture row.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureColumn {
    /// Column name (unquoted).
    pub name: String,
    /// Value to write.
    pub value: FixtureValue,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Which statements write this column.
    pub timing: WriteTiming,
}

impl FixtureColumn {
    fn written_on_insert(&self) -> bool {
        self.timing != WriteTiming::UpdateOnly
    }

    fn written_on_update(&self) -> bool {
        !self.primary_key && self.timing != WriteTiming::InsertOnly
    }
}

/// One declared row: target table, ordered columns, primary-key partition.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDescriptor {
    table: String,
    columns: Vec<FixtureColumn>,
}

impl RowDescriptor {
    /// Build a row from its primary-key columns and remaining fields.
    ///
    /// Field values equal to [`ON_INSERT_NOW`] / [`ON_UPDATE_NOW`] become
    /// [`FixtureValue::Now`] with the matching [`WriteTiming`].
    ///
    /// # Errors
    ///
    /// `InvalidFixture` when there is no primary-key column, a column name is
    /// not a valid identifier, a column is declared twice, or a timestamp
    /// marker is used as a primary-key value.
    pub fn new<P, F>(table: impl Into<String>, pk: P, fields: F) -> Result<Self>
    where
        P: IntoIterator<Item = (String, FixtureValue)>,
        F: IntoIterator<Item = (String, FixtureValue)>,
    {
        let table = table.into();
        let mut columns: Vec<FixtureColumn> = Vec::new();

        for (name, value) in pk {
            if is_timestamp_marker(&value) {
                return Err(FixtureError::InvalidFixture(format!(
                    "table {}: primary key column '{}' cannot use a timestamp marker",
                    table, name
                )));
            }
            push_column(&table, &mut columns, name, value, true, WriteTiming::Always)?;
        }

        if columns.is_empty() {
            return Err(FixtureError::InvalidFixture(format!(
                "table {}: row has no primary key columns",
                table
            )));
        }

        for (name, value) in fields {
            let (value, timing) = match value.as_str() {
                Some(ON_INSERT_NOW) => (FixtureValue::Now, WriteTiming::InsertOnly),
                Some(ON_UPDATE_NOW) => (FixtureValue::Now, WriteTiming::UpdateOnly),
                _ => (value, WriteTiming::Always),
            };
            push_column(&table, &mut columns, name, value, false, timing)?;
        }

        Ok(Self { table, columns })
    }

    /// Table name exactly as declared (possibly schema-qualified).
    pub fn table(&self) -> &str {
        &self.table
    }

    /// All columns, primary keys first.
    pub fn columns(&self) -> &[FixtureColumn] {
        &self.columns
    }

    /// Split the declared table name into schema and bare table.
    pub fn qualified_table(&self) -> Result<QualifiedTable<'_>> {
        QualifiedTable::parse(&self.table)
    }

    fn primary_keys(&self) -> impl Iterator<Item = &FixtureColumn> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    fn insertable(&self) -> impl Iterator<Item = &FixtureColumn> {
        self.columns.iter().filter(|c| c.written_on_insert())
    }

    fn updatable(&self) -> impl Iterator<Item = &FixtureColumn> {
        self.columns.iter().filter(|c| c.written_on_update())
    }

    /// Primary-key column names, in predicate order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.primary_keys().map(|c| c.name.as_str()).collect()
    }

    /// Primary-key values, in the same order as [`where_predicate`](Self::where_predicate).
    pub fn primary_key_values(&self) -> Vec<FixtureValue> {
        self.primary_keys().map(|c| c.value.clone()).collect()
    }

    /// Column names written by INSERT.
    pub fn insert_columns(&self) -> Vec<&str> {
        self.insertable().map(|c| c.name.as_str()).collect()
    }

    /// Values written by INSERT, aligned with [`insert_columns`](Self::insert_columns).
    pub fn insert_values(&self) -> Vec<FixtureValue> {
        self.insertable().map(|c| c.value.clone()).collect()
    }

    /// One placeholder per INSERT column, numbered from 1 where the dialect numbers them.
    pub fn insert_placeholders(&self, dialect: &dyn Dialect) -> Vec<String> {
        (1..=self.insertable().count())
            .map(|i| dialect.param_placeholder(i))
            .collect()
    }

    /// Column names written by UPDATE (never primary keys).
    pub fn update_columns(&self) -> Vec<&str> {
        self.updatable().map(|c| c.name.as_str()).collect()
    }

    /// Values written by UPDATE, aligned with [`update_columns`](Self::update_columns).
    pub fn update_values(&self) -> Vec<FixtureValue> {
        self.updatable().map(|c| c.value.clone()).collect()
    }

    /// `"col" = <placeholder>` assignments for the UPDATE SET clause, numbered from 1.
    pub fn update_assignments(&self, dialect: &dyn Dialect) -> Vec<String> {
        self.updatable()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{} = {}",
                    dialect.quote_ident(&c.name),
                    dialect.param_placeholder(i + 1)
                )
            })
            .collect()
    }

    /// `AND`-joined equality predicate over the primary-key columns.
    ///
    /// Placeholder numbering starts at `placeholder_offset + 1`, so the
    /// predicate can follow an UPDATE's SET placeholders.
    pub fn where_predicate(&self, dialect: &dyn Dialect, placeholder_offset: usize) -> String {
        self.primary_keys()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{} = {}",
                    dialect.quote_ident(&c.name),
                    dialect.param_placeholder(placeholder_offset + i + 1)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Primary-key columns given an explicit, non-null value.
    ///
    /// Whether a column is sequence-backed is left to the database; a quoted
    /// `'100'` pushes a serial column just as far as `100` does.
    pub fn explicit_keys(&self) -> Vec<&str> {
        self.primary_keys()
            .filter(|c| !c.value.is_null())
            .map(|c| c.name.as_str())
            .collect()
    }
}

fn is_timestamp_marker(value: &FixtureValue) -> bool {
    matches!(value.as_str(), Some(ON_INSERT_NOW) | Some(ON_UPDATE_NOW))
}

fn push_column(
    table: &str,
    columns: &mut Vec<FixtureColumn>,
    name: String,
    value: FixtureValue,
    primary_key: bool,
    timing: WriteTiming,
) -> Result<()> {
    validate_identifier(&name)
        .map_err(|e| FixtureError::InvalidFixture(format!("table {}: {}", table, e)))?;

    if columns.iter().any(|c| c.name == name) {
        return Err(FixtureError::InvalidFixture(format!(
            "table {}: column '{}' is declared more than once",
            table, name
        )));
    }

    columns.push(FixtureColumn {
        name,
        value,
        primary_key,
        timing,
    });
    Ok(())
}
