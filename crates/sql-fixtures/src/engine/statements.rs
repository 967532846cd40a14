//! SQL text for the statements issued per fixture row.

use crate::core::identifier::QualifiedTable;
use crate::core::row::RowDescriptor;
use crate::core::traits::{Dialect, SchemaStrategy};
use crate::error::Result;

/// Where a row's statements point and what has to run first to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    /// Statement switching the search path, for search-path dialects.
    pub search_path: Option<String>,
    /// Table reference used in the row's statements.
    pub table_ref: String,
    /// Fully qualified table reference, independent of the search path.
    pub qualified_ref: String,
}

impl TableTarget {
    /// Resolve a parsed table name against a dialect's schema strategy.
    pub fn resolve(dialect: &dyn Dialect, table: &QualifiedTable<'_>) -> Self {
        let qualified_ref = dialect.qualify_table(table.schema, table.table);
        match (dialect.schema_strategy(), table.schema) {
            (SchemaStrategy::SearchPath, Some(schema)) => Self {
                search_path: dialect.search_path_sql(schema),
                table_ref: dialect.quote_ident(table.table),
                qualified_ref,
            },
            (SchemaStrategy::SearchPath, None) => Self {
                search_path: None,
                table_ref: dialect.quote_ident(table.table),
                qualified_ref,
            },
            (SchemaStrategy::QualifiedName, _) => Self {
                search_path: None,
                table_ref: qualified_ref.clone(),
                qualified_ref,
            },
        }
    }
}

/// Existence check: `SELECT COUNT(*)` over the primary key.
pub fn count_sql(dialect: &dyn Dialect, table_ref: &str, row: &RowDescriptor) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        table_ref,
        row.where_predicate(dialect, 0)
    )
}

/// INSERT of every insertable column.
pub fn insert_sql(dialect: &dyn Dialect, table_ref: &str, row: &RowDescriptor) -> String {
    let columns: Vec<String> = row
        .insert_columns()
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table_ref,
        columns.join(", "),
        row.insert_placeholders(dialect).join(", ")
    )
}

/// UPDATE of every updatable column, or `None` when only the key was given.
pub fn update_sql(dialect: &dyn Dialect, table_ref: &str, row: &RowDescriptor) -> Option<String> {
    let assignments = row.update_assignments(dialect);
    if assignments.is_empty() {
        return None;
    }
    Some(format!(
        "UPDATE {} SET {} WHERE {}",
        table_ref,
        assignments.join(", "),
        row.where_predicate(dialect, assignments.len())
    ))
}

/// Every statement a row may issue, rendered without touching a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStatements {
    pub search_path: Option<String>,
    pub count: String,
    pub insert: String,
    pub update: Option<String>,
}

impl RowStatements {
    /// Render the statements for one row.
    pub fn render(dialect: &dyn Dialect, row: &RowDescriptor) -> Result<Self> {
        let table = row.qualified_table()?;
        let target = TableTarget::resolve(dialect, &table);
        Ok(Self {
            count: count_sql(dialect, &target.table_ref, row),
            insert: insert_sql(dialect, &target.table_ref, row),
            update: update_sql(dialect, &target.table_ref, row),
            search_path: target.search_path,
        })
    }
}
