//! Sequence realignment after explicit primary-key writes.
//!
//! Writing an explicit value into a sequence-backed key leaves the sequence
//! behind the table; the next key-less insert would collide. The corrector
//! moves the sequence to the column's current maximum.

use std::collections::HashMap;

use tracing::debug;

use crate::core::traits::{Dialect, FixtureTransaction};
use crate::core::value::FixtureValue;
use crate::error::Result;

/// Query returning the sequence owned by a column, or NULL.
pub const SEQUENCE_LOOKUP_SQL: &str = "SELECT pg_get_serial_sequence($1, $2)";

/// Looks up and realigns column sequences, caching lookups for one load call.
#[derive(Debug, Default)]
pub struct SequenceCorrector {
    cache: HashMap<(String, String), Option<String>>,
}

impl SequenceCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the sequence backing `column`, if any.
    ///
    /// `table_ref` is the quoted, schema-qualified table reference.
    pub async fn sequence_for(
        &mut self,
        tx: &mut dyn FixtureTransaction,
        table_ref: &str,
        column: &str,
    ) -> Result<Option<String>> {
        let key = (table_ref.to_string(), column.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let sequence = tx
            .query_optional_text(
                SEQUENCE_LOOKUP_SQL,
                &[
                    FixtureValue::Text(table_ref.to_string()),
                    FixtureValue::Text(column.to_string()),
                ],
            )
            .await?;
        debug!(
            "Sequence lookup for {}.{}: {}",
            table_ref,
            column,
            sequence.as_deref().unwrap_or("none")
        );
        self.cache.insert(key, sequence.clone());
        Ok(sequence)
    }

    /// Move the sequence behind `column` to the column's maximum.
    ///
    /// Returns whether a sequence was found and set.
    pub async fn correct(
        &mut self,
        tx: &mut dyn FixtureTransaction,
        dialect: &dyn Dialect,
        table_ref: &str,
        column: &str,
    ) -> Result<bool> {
        let Some(sequence) = self.sequence_for(tx, table_ref, column).await? else {
            return Ok(false);
        };

        let sql = setval_sql(dialect, table_ref, column);
        tx.execute(&sql, &[FixtureValue::Text(sequence.clone())])
            .await?;
        debug!("Realigned sequence {} to MAX({})", sequence, column);
        Ok(true)
    }

    /// Number of cached lookups.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// `setval` statement moving a sequence (bound as `$1`) to the column maximum.
pub fn setval_sql(dialect: &dyn Dialect, table_ref: &str, column: &str) -> String {
    format!(
        "SELECT setval($1::text::regclass, COALESCE((SELECT MAX({}) FROM {}), 1))",
        dialect.quote_ident(column),
        table_ref
    )
}
