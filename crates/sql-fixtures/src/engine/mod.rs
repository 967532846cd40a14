//! Row reconciliation engine.
//!
//! [`FixtureLoader`] walks fixture rows in order and, for each one, checks
//! whether a record with the same primary key exists and issues the INSERT
//! or UPDATE that makes the database match the fixture.
//!
//! # Transactions
//!
//! - [`TransactionMode::SingleTransaction`]: every row runs in one
//!   transaction, committed after the last row. Any failure commits nothing.
//! - [`TransactionMode::PerRowTransaction`]: each row commits on its own.
//!   A failure keeps the rows committed before it.
//!
//! Either way the first failure aborts the load. Row failures roll back the
//! open transaction and are reported as [`FixtureError::RowProcessing`] with
//! the 1-based row number.

mod sequence;
mod statements;

pub use sequence::{setval_sql, SequenceCorrector, SEQUENCE_LOOKUP_SQL};
pub use statements::{count_sql, insert_sql, update_sql, RowStatements, TableTarget};

use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::row::RowDescriptor;
use crate::core::traits::{Dialect, FixtureDatabase, FixtureTransaction};
use crate::drivers::DialectImpl;
use crate::error::{FixtureError, Result};

/// Transaction granularity for a load call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionMode {
    /// One transaction for the whole document.
    #[default]
    SingleTransaction,
    /// One transaction per row.
    PerRowTransaction,
}

impl FromStr for TransactionMode {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "single-transaction" | "single" => Ok(TransactionMode::SingleTransaction),
            "per-row-transaction" | "per-row" => Ok(TransactionMode::PerRowTransaction),
            other => Err(FixtureError::Config(format!(
                "Invalid transaction_mode '{}'. Valid values: single-transaction, per-row-transaction",
                other
            ))),
        }
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionMode::SingleTransaction => f.write_str("single-transaction"),
            TransactionMode::PerRowTransaction => f.write_str("per-row-transaction"),
        }
    }
}

/// Counts from a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadSummary {
    /// Rows that did not exist and were inserted.
    pub rows_inserted: usize,
    /// Rows matched by primary key (updated, or left as-is when only keys were given).
    pub rows_updated: usize,
    /// Sequences realigned after explicit key writes.
    pub sequences_corrected: usize,
}

impl LoadSummary {
    /// Total rows processed.
    pub fn rows(&self) -> usize {
        self.rows_inserted + self.rows_updated
    }
}

impl AddAssign for LoadSummary {
    fn add_assign(&mut self, other: Self) {
        self.rows_inserted += other.rows_inserted;
        self.rows_updated += other.rows_updated;
        self.sequences_corrected += other.sequences_corrected;
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} sequences corrected",
            self.rows_inserted, self.rows_updated, self.sequences_corrected
        )
    }
}

/// State that lives as long as one transaction.
#[derive(Debug, Default)]
struct TransactionState {
    /// A row switched the search path away from the session default.
    search_path_changed: bool,
}

/// Loads fixture rows into a database.
pub struct FixtureLoader<'a> {
    db: &'a dyn FixtureDatabase,
    dialect: DialectImpl,
    mode: TransactionMode,
}

impl<'a> FixtureLoader<'a> {
    pub fn new(db: &'a dyn FixtureDatabase, dialect: DialectImpl, mode: TransactionMode) -> Self {
        Self { db, dialect, mode }
    }

    pub fn dialect(&self) -> &DialectImpl {
        &self.dialect
    }

    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Reconcile every row with the database, in order.
    pub async fn load_rows(&self, rows: &[RowDescriptor]) -> Result<LoadSummary> {
        let mut sequences = SequenceCorrector::new();
        let summary = match self.mode {
            TransactionMode::SingleTransaction => self.load_batch(rows, &mut sequences).await?,
            TransactionMode::PerRowTransaction => self.load_per_row(rows, &mut sequences).await?,
        };

        info!(
            "Loaded {} rows ({}) using {} on {}",
            summary.rows(),
            summary,
            self.mode,
            self.dialect
        );
        Ok(summary)
    }

    async fn load_batch(
        &self,
        rows: &[RowDescriptor],
        sequences: &mut SequenceCorrector,
    ) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();
        let mut tx = self.db.begin().await?;
        let mut state = TransactionState::default();

        for (idx, row) in rows.iter().enumerate() {
            let result = self.apply_row(tx.as_mut(), &mut state, sequences, row).await;
            match result {
                Ok(outcome) => summary += outcome,
                Err(e) => {
                    rollback_quietly(tx.as_mut()).await;
                    return Err(FixtureError::row(idx + 1, e));
                }
            }
        }

        let committed = tx.commit().await;
        if let Err(e) = committed {
            rollback_quietly(tx.as_mut()).await;
            return Err(e);
        }
        Ok(summary)
    }

    async fn load_per_row(
        &self,
        rows: &[RowDescriptor],
        sequences: &mut SequenceCorrector,
    ) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();

        for (idx, row) in rows.iter().enumerate() {
            let mut tx = self.db.begin().await?;
            let mut state = TransactionState::default();

            let result = self.apply_row(tx.as_mut(), &mut state, sequences, row).await;
            match result {
                Ok(outcome) => summary += outcome,
                Err(e) => {
                    rollback_quietly(tx.as_mut()).await;
                    return Err(FixtureError::row(idx + 1, e));
                }
            }

            let committed = tx.commit().await;
            if let Err(e) = committed {
                rollback_quietly(tx.as_mut()).await;
                return Err(e);
            }
        }
        Ok(summary)
    }

    /// Insert or update one row inside `tx`.
    async fn apply_row(
        &self,
        tx: &mut dyn FixtureTransaction,
        state: &mut TransactionState,
        sequences: &mut SequenceCorrector,
        row: &RowDescriptor,
    ) -> Result<LoadSummary> {
        let dialect = &self.dialect;
        let table = row.qualified_table()?;
        let target = TableTarget::resolve(dialect, &table);

        if let Some(sql) = &target.search_path {
            debug!("{}", sql);
            tx.execute(sql, &[]).await?;
            state.search_path_changed = true;
        } else if state.search_path_changed && table.schema.is_none() {
            if let Some(sql) = dialect.reset_search_path_sql() {
                debug!("{}", sql);
                tx.execute(&sql, &[]).await?;
            }
            state.search_path_changed = false;
        }

        let sql = count_sql(dialect, &target.table_ref, row);
        debug!("{}", sql);
        let count = tx.query_count(&sql, &row.primary_key_values()).await?;

        let mut outcome = LoadSummary::default();
        match count {
            0 => {
                let sql = insert_sql(dialect, &target.table_ref, row);
                debug!("{}", sql);
                tx.execute(&sql, &row.insert_values()).await?;
                outcome.rows_inserted = 1;
            }
            1 => {
                match update_sql(dialect, &target.table_ref, row) {
                    Some(sql) => {
                        debug!("{}", sql);
                        let mut values = row.update_values();
                        values.extend(row.primary_key_values());
                        tx.execute(&sql, &values).await?;
                    }
                    None => debug!("{}: row exists and has no fields to update", row.table()),
                }
                outcome.rows_updated = 1;
            }
            count => {
                return Err(FixtureError::AmbiguousPrimaryKey {
                    table: row.table().to_string(),
                    count,
                });
            }
        }

        if dialect.supports_sequence_correction() {
            for column in row.explicit_keys() {
                if sequences
                    .correct(tx, dialect, &target.qualified_ref, column)
                    .await?
                {
                    outcome.sequences_corrected += 1;
                }
            }
        }

        Ok(outcome)
    }
}

/// Roll back, logging instead of returning a failure.
async fn rollback_quietly(tx: &mut dyn FixtureTransaction) {
    if let Err(e) = tx.rollback().await {
        warn!("Rollback failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::FixtureValue;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Begin,
        Execute(String, Vec<FixtureValue>),
        Count(String, Vec<FixtureValue>),
        Lookup(String, Vec<FixtureValue>),
        Commit,
        Rollback,
    }

    #[derive(Default)]
    struct MockState {
        events: Vec<Event>,
        counts: VecDeque<i64>,
        sequence: Option<String>,
        fail_on: Option<String>,
        fail_commit: bool,
    }

    #[derive(Clone, Default)]
    struct MockDatabase {
        state: Arc<Mutex<MockState>>,
    }

    impl MockDatabase {
        fn with_state(state: MockState) -> Self {
            Self {
                state: Arc::new(Mutex::new(state)),
            }
        }

        fn events(&self) -> Vec<Event> {
            self.state.lock().unwrap().events.clone()
        }

        fn statements(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Execute(sql, _) | Event::Count(sql, _) | Event::Lookup(sql, _) => {
                        Some(sql)
                    }
                    _ => None,
                })
                .collect()
        }

        fn count(&self, event: &Event) -> usize {
            self.events().iter().filter(|e| *e == event).count()
        }
    }

    struct MockTransaction {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransaction {
        fn record(&self, event: Event) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let failed = match (&event, &state.fail_on) {
                (Event::Execute(sql, _) | Event::Count(sql, _), Some(pattern)) => {
                    sql.contains(pattern.as_str())
                }
                _ => false,
            };
            state.events.push(event);
            if failed {
                return Err(FixtureError::pool("statement failed", "mock"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl FixtureTransaction for MockTransaction {
        async fn execute(&mut self, sql: &str, params: &[FixtureValue]) -> Result<u64> {
            self.record(Event::Execute(sql.to_string(), params.to_vec()))?;
            Ok(1)
        }

        async fn query_count(&mut self, sql: &str, params: &[FixtureValue]) -> Result<i64> {
            self.record(Event::Count(sql.to_string(), params.to_vec()))?;
            Ok(self.state.lock().unwrap().counts.pop_front().unwrap_or(0))
        }

        async fn query_optional_text(
            &mut self,
            sql: &str,
            params: &[FixtureValue],
        ) -> Result<Option<String>> {
            self.record(Event::Lookup(sql.to_string(), params.to_vec()))?;
            Ok(self.state.lock().unwrap().sequence.clone())
        }

        async fn commit(&mut self) -> Result<()> {
            self.record(Event::Commit)?;
            if self.state.lock().unwrap().fail_commit {
                return Err(FixtureError::pool("commit failed", "mock"));
            }
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.record(Event::Rollback)?;
            Ok(())
        }
    }

    #[async_trait]
    impl FixtureDatabase for MockDatabase {
        async fn begin(&self) -> Result<Box<dyn FixtureTransaction>> {
            self.state.lock().unwrap().events.push(Event::Begin);
            Ok(Box::new(MockTransaction {
                state: Arc::clone(&self.state),
            }))
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }

        fn db_type(&self) -> &'static str {
            "mock"
        }

        async fn close(&self) {}
    }

    fn row(table: &str, id: i64) -> RowDescriptor {
        RowDescriptor::new(
            table,
            vec![("id".to_string(), FixtureValue::Int(id))],
            vec![("name".to_string(), FixtureValue::from(format!("row {}", id)))],
        )
        .unwrap()
    }

    fn loader<'a>(
        db: &'a MockDatabase,
        dialect: &str,
        mode: TransactionMode,
    ) -> FixtureLoader<'a> {
        FixtureLoader::new(db, DialectImpl::from_name(dialect).unwrap(), mode)
    }

    #[tokio::test]
    async fn test_insert_path() {
        let db = MockDatabase::default();
        let summary = loader(&db, "mysql", TransactionMode::SingleTransaction)
            .load_rows(&[row("users", 1)])
            .await
            .unwrap();

        assert_eq!(summary.rows_inserted, 1);
        assert_eq!(summary.rows_updated, 0);
        assert_eq!(
            db.events(),
            vec![
                Event::Begin,
                Event::Count(
                    "SELECT COUNT(*) FROM `users` WHERE `id` = ?".into(),
                    vec![FixtureValue::Int(1)]
                ),
                Event::Execute(
                    "INSERT INTO `users` (`id`, `name`) VALUES (?, ?)".into(),
                    vec![FixtureValue::Int(1), FixtureValue::from("row 1")]
                ),
                Event::Commit,
            ]
        );
    }

    #[tokio::test]
    async fn test_update_path_binds_fields_then_keys() {
        let db = MockDatabase::with_state(MockState {
            counts: VecDeque::from(vec![1]),
            ..Default::default()
        });
        let summary = loader(&db, "sqlite", TransactionMode::SingleTransaction)
            .load_rows(&[row("users", 7)])
            .await
            .unwrap();

        assert_eq!(summary.rows_updated, 1);
        assert!(db.events().contains(&Event::Execute(
            r#"UPDATE "users" SET "name" = ? WHERE "id" = ?"#.into(),
            vec![FixtureValue::from("row 7"), FixtureValue::Int(7)]
        )));
    }

    #[tokio::test]
    async fn test_key_only_existing_row_skips_update() {
        let db = MockDatabase::with_state(MockState {
            counts: VecDeque::from(vec![1]),
            ..Default::default()
        });
        let key_only = RowDescriptor::new(
            "tags",
            vec![("id".to_string(), FixtureValue::Int(1))],
            Vec::new(),
        )
        .unwrap();

        let summary = loader(&db, "sqlite", TransactionMode::SingleTransaction)
            .load_rows(&[key_only])
            .await
            .unwrap();

        assert_eq!(summary.rows_updated, 1);
        assert!(!db.statements().iter().any(|s| s.starts_with("UPDATE")));
    }

    #[tokio::test]
    async fn test_per_row_failure_keeps_earlier_rows() {
        let db = MockDatabase::with_state(MockState {
            fail_on: Some(r#"INSERT INTO "t3""#.to_string()),
            ..Default::default()
        });
        let rows: Vec<_> = (1..=5).map(|i| row(&format!("t{}", i), i)).collect();

        let err = loader(&db, "sqlite", TransactionMode::PerRowTransaction)
            .load_rows(&rows)
            .await
            .unwrap_err();

        assert_eq!(err.failed_row(), Some(3));
        assert!(err.to_string().starts_with("Error loading row 3:"));
        assert_eq!(db.count(&Event::Begin), 3);
        assert_eq!(db.count(&Event::Commit), 2);
        assert_eq!(db.count(&Event::Rollback), 1);
        assert!(!db
            .statements()
            .iter()
            .any(|s| s.contains("\"t4\"") || s.contains("\"t5\"")));
    }

    #[tokio::test]
    async fn test_batch_failure_commits_nothing() {
        let db = MockDatabase::with_state(MockState {
            fail_on: Some(r#"INSERT INTO "t3""#.to_string()),
            ..Default::default()
        });
        let rows: Vec<_> = (1..=5).map(|i| row(&format!("t{}", i), i)).collect();

        let err = loader(&db, "sqlite", TransactionMode::SingleTransaction)
            .load_rows(&rows)
            .await
            .unwrap_err();

        assert_eq!(err.failed_row(), Some(3));
        assert_eq!(db.count(&Event::Begin), 1);
        assert_eq!(db.count(&Event::Commit), 0);
        assert_eq!(db.count(&Event::Rollback), 1);
    }

    #[tokio::test]
    async fn test_count_failure_is_row_error() {
        let db = MockDatabase::with_state(MockState {
            fail_on: Some("SELECT COUNT(*)".to_string()),
            ..Default::default()
        });

        let err = loader(&db, "postgres", TransactionMode::SingleTransaction)
            .load_rows(&[row("users", 1)])
            .await
            .unwrap_err();

        assert_eq!(err.failed_row(), Some(1));
        assert_eq!(db.events().last(), Some(&Event::Rollback));
    }

    #[tokio::test]
    async fn test_malformed_table_is_row_error() {
        let db = MockDatabase::default();
        let err = loader(&db, "postgres", TransactionMode::SingleTransaction)
            .load_rows(&[row("users", 1), row("a.b.c", 2)])
            .await
            .unwrap_err();

        assert_eq!(err.failed_row(), Some(2));
        assert!(matches!(
            err.root_cause(),
            FixtureError::MalformedTableName(name) if name == "a.b.c"
        ));
        assert_eq!(db.count(&Event::Commit), 0);
    }

    #[tokio::test]
    async fn test_ambiguous_primary_key() {
        let db = MockDatabase::with_state(MockState {
            counts: VecDeque::from(vec![2]),
            ..Default::default()
        });

        let err = loader(&db, "mysql", TransactionMode::SingleTransaction)
            .load_rows(&[row("users", 1)])
            .await
            .unwrap_err();

        assert!(matches!(
            err.root_cause(),
            FixtureError::AmbiguousPrimaryKey { count: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let db = MockDatabase::with_state(MockState {
            fail_commit: true,
            ..Default::default()
        });

        let err = loader(&db, "sqlite", TransactionMode::PerRowTransaction)
            .load_rows(&[row("users", 1), row("users", 2)])
            .await
            .unwrap_err();

        assert!(err.failed_row().is_none());
        assert_eq!(db.count(&Event::Begin), 1);
        assert_eq!(db.events().last(), Some(&Event::Rollback));
    }

    #[tokio::test]
    async fn test_search_path_switch_and_reset() {
        let db = MockDatabase::default();
        loader(&db, "postgres", TransactionMode::SingleTransaction)
            .load_rows(&[row("app.users", 1), row("app.users", 2), row("users", 3)])
            .await
            .unwrap();

        let statements = db.statements();
        let set: Vec<_> = statements
            .iter()
            .filter(|s| s.starts_with("SET LOCAL"))
            .collect();
        assert_eq!(
            set,
            vec![
                r#"SET LOCAL search_path TO "app""#,
                r#"SET LOCAL search_path TO "app""#,
                "SET LOCAL search_path TO DEFAULT",
            ]
        );
        assert!(statements.contains(&r#"SELECT COUNT(*) FROM "users" WHERE "id" = $1"#.to_string()));
    }

    #[tokio::test]
    async fn test_per_row_mode_never_resets_search_path() {
        let db = MockDatabase::default();
        loader(&db, "postgres", TransactionMode::PerRowTransaction)
            .load_rows(&[row("app.users", 1), row("users", 2)])
            .await
            .unwrap();

        assert!(!db.statements().iter().any(|s| s.ends_with("TO DEFAULT")));
    }

    #[tokio::test]
    async fn test_sequence_correction_on_postgres() {
        let db = MockDatabase::with_state(MockState {
            sequence: Some("app.users_id_seq".to_string()),
            counts: VecDeque::from(vec![0, 1]),
            ..Default::default()
        });

        let summary = loader(&db, "postgres", TransactionMode::SingleTransaction)
            .load_rows(&[row("app.users", 100), row("app.users", 100)])
            .await
            .unwrap();

        assert_eq!(summary.rows_inserted, 1);
        assert_eq!(summary.rows_updated, 1);
        assert_eq!(summary.sequences_corrected, 2);

        let lookups: Vec<_> = db
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Lookup(..)))
            .collect();
        assert_eq!(
            lookups,
            vec![Event::Lookup(
                SEQUENCE_LOOKUP_SQL.to_string(),
                vec![
                    FixtureValue::from(r#""app"."users""#),
                    FixtureValue::from("id")
                ]
            )]
        );
        assert!(db.events().contains(&Event::Execute(
            r#"SELECT setval($1::text::regclass, COALESCE((SELECT MAX("id") FROM "app"."users"), 1))"#
                .into(),
            vec![FixtureValue::from("app.users_id_seq")]
        )));
    }

    fn lookups(db: &MockDatabase) -> usize {
        db.events()
            .iter()
            .filter(|e| matches!(e, Event::Lookup(..)))
            .count()
    }

    #[tokio::test]
    async fn test_quoted_integer_key_is_corrected() {
        let db = MockDatabase::with_state(MockState {
            sequence: Some("users_id_seq".to_string()),
            ..Default::default()
        });
        let quoted = RowDescriptor::new(
            "users",
            vec![("id".to_string(), FixtureValue::from("100"))],
            Vec::new(),
        )
        .unwrap();

        let summary = loader(&db, "postgres", TransactionMode::SingleTransaction)
            .load_rows(&[quoted])
            .await
            .unwrap();

        assert_eq!(summary.sequences_corrected, 1);
        assert_eq!(lookups(&db), 1);
    }

    #[tokio::test]
    async fn test_key_without_sequence_is_left_alone() {
        let db = MockDatabase::default();
        let text_key = RowDescriptor::new(
            "countries",
            vec![("code".to_string(), FixtureValue::from("NZ"))],
            Vec::new(),
        )
        .unwrap();

        let summary = loader(&db, "postgres", TransactionMode::SingleTransaction)
            .load_rows(&[text_key])
            .await
            .unwrap();

        assert_eq!(summary.sequences_corrected, 0);
        assert_eq!(lookups(&db), 1);
        assert!(!db.statements().iter().any(|s| s.contains("setval")));
    }

    #[tokio::test]
    async fn test_no_sequence_lookup_on_other_dialects() {
        let db = MockDatabase::with_state(MockState {
            sequence: Some("seq".to_string()),
            ..Default::default()
        });
        loader(&db, "mysql", TransactionMode::SingleTransaction)
            .load_rows(&[row("users", 1)])
            .await
            .unwrap();
        loader(&db, "sqlite", TransactionMode::SingleTransaction)
            .load_rows(&[row("users", 2)])
            .await
            .unwrap();

        assert_eq!(lookups(&db), 0);
    }

    #[test]
    fn test_transaction_mode_parsing() {
        assert_eq!(
            "per-row-transaction".parse::<TransactionMode>().unwrap(),
            TransactionMode::PerRowTransaction
        );
        assert_eq!(
            "single".parse::<TransactionMode>().unwrap(),
            TransactionMode::SingleTransaction
        );
        assert!("sometimes".parse::<TransactionMode>().is_err());
        assert_eq!(
            TransactionMode::PerRowTransaction.to_string(),
            "per-row-transaction"
        );
    }

    #[test]
    fn test_summary_accumulates() {
        let mut total = LoadSummary::default();
        total += LoadSummary {
            rows_inserted: 2,
            rows_updated: 1,
            sequences_corrected: 1,
        };
        total += LoadSummary {
            rows_inserted: 1,
            ..Default::default()
        };
        assert_eq!(total.rows(), 4);
        assert_eq!(total.to_string(), "3 inserted, 1 updated, 1 sequences corrected");
    }
}
