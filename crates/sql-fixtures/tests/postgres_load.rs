//! Fixture loading against a live PostgreSQL server.
//!
//! Point `SQL_FIXTURES_PG_CONFIG` at a fixtures config file whose database
//! section targets a disposable PostgreSQL database, then run with
//! `cargo test --test postgres_load -- --ignored`. Each test works in its own
//! schema and drops it first.

use sql_fixtures::drivers::PostgresDatabase;
use sql_fixtures::{load, Config, TransactionMode};

async fn connect() -> Option<PostgresDatabase> {
    let Ok(path) = std::env::var("SQL_FIXTURES_PG_CONFIG") else {
        eprintln!("SQL_FIXTURES_PG_CONFIG not set, skipping");
        return None;
    };
    let config = Config::load(path).expect("Failed to load config");
    Some(
        PostgresDatabase::new(&config.database)
            .await
            .expect("Failed to connect"),
    )
}

async fn batch(db: &PostgresDatabase, sql: &str) {
    let client = db.pool().get().await.unwrap();
    client.batch_execute(sql).await.unwrap();
}

#[tokio::test]
#[ignore] // Run with --ignored flag
async fn test_sequence_moves_past_explicit_ids() {
    let Some(db) = connect().await else { return };
    batch(
        &db,
        r#"
DROP SCHEMA IF EXISTS fx_sequence CASCADE;
CREATE SCHEMA fx_sequence;
CREATE TABLE fx_sequence.users (id SERIAL PRIMARY KEY, name TEXT NOT NULL);
"#,
    )
    .await;

    let summary = load(
        b"- table: fx_sequence.users\n  pk: {id: 100}\n  fields: {name: alice}\n- table: fx_sequence.users\n  pk: {id: '7'}\n  fields: {name: bob}\n",
        &db,
        "postgres",
        TransactionMode::SingleTransaction,
    )
    .await
    .unwrap();
    assert_eq!(summary.rows_inserted, 2);
    assert_eq!(summary.sequences_corrected, 2);

    let client = db.pool().get().await.unwrap();
    let row = client
        .query_one(
            "INSERT INTO fx_sequence.users (name) VALUES ('carol') RETURNING id",
            &[],
        )
        .await
        .unwrap();
    let id: i32 = row.get(0);
    assert!(id >= 101, "next id was {}", id);
}

#[tokio::test]
#[ignore] // Run with --ignored flag
async fn test_schema_switch_and_reset() {
    let Some(db) = connect().await else { return };
    batch(
        &db,
        r#"
DROP SCHEMA IF EXISTS fx_schema CASCADE;
CREATE SCHEMA fx_schema;
CREATE TABLE fx_schema.widgets (id INT PRIMARY KEY, label TEXT);
DROP TABLE IF EXISTS public.fx_gadgets;
CREATE TABLE public.fx_gadgets (id INT PRIMARY KEY, label TEXT);
"#,
    )
    .await;

    // the unqualified row only resolves once the search path is back to default
    let fixture = br#"
- table: fx_schema.widgets
  pk: {id: 1}
  fields: {label: sprocket}
- table: fx_gadgets
  pk: {id: 1}
  fields: {label: gizmo}
"#;

    let first = load(fixture, &db, "postgres", TransactionMode::SingleTransaction)
        .await
        .unwrap();
    assert_eq!(first.rows_inserted, 2);

    let again = load(fixture, &db, "postgres", TransactionMode::SingleTransaction)
        .await
        .unwrap();
    assert_eq!(again.rows_updated, 2);

    let client = db.pool().get().await.unwrap();
    let widgets: i64 = client
        .query_one("SELECT COUNT(*) FROM fx_schema.widgets", &[])
        .await
        .unwrap()
        .get(0);
    let gadgets: i64 = client
        .query_one("SELECT COUNT(*) FROM public.fx_gadgets", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!((widgets, gadgets), (1, 1));

    let path: String = client
        .query_one("SHOW search_path", &[])
        .await
        .unwrap()
        .get(0);
    assert!(!path.contains("fx_schema"));
}

#[tokio::test]
#[ignore] // Run with --ignored flag
async fn test_column_types_round_trip() {
    let Some(db) = connect().await else { return };
    batch(
        &db,
        r#"
DROP SCHEMA IF EXISTS fx_types CASCADE;
CREATE SCHEMA fx_types;
CREATE TYPE fx_types.mood AS ENUM ('happy', 'sad');
CREATE DOMAIN fx_types.positive_int AS INT CHECK (VALUE > 0);
CREATE TABLE fx_types.samples (
    id UUID PRIMARY KEY,
    addr INET,
    net CIDR,
    price NUMERIC(10, 2),
    ratio REAL,
    small SMALLINT,
    active BOOLEAN,
    doc JSONB,
    born DATE,
    seen_at TIMESTAMPTZ,
    mood fx_types.mood,
    qty fx_types.positive_int,
    note VARCHAR(20)
);
"#,
    )
    .await;

    let fixture = br#"
- table: fx_types.samples
  pk:
    id: 67e55044-10b1-426f-9247-bb680e5fe0c8
  fields:
    addr: 10.0.0.1
    net: 192.168.0.0/16
    price: '12.50'
    ratio: 0.5
    small: 7
    active: 'yes'
    doc: '{"a": 1}'
    born: '2024-03-01'
    seen_at: '2024-03-01T10:20:30Z'
    mood: happy
    qty: 5
    note: hello
"#;

    load(fixture, &db, "postgres", TransactionMode::SingleTransaction)
        .await
        .unwrap();

    let client = db.pool().get().await.unwrap();
    let row = client
        .query_one(
            "SELECT addr::text, net::text, price::text, ratio::text, small::text, active::text, \
             doc::text, born::text, (seen_at AT TIME ZONE 'UTC')::text, mood::text, qty::text, note \
             FROM fx_types.samples",
            &[],
        )
        .await
        .unwrap();
    let values: Vec<String> = (0..12).map(|i| row.get::<_, String>(i)).collect();
    assert_eq!(
        values,
        vec![
            "10.0.0.1/32",
            "192.168.0.0/16",
            "12.50",
            "0.5",
            "7",
            "true",
            r#"{"a": 1}"#,
            "2024-03-01",
            "2024-03-01 10:20:30",
            "happy",
            "5",
            "hello",
        ]
    );
}
