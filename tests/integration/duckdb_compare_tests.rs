//! Integration tests for comparing tables in DuckDB database files

use crate::common::assertions::{assert_counts, keys_with_status};
use crate::common::TestFixture;
use rowdiff::database::{DuckDbSource, DEFAULT_SCHEMA};
use rowdiff::{run_jobs, ComparisonJob, CompareOptions, KeyMode, RowStatus, RowdiffError};

const OLD_SQL: &str = "
    CREATE TABLE customers (id INTEGER PRIMARY KEY, name VARCHAR, city VARCHAR);
    INSERT INTO customers VALUES (1, 'Alice', 'Paris'), (2, 'Bob', 'Berlin'), (3, 'Carol', 'Rome');
    CREATE TABLE events (kind VARCHAR, note VARCHAR);
    INSERT INTO events VALUES ('login', 'ok'), ('logout', NULL);
";

const NEW_SQL: &str = "
    CREATE TABLE customers (id INTEGER PRIMARY KEY, name VARCHAR, city VARCHAR);
    INSERT INTO customers VALUES (1, 'Alice', 'Paris'), (2, 'Bob', 'Munich'), (4, 'Dave', 'Oslo');
    CREATE TABLE events (kind VARCHAR, note VARCHAR);
    INSERT INTO events VALUES ('login', 'ok'), ('logout', NULL);
";

#[test]
fn test_db_compare_uses_primary_key() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_duckdb("old.duckdb", OLD_SQL).unwrap();
    let new = fixture.create_duckdb("new.duckdb", NEW_SQL).unwrap();

    let outcome = ComparisonJob::duckdb(&old, &new, DEFAULT_SCHEMA, "customers", CompareOptions::default())
        .run()
        .unwrap();

    assert_eq!(outcome.entity, "main.customers");
    assert_eq!(outcome.key_mode, KeyMode::Declared);
    assert_eq!(outcome.key_columns, vec!["id"]);
    assert_counts(&outcome, 1, 1, 1, 1);
    assert_eq!(keys_with_status(&outcome, RowStatus::Updated), vec!["id=2"]);
}

#[test]
fn test_db_table_without_primary_key() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_duckdb("old.duckdb", OLD_SQL).unwrap();
    let new = fixture.create_duckdb("new.duckdb", NEW_SQL).unwrap();

    let outcome = ComparisonJob::duckdb(&old, &new, DEFAULT_SCHEMA, "events", CompareOptions::default())
        .run()
        .unwrap();

    assert_eq!(outcome.key_mode, KeyMode::FullRow);
    assert_counts(&outcome, 0, 0, 0, 2);
}

#[test]
fn test_db_key_override() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_duckdb("old.duckdb", OLD_SQL).unwrap();
    let new = fixture.create_duckdb("new.duckdb", NEW_SQL).unwrap();

    let options = CompareOptions::default().with_key_columns(["name"]);
    let outcome = ComparisonJob::duckdb(&old, &new, DEFAULT_SCHEMA, "customers", options)
        .run()
        .unwrap();

    assert_eq!(outcome.key_columns, vec!["name"]);
    assert_eq!(keys_with_status(&outcome, RowStatus::Deleted), vec!["name=Carol"]);
    assert_eq!(keys_with_status(&outcome, RowStatus::Added), vec!["name=Dave"]);
}

#[test]
fn test_db_every_table() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_duckdb("old.duckdb", OLD_SQL).unwrap();
    let new = fixture.create_duckdb("new.duckdb", NEW_SQL).unwrap();

    let tables = DuckDbSource::list_tables(&old, DEFAULT_SCHEMA).unwrap();
    assert_eq!(tables, vec!["customers", "events"]);

    let jobs = tables
        .iter()
        .map(|t| ComparisonJob::duckdb(&old, &new, DEFAULT_SCHEMA, t, CompareOptions::default()))
        .collect();
    let outcomes = run_jobs(jobs);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].entity, "main.customers");
    assert_eq!(outcomes[1].entity, "main.events");
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
}

#[test]
fn test_db_missing_table_fails_job_only() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_duckdb("old.duckdb", OLD_SQL).unwrap();
    let new = fixture.create_duckdb("new.duckdb", "CREATE TABLE other (id INTEGER);").unwrap();

    let jobs = vec![
        ComparisonJob::duckdb(&old, &new, DEFAULT_SCHEMA, "customers", CompareOptions::default()),
        ComparisonJob::csv("unrelated", &fixture.path("x.csv"), &fixture.path("y.csv"), CompareOptions::default()),
    ];
    let outcomes = run_jobs(jobs);
    assert!(matches!(outcomes[0].result, Err(RowdiffError::SourceUnavailable { .. })));
    assert!(matches!(outcomes[1].result, Err(RowdiffError::SourceUnavailable { .. })));
}

#[test]
fn test_db_primary_key_dropped_on_new_side() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture
        .create_duckdb(
            "old.duckdb",
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name VARCHAR); INSERT INTO t VALUES (1, 'A'), (2, 'B');",
        )
        .unwrap();
    let new = fixture
        .create_duckdb(
            "new.duckdb",
            "CREATE TABLE t (id INTEGER, name VARCHAR); INSERT INTO t VALUES (1, 'A'), (2, 'B2');",
        )
        .unwrap();

    let outcome = ComparisonJob::duckdb(&old, &new, DEFAULT_SCHEMA, "t", CompareOptions::default())
        .run()
        .unwrap();

    assert_eq!(outcome.key_mode, KeyMode::Declared);
    assert_eq!(outcome.key_columns, vec!["id"]);
    assert_counts(&outcome, 0, 0, 1, 1);
    assert_eq!(keys_with_status(&outcome, RowStatus::Updated), vec!["id=2"]);
}
