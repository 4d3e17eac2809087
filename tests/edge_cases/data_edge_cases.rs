//! Edge case tests for awkward input data

use crate::common::assertions::assert_counts;
use crate::common::TestFixture;
use rowdiff::{ComparisonJob, CompareOptions, RowStatus};

fn keyed() -> CompareOptions {
    CompareOptions::default().with_key_columns(["id"])
}

#[test]
fn test_quoted_fields_with_commas_and_quotes() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture
        .create_csv_raw("old.csv", "id,name\n1,\"Smith, John\"\n2,\"say \"\"hi\"\"\"\n")
        .unwrap();
    let new = fixture
        .create_csv_raw("new.csv", "id,name\n1,\"Smith, John\"\n2,\"say \"\"bye\"\"\"\n")
        .unwrap();

    let outcome = ComparisonJob::csv("quotes", &old, &new, keyed()).run().unwrap();
    assert_counts(&outcome, 0, 0, 1, 1);

    let updated = outcome.rows_with_status(RowStatus::Updated).next().unwrap();
    assert_eq!(updated.old_values.as_ref().unwrap().value("name"), Some("say \"hi\""));
    assert_eq!(updated.new_values.as_ref().unwrap().value("name"), Some("say \"bye\""));
}

#[test]
fn test_malformed_lines_are_skipped_and_counted() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture
        .create_csv_raw("old.csv", "id,name,city\n1,A,X\n2,B\n3,C,Z,extra\n4,D,W\n")
        .unwrap();
    let new = fixture.create_csv_raw("new.csv", "id,name,city\n1,A,X\n4,D,W\n").unwrap();

    let outcome = ComparisonJob::csv("broken", &old, &new, keyed()).run().unwrap();
    assert_eq!(outcome.old_stats.rows_skipped, 2);
    assert_eq!(outcome.old_stats.rows_read, 2);
    assert_counts(&outcome, 0, 0, 0, 2);
}

#[test]
fn test_unterminated_quote_does_not_fail() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_csv_raw("old.csv", "id,note\n1,\"open ended\n2,ok\n").unwrap();
    let new = fixture.create_csv_raw("new.csv", "id,note\n1,\"open ended\n2,ok\n").unwrap();

    let outcome = ComparisonJob::csv("quotes", &old, &new, keyed()).run().unwrap();
    assert_eq!(outcome.old_stats.rows_read, 2);
    assert_counts(&outcome, 0, 0, 0, 2);
}

#[test]
fn test_bom_crlf_and_blank_lines() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture
        .create_file_bytes("old.csv", b"\xEF\xBB\xBFid,name\r\n1,A\r\n\r\n2,B\r\n")
        .unwrap();
    let new = fixture.create_csv_raw("new.csv", "id,name\n1,A\n2,B\n").unwrap();

    let outcome = ComparisonJob::csv("bom", &old, &new, keyed()).run().unwrap();
    assert!(outcome.schema_drift.is_empty());
    assert_eq!(outcome.old_stats.rows_skipped, 0);
    assert_counts(&outcome, 0, 0, 0, 2);
}

#[test]
fn test_invalid_utf8_line_is_skipped() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture
        .create_file_bytes("old.csv", b"id,name\n1,A\n2,\xFF\xFE\n3,C\n")
        .unwrap();
    let new = fixture.create_csv_raw("new.csv", "id,name\n1,A\n3,C\n").unwrap();

    let outcome = ComparisonJob::csv("bytes", &old, &new, keyed()).run().unwrap();
    assert_eq!(outcome.old_stats.rows_skipped, 1);
    assert_counts(&outcome, 0, 0, 0, 2);
}

#[test]
fn test_empty_string_and_null_policy() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_csv_raw("old.csv", "id,note\n1,\n").unwrap();
    let new = fixture.create_csv_raw("new.csv", "id,note\n1,\n").unwrap();

    // Empty on both sides is unchanged under either policy
    for empty_as_null in [true, false] {
        let options = keyed().with_empty_as_null(empty_as_null);
        let outcome = ComparisonJob::csv("notes", &old, &new, options).run().unwrap();
        assert_counts(&outcome, 0, 0, 0, 1);
    }

    let old_null = fixture.create_csv_raw("old_null.csv", "id,note\n,x\n").unwrap();
    let new_null = fixture.create_csv_raw("new_null.csv", "id,note\n,x\n").unwrap();
    let outcome = ComparisonJob::csv("notes", &old_null, &new_null, keyed()).run().unwrap();
    assert_counts(&outcome, 0, 0, 0, 1);
    assert_eq!(outcome.key_columns, vec!["id"]);
}

#[test]
fn test_duplicate_keys_last_write_wins() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_csv_raw("old.csv", "id,name\n1,first\n2,B\n1,second\n").unwrap();
    let new = fixture.create_csv_raw("new.csv", "id,name\n1,second\n2,B\n").unwrap();

    let outcome = ComparisonJob::csv("dups", &old, &new, keyed()).run().unwrap();
    assert_eq!(outcome.old_stats.duplicate_keys, 1);
    assert_counts(&outcome, 0, 0, 0, 2);
}

#[test]
fn test_schema_drift_is_reported_not_fatal() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_csv_raw("old.csv", "id,name,legacy\n1,A,x\n").unwrap();
    let new = fixture.create_csv_raw("new.csv", "id,name,added\n1,A,y\n").unwrap();

    let outcome = ComparisonJob::csv("drift", &old, &new, keyed()).run().unwrap();
    assert_eq!(outcome.schema_drift.only_in_old, vec!["legacy"]);
    assert_eq!(outcome.schema_drift.only_in_new, vec!["added"]);
    assert_counts(&outcome, 0, 0, 1, 0);

    let updated = outcome.rows_with_status(RowStatus::Updated).next().unwrap();
    assert_eq!(updated.changed_columns, vec!["legacy", "added"]);
}

#[test]
fn test_empty_files() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture.create_csv_raw("old.csv", "").unwrap();
    let new = fixture.create_csv_raw("new.csv", "id,name\n").unwrap();

    let outcome = ComparisonJob::csv("empty", &old, &new, keyed()).run().unwrap();
    assert_counts(&outcome, 0, 0, 0, 0);
    assert!(outcome.diffs.is_empty());
}
