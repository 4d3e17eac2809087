//! Directory pairing and multi-file comparison tests

use crate::common::{CliTestRunner, TestFixture};
use rowdiff::discovery::discover_csv_pairs;
use rowdiff::{run_jobs, ComparisonJob, CompareOptions, RowdiffError};

fn populate(fixture: &TestFixture) {
    fixture.create_csv_raw("base/orders.csv", "id,qty\n1,5\n2,7\n").unwrap();
    fixture.create_csv_raw("compare/ORDERS.csv", "id,qty\n1,5\n2,8\n").unwrap();
    fixture.create_csv_raw("base/users.csv", "id,name\n1,A\n").unwrap();
    fixture.create_csv_raw("compare/users.csv", "id,name\n1,A\n2,B\n").unwrap();
    fixture.create_csv_raw("base/access_log.csv", "ts,ip\n1,x\n").unwrap();
    fixture.create_csv_raw("compare/access_log.csv", "ts,ip\n2,y\n").unwrap();
    fixture.create_csv_raw("base/retired.csv", "id\n1\n").unwrap();
}

#[test]
fn test_directory_pairs_run_as_jobs() {
    let fixture = TestFixture::new().unwrap();
    populate(&fixture);

    let exclude = vec!["access_log.csv".to_string()];
    let pairs = discover_csv_pairs(&fixture.path("base"), &fixture.path("compare"), &exclude).unwrap();
    let names: Vec<&str> = pairs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["orders", "users"]);

    let options = CompareOptions::default().with_key_columns(["id"]);
    let jobs = pairs
        .iter()
        .map(|p| ComparisonJob::csv(p.name.clone(), &p.base, &p.compare, options.clone()))
        .collect();
    let outcomes = run_jobs(jobs);

    let orders = outcomes[0].result.as_ref().unwrap();
    assert_eq!(orders.summary.updated, 1);
    let users = outcomes[1].result.as_ref().unwrap();
    assert_eq!(users.summary.added, 1);
}

#[test]
fn test_dir_command_writes_combined_report() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    populate(fixture);
    let report = fixture.path("dir.json");

    runner.expect_success(&[
        "dir",
        fixture.path("base").to_str().unwrap(),
        fixture.path("compare").to_str().unwrap(),
        "--exclude",
        "access_log.csv",
        "--key",
        "id",
        "--format",
        "json",
        "--output",
        report.to_str().unwrap(),
    ]);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 2);
    assert_eq!(json["totals"]["updated"], 1);
    assert_eq!(json["totals"]["added"], 1);
    assert_eq!(json["totals"]["unchanged"], 2);
}

#[test]
fn test_dir_command_with_no_pairs_fails() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_csv_raw("base/a.csv", "id\n1\n").unwrap();
    fixture.create_csv_raw("compare/b.csv", "id\n1\n").unwrap();

    let err = runner.expect_failure(&[
        "dir",
        fixture.path("base").to_str().unwrap(),
        fixture.path("compare").to_str().unwrap(),
        "--no-progress",
    ]);
    assert!(matches!(err, RowdiffError::InvalidInput { .. }));
}
