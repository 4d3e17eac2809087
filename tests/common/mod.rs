//! Common test utilities and helpers

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use rowdiff::Result;

/// Test fixture manager for creating temporary test environments
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Get the root path of the test fixture
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a test CSV file with sample data
    pub fn create_csv(&self, name: &str, data: &[Vec<&str>]) -> Result<PathBuf> {
        let mut content = String::new();
        for row in data {
            content.push_str(&row.join(","));
            content.push('\n');
        }
        self.create_csv_raw(name, &content)
    }

    /// Create a test CSV file with raw string content
    pub fn create_csv_raw(&self, name: &str, content: &str) -> Result<PathBuf> {
        self.create_file_bytes(name, content.as_bytes())
    }

    /// Create a file with arbitrary bytes, creating parent directories
    pub fn create_file_bytes(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a CSV file with `rows` generated rows keyed by `id`
    pub fn create_large_csv(&self, name: &str, rows: usize, cols: usize) -> Result<PathBuf> {
        let mut content = String::from("id");
        for i in 0..cols {
            content.push_str(&format!(",col_{}", i));
        }
        content.push('\n');

        for row in 0..rows {
            content.push_str(&row.to_string());
            for col in 0..cols {
                content.push_str(&format!(",value_{}_{}", row, col));
            }
            content.push('\n');
        }

        self.create_csv_raw(name, &content)
    }

    /// Create a DuckDB database file by running `sql`
    pub fn create_duckdb(&self, name: &str, sql: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        let conn = duckdb::Connection::open(&path)?;
        conn.execute_batch(sql)?;
        Ok(path)
    }

    /// Path inside the fixture that is not created
    pub fn path(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }
}

/// Helper for running CLI commands in tests
pub struct CliTestRunner {
    fixture: TestFixture,
}

impl CliTestRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fixture: TestFixture::new()?,
        })
    }

    pub fn fixture(&self) -> &TestFixture {
        &self.fixture
    }

    /// Run a rowdiff command and return the result
    pub fn run_command(&self, args: &[&str]) -> Result<()> {
        use clap::Parser;
        use rowdiff::cli::Cli;
        use rowdiff::commands::execute_command;

        let mut cmd_args = vec!["rowdiff"];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args)
            .map_err(|e| rowdiff::RowdiffError::invalid_input(e.to_string()))?;
        execute_command(cli.command)
    }

    /// Run a command and expect it to succeed
    pub fn expect_success(&self, args: &[&str]) {
        self.run_command(args).expect("Command should succeed");
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> rowdiff::RowdiffError {
        self.run_command(args).expect_err("Command should fail")
    }
}

/// Sample data generators for testing
pub mod sample_data {
    pub fn customers_old() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "city"],
            vec!["1", "Alice", "Paris"],
            vec!["2", "Bob", "Berlin"],
            vec!["3", "Carol", "Rome"],
        ]
    }

    pub fn customers_new() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "city"],
            vec!["1", "Alice", "Paris"],
            vec!["2", "Bob", "Munich"], // City changed
            vec!["4", "Dave", "Oslo"],  // New row, Carol removed
        ]
    }
}

/// Assertion helpers for test validation
pub mod assertions {
    use rowdiff::{DiffOutcome, RowStatus};

    /// Keys (rendered) of every diff with `status`, in emission order
    pub fn keys_with_status(outcome: &DiffOutcome, status: RowStatus) -> Vec<String> {
        outcome
            .rows_with_status(status)
            .map(|d| d.key.to_string())
            .collect()
    }

    /// Assert the per-status counts of an outcome
    pub fn assert_counts(outcome: &DiffOutcome, deleted: u64, added: u64, updated: u64, unchanged: u64) {
        let s = &outcome.summary;
        assert_eq!(
            (s.deleted, s.added, s.updated, s.unchanged),
            (deleted, added, updated, unchanged),
            "unexpected counts for {}",
            outcome.entity
        );
    }
}
