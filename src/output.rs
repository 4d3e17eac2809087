//! Output formatting utilities

use crate::change_detection::{DiffOutcome, DiffSummary, RowDiff, RowStatus, SchemaDrift};
use crate::config::CompareOptions;
use crate::error::Result;
use crate::job::JobOutcome;
use crate::record::KeyMode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// A job that produced no outcome
#[derive(Debug, Clone, Serialize)]
pub struct JobFailure {
    pub entity: String,
    pub error: String,
}

/// Everything one run produced, ready for a reporting collaborator
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub generated_at: DateTime<Utc>,
    pub options: CompareOptions,
    pub totals: DiffSummary,
    pub outcomes: Vec<DiffOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<JobFailure>,
}

impl DiffReport {
    pub fn new(options: CompareOptions, jobs: Vec<JobOutcome>) -> Self {
        let mut totals = DiffSummary::default();
        let mut outcomes = Vec::new();
        let mut failures = Vec::new();

        for job in jobs {
            match job.result {
                Ok(outcome) => {
                    totals.merge(&outcome.summary);
                    outcomes.push(outcome);
                }
                Err(e) => failures.push(JobFailure {
                    entity: job.entity,
                    error: e.to_string(),
                }),
            }
        }

        Self {
            generated_at: Utc::now(),
            options,
            totals,
            outcomes,
            failures,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        self.totals.has_changes()
    }
}

/// Pretty printer for rowdiff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print a whole run: one tree per entity, then the totals
    pub fn print_report(report: &DiffReport, sample_rows: usize) {
        for outcome in &report.outcomes {
            Self::print_outcome(outcome, sample_rows);
            println!();
        }

        for failure in &report.failures {
            println!("❌ {}: {}", failure.entity, failure.error);
        }
        if !report.failures.is_empty() {
            println!();
        }

        let entities = report.outcomes.len() + report.failures.len();
        println!("📊 Totals across {} entities", entities);
        Self::print_summary(&report.totals, "");
    }

    /// Print one entity's outcome
    pub fn print_outcome(outcome: &DiffOutcome, sample_rows: usize) {
        let status = if outcome.summary.has_changes() { "❌" } else { "✅" };
        println!("🔍 {} {}", outcome.entity, status);

        if outcome.key_mode == KeyMode::FullRow {
            println!("├─ Key: full row");
        } else {
            println!("├─ Key: {}", outcome.key_columns.join(", "));
        }
        println!(
            "├─ Rows read: {} old, {} new",
            outcome.old_stats.rows_read, outcome.new_stats.rows_read
        );

        let skipped = outcome.old_stats.rows_skipped + outcome.new_stats.rows_skipped;
        if skipped > 0 {
            println!(
                "├─ ⚠️  Skipped malformed rows: {} old, {} new",
                outcome.old_stats.rows_skipped, outcome.new_stats.rows_skipped
            );
        }
        let duplicates = outcome.old_stats.duplicate_keys + outcome.new_stats.duplicate_keys;
        if duplicates > 0 {
            println!(
                "├─ ⚠️  Duplicate keys: {} old, {} new",
                outcome.old_stats.duplicate_keys, outcome.new_stats.duplicate_keys
            );
        }
        if !outcome.schema_drift.is_empty() {
            Self::print_schema_drift(&outcome.schema_drift, "│  ");
        }

        Self::print_summary(&outcome.summary, "");

        if sample_rows > 0 && outcome.summary.has_changes() {
            println!("   Sample rows:");
            let mut shown = 0;
            for status in [RowStatus::Deleted, RowStatus::Added, RowStatus::Updated] {
                for diff in outcome.rows_with_status(status).take(sample_rows) {
                    println!("   {} {}", status_marker(status), format_row(diff));
                    shown += 1;
                }
            }
            let remaining = outcome.summary.total_changes().saturating_sub(shown);
            if remaining > 0 {
                println!("   ... and {} more", remaining);
            }
        }
    }

    fn print_schema_drift(drift: &SchemaDrift, prefix: &str) {
        println!("├─ ⚠️  Schema drift");
        if !drift.only_in_old.is_empty() {
            println!("{}├─ Only in old: {}", prefix, drift.only_in_old.join(", "));
        }
        if !drift.only_in_new.is_empty() {
            println!("{}├─ Only in new: {}", prefix, drift.only_in_new.join(", "));
        }
        println!("{}└─ Column order changed: {}", prefix, drift.reordered);
    }

    fn print_summary(summary: &DiffSummary, prefix: &str) {
        println!("{}├─ Deleted: {}", prefix, summary.deleted);
        println!("{}├─ Added: {}", prefix, summary.added);
        println!("{}├─ Updated: {}", prefix, summary.updated);
        println!("{}└─ Unchanged: {}", prefix, summary.unchanged);
    }
}

fn status_marker(status: RowStatus) -> &'static str {
    match status {
        RowStatus::Deleted => "-",
        RowStatus::Added => "+",
        RowStatus::Updated => "~",
        RowStatus::Unchanged => " ",
    }
}

/// One-line rendering of a diff row for terminal samples
fn format_row(diff: &RowDiff) -> String {
    if diff.status != RowStatus::Updated {
        return format!("[{}]", diff.key);
    }

    let changes: Vec<String> = diff
        .changed_columns
        .iter()
        .map(|column| {
            let before = diff
                .old_values
                .as_ref()
                .and_then(|r| r.value(column))
                .unwrap_or("NULL");
            let after = diff
                .new_values
                .as_ref()
                .and_then(|r| r.value(column))
                .unwrap_or("NULL");
            format!("{}: '{}' → '{}'", column, before, after)
        })
        .collect();
    format!("[{}] {}", diff.key, changes.join("; "))
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Write a report atomically: a half-written file never appears at `path`
    pub fn write_to_file<T: serde::Serialize + ?Sized>(data: &T, path: &Path) -> Result<()> {
        let json = Self::format(data)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string());
        let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

        std::fs::write(&tmp_path, json)?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}
