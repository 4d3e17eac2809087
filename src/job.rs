//! Comparison jobs: one entity, two sources

use crate::cancel::CancellationToken;
use crate::change_detection::{ChangeDetector, DiffOutcome};
use crate::config::CompareOptions;
use crate::csv::CsvSource;
use crate::database::DuckDbSource;
use crate::error::{Result, RowdiffError};
use crate::progress::{self, ProgressSink};
use crate::snapshot::{declared_key_columns, SnapshotLoader};
use crate::source::RowSource;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Compares the old and new snapshots of one logical entity
pub struct ComparisonJob {
    entity: String,
    old: Box<dyn RowSource>,
    new: Box<dyn RowSource>,
    options: CompareOptions,
    old_progress: Arc<dyn ProgressSink>,
    new_progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl ComparisonJob {
    pub fn new(
        entity: impl Into<String>,
        old: Box<dyn RowSource>,
        new: Box<dyn RowSource>,
        options: CompareOptions,
    ) -> Self {
        Self {
            entity: entity.into(),
            old,
            new,
            options,
            old_progress: progress::noop(),
            new_progress: progress::noop(),
            cancel: CancellationToken::new(),
        }
    }

    /// Compare two CSV files
    pub fn csv(entity: impl Into<String>, old: &Path, new: &Path, options: CompareOptions) -> Self {
        Self::new(
            entity,
            Box::new(CsvSource::new(old)),
            Box::new(CsvSource::new(new)),
            options,
        )
    }

    /// Compare the same table in two DuckDB database files
    pub fn duckdb(old_db: &Path, new_db: &Path, schema: &str, table: &str, options: CompareOptions) -> Self {
        let old = DuckDbSource::new(old_db, schema, table);
        let entity = old.entity_name();
        Self::new(
            entity,
            Box::new(old),
            Box::new(DuckDbSource::new(new_db, schema, table)),
            options,
        )
    }

    /// One sink for both sides and the final summary
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.old_progress = progress.clone();
        self.new_progress = progress;
        self
    }

    /// Separate sinks per side; the new side also gets the final summary
    pub fn with_side_progress(mut self, old: Arc<dyn ProgressSink>, new: Arc<dyn ProgressSink>) -> Self {
        self.old_progress = old;
        self.new_progress = new;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Load both sides to completion, then diff them.
    ///
    /// Key columns are resolved once for the job: the option override, else
    /// the old side's primary key. Both sides are keyed by that list. The two
    /// loads then run concurrently; either failing fails the job and no
    /// partial outcome is returned.
    pub fn run(mut self) -> Result<DiffOutcome> {
        self.options.validate()?;
        if self.cancel.is_cancelled() {
            return Err(RowdiffError::Cancelled);
        }
        log::info!("Comparing {}", self.entity);

        let old_schema = self.old.open()?;
        let new_schema = self.new.open()?;
        let declared = declared_key_columns(&self.options, &old_schema);
        if self.options.key_columns.is_empty() && old_schema.primary_key != new_schema.primary_key {
            log::warn!(
                "{}: primary keys differ ({:?} vs {:?}); keying both sides by {:?}",
                self.entity,
                old_schema.primary_key,
                new_schema.primary_key,
                declared
            );
        }

        let old_loader = SnapshotLoader::new(format!("{} old", self.entity), self.options.clone())
            .with_progress(self.old_progress.clone())
            .with_cancellation(self.cancel.clone());
        let new_loader = SnapshotLoader::new(format!("{} new", self.entity), self.options.clone())
            .with_progress(self.new_progress.clone())
            .with_cancellation(self.cancel.clone());

        let old_source = self.old.as_mut();
        let new_source = self.new.as_mut();
        let (old, new) = rayon::join(
            || old_loader.load_opened(old_source, old_schema, &declared),
            || new_loader.load_opened(new_source, new_schema, &declared),
        );
        let (old, new) = (old?, new?);

        let outcome = ChangeDetector::from_options(&self.options)
            .with_progress(self.new_progress.clone())
            .detect(&self.entity, old, new);

        log::info!(
            "{}: deleted={}, added={}, updated={}, unchanged={}",
            outcome.entity,
            outcome.summary.deleted,
            outcome.summary.added,
            outcome.summary.updated,
            outcome.summary.unchanged
        );
        Ok(outcome)
    }
}

/// Result of one job in a multi-entity run
#[derive(Debug)]
pub struct JobOutcome {
    pub entity: String,
    pub result: Result<DiffOutcome>,
}

/// Run independent jobs concurrently; results keep the input order
pub fn run_jobs(jobs: Vec<ComparisonJob>) -> Vec<JobOutcome> {
    jobs.into_par_iter()
        .map(|job| {
            let entity = job.entity.clone();
            let result = job.run();
            if let Err(e) = &result {
                log::error!("{} failed: {}", entity, e);
            }
            JobOutcome { entity, result }
        })
        .collect()
}
