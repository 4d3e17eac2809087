//! # rowdiff
//!
//! A key-aware row-level diff engine. Two snapshots of the same table or CSV
//! file are loaded into key-indexed maps with per-row fingerprints, then
//! classified into deleted, added, updated and unchanged rows.

pub mod cli;
pub mod error;
pub mod record;
pub mod csv;
pub mod database;
pub mod source;
pub mod hash;
pub mod snapshot;
pub mod change_detection;
pub mod progress;
pub mod cancel;
pub mod config;
pub mod job;
pub mod discovery;
pub mod output;
pub mod commands;

pub use cancel::CancellationToken;
pub use change_detection::{ChangeDetector, DiffOutcome, DiffSummary, RowDiff, RowStatus, SchemaDrift};
pub use config::CompareOptions;
pub use error::{Result, RowdiffError};
pub use hash::{Fingerprint, FingerprintComputer};
pub use job::{run_jobs, ComparisonJob, JobOutcome};
pub use progress::ProgressSink;
pub use record::{Key, KeyMode, Record};
pub use snapshot::{Snapshot, SnapshotLoader};
pub use source::{RowSource, SourceRow, SourceSchema};

/// Default batch size for loading rows
pub const DEFAULT_BATCH_SIZE: usize = 10000;
