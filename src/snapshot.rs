//! Snapshot loading
//!
//! A snapshot is the complete key → (values, fingerprint) map of one side of
//! a comparison. It is built once by streaming its source to completion in
//! bounded batches and is immutable afterwards.

use crate::cancel::CancellationToken;
use crate::config::CompareOptions;
use crate::error::{Result, RowdiffError};
use crate::hash::{Fingerprint, FingerprintComputer};
use crate::progress::{self, ProgressSink};
use crate::record::{CellValue, Key, KeyLayout, KeyMode, Record};
use crate::source::{RowSource, SourceRow, SourceSchema};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// Value columns of one row plus their fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub values: Record,
    pub fingerprint: Fingerprint,
}

/// Counters gathered while loading one side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    /// Well-formed records streamed from the source
    pub rows_read: u64,
    /// Malformed records that were skipped
    pub rows_skipped: u64,
    /// Records whose key was already present (later record won)
    pub duplicate_keys: u64,
    pub batches: u64,
}

/// Completed, immutable view of one side.
///
/// Entries keep the order in which keys were first seen. When a key repeats,
/// the later record replaces the earlier one's values in place.
#[derive(Debug, Clone)]
pub struct Snapshot {
    label: String,
    columns: Vec<String>,
    key_mode: KeyMode,
    key_columns: Vec<String>,
    entries: IndexMap<Key, SnapshotEntry>,
    stats: SnapshotStats,
}

impl Snapshot {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The side's full column list in its own order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn get(&self, key: &Key) -> Option<&SnapshotEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &SnapshotEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }

    pub(crate) fn into_entries(self) -> IndexMap<Key, SnapshotEntry> {
        self.entries
    }
}

/// Streams one source into a `Snapshot`
pub struct SnapshotLoader {
    label: String,
    options: CompareOptions,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
    computer: FingerprintComputer,
}

impl SnapshotLoader {
    pub fn new(label: impl Into<String>, options: CompareOptions) -> Self {
        Self {
            label: label.into(),
            options,
            progress: progress::noop(),
            cancel: CancellationToken::new(),
            computer: FingerprintComputer::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Load a snapshot, taking key columns from the options or, failing that,
    /// from the source's own primary key.
    pub fn load(&self, source: &mut dyn RowSource) -> Result<Snapshot> {
        self.options.validate()?;
        if self.cancel.is_cancelled() {
            return Err(RowdiffError::Cancelled);
        }

        let schema = source.open()?;
        let declared = declared_key_columns(&self.options, &schema);
        self.load_opened(source, schema, &declared)
    }

    /// Stream a source that was already opened, keyed by `declared`.
    ///
    /// Used when both sides of a comparison must share one key list.
    pub fn load_opened(&self, source: &mut dyn RowSource, schema: SourceSchema, declared: &[String]) -> Result<Snapshot> {
        self.options.validate()?;
        if self.cancel.is_cancelled() {
            return Err(RowdiffError::Cancelled);
        }

        let layout = self.resolve_layout(&source.name(), &schema.columns, declared);
        let total = schema.estimated_rows.unwrap_or(0);
        log::debug!(
            "[{}] loading {} ({} columns, key: {:?})",
            self.label,
            source.name(),
            schema.columns.len(),
            layout.key_columns().collect::<Vec<_>>()
        );

        let batch_size = self.options.batch_size;
        let mut entries: IndexMap<Key, SnapshotEntry> = IndexMap::new();
        let mut batch: Vec<(Key, SnapshotEntry)> = Vec::with_capacity(batch_size.min(65_536));
        let mut stats = SnapshotStats::default();

        source.stream_rows(&mut |row| {
            match row {
                SourceRow::Values(values) if values.len() == layout.columns().len() => {
                    let entry = self.build_entry(&layout, values);
                    batch.push(entry);
                    stats.rows_read += 1;
                }
                SourceRow::Values(values) => {
                    let line = stats.rows_read + stats.rows_skipped + 1;
                    let reason = format!(
                        "expected {} values, found {}",
                        layout.columns().len(),
                        values.len()
                    );
                    self.skip(&mut stats, line, &reason, total);
                }
                SourceRow::Malformed { line, reason } => {
                    self.skip(&mut stats, line, &reason, total);
                }
            }

            if batch.len() >= batch_size {
                merge_batch(&mut batch, &mut entries, &mut stats);
                self.report_batch(&stats, total);
                if self.cancel.is_cancelled() {
                    return Err(RowdiffError::Cancelled);
                }
            }
            Ok(())
        })?;

        if !batch.is_empty() {
            merge_batch(&mut batch, &mut entries, &mut stats);
            if self.cancel.is_cancelled() {
                return Err(RowdiffError::Cancelled);
            }
        }

        let processed = stats.rows_read + stats.rows_skipped;
        self.progress.report(
            processed,
            processed.max(total),
            &format!(
                "[{}] loaded {} rows ({} keys, {} skipped, {} duplicate keys)",
                self.label,
                stats.rows_read,
                entries.len(),
                stats.rows_skipped,
                stats.duplicate_keys
            ),
        );
        if stats.rows_skipped > 0 {
            log::warn!("[{}] skipped {} malformed records in {}", self.label, stats.rows_skipped, source.name());
        }
        if stats.duplicate_keys > 0 {
            log::warn!("[{}] {} duplicate keys in {}; the last record won", self.label, stats.duplicate_keys, source.name());
        }

        Ok(Snapshot {
            label: self.label.clone(),
            columns: layout.columns().to_vec(),
            key_mode: layout.mode(),
            key_columns: layout.key_columns().map(str::to_string).collect(),
            entries,
            stats,
        })
    }

    fn resolve_layout(&self, source_name: &str, columns: &[String], declared: &[String]) -> KeyLayout {
        if declared.is_empty() {
            let notice = format!("[{}] no key columns for {}; comparing full rows", self.label, source_name);
            log::info!("{}", notice);
            self.progress.report(0, 0, &notice);
            return KeyLayout::full_row(columns);
        }

        let layout = KeyLayout::resolve(columns, declared);
        if layout.is_full_row() {
            let notice = format!(
                "[{}] key columns {} not found in {}; comparing full rows",
                self.label,
                declared.join(", "),
                source_name
            );
            log::warn!("{}", notice);
            self.progress.report(0, 0, &notice);
        } else {
            let missing = layout.missing_key_columns();
            if !missing.is_empty() {
                log::warn!(
                    "[{}] key columns {} missing from {}; treated as absent",
                    self.label,
                    missing.join(", "),
                    source_name
                );
            }
        }
        layout
    }

    fn build_entry(&self, layout: &KeyLayout, mut values: Vec<CellValue>) -> (Key, SnapshotEntry) {
        if self.options.empty_as_null {
            for value in values.iter_mut() {
                if value.as_deref() == Some("") {
                    *value = None;
                }
            }
        }
        let (key, record) = layout.split(values);
        let fingerprint = self.computer.fingerprint(&record);
        (
            key,
            SnapshotEntry {
                values: record,
                fingerprint,
            },
        )
    }

    fn skip(&self, stats: &mut SnapshotStats, line: u64, reason: &str, total: u64) {
        stats.rows_skipped += 1;
        let error = RowdiffError::malformed_record(line, reason);
        log::debug!("[{}] skipping record: {}", self.label, error);
        self.progress.report(
            stats.rows_read + stats.rows_skipped,
            total,
            &format!("[{}] skipped {}", self.label, error),
        );
    }

    fn report_batch(&self, stats: &SnapshotStats, total: u64) {
        let processed = stats.rows_read + stats.rows_skipped;
        let percentage = if total > 0 { processed * 100 / total } else { 0 };
        self.progress.report(
            processed,
            total,
            &format!(
                "[{}] {}/{} rows processed ({}%)",
                self.label, processed, total, percentage
            ),
        );
    }
}

/// Key columns for a side: the option override, else the source's primary key
pub fn declared_key_columns(options: &CompareOptions, schema: &SourceSchema) -> Vec<String> {
    if options.key_columns.is_empty() {
        schema.primary_key.clone()
    } else {
        options.key_columns.clone()
    }
}

/// Merge a batch into the snapshot map, last write wins
fn merge_batch(
    batch: &mut Vec<(Key, SnapshotEntry)>,
    entries: &mut IndexMap<Key, SnapshotEntry>,
    stats: &mut SnapshotStats,
) {
    for (key, entry) in batch.drain(..) {
        if entries.insert(key, entry).is_some() {
            stats.duplicate_keys += 1;
        }
    }
    stats.batches += 1;
}
