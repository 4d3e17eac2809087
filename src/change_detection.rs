//! Row-level change detection between two snapshots

use crate::config::CompareOptions;
use crate::progress::{self, ProgressSink};
use crate::record::{Key, KeyMode, Record};
use crate::snapshot::{Snapshot, SnapshotEntry, SnapshotStats};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Classification of one key across the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// Present in old only
    Deleted,
    /// Present in new only
    Added,
    /// Present in both with different fingerprints
    Updated,
    /// Present in both with equal fingerprints
    Unchanged,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowStatus::Deleted => "deleted",
            RowStatus::Added => "added",
            RowStatus::Updated => "updated",
            RowStatus::Unchanged => "unchanged",
        };
        f.write_str(name)
    }
}

/// One classified row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDiff {
    pub entity: String,
    pub status: RowStatus,
    pub key: Key,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_values: Option<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_values: Option<Record>,
    /// Value columns whose text differs; only filled for updated rows
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_columns: Vec<String>,
}

/// Per-status counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub deleted: u64,
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
}

impl DiffSummary {
    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    pub fn total_changes(&self) -> u64 {
        self.deleted + self.added + self.updated
    }

    pub fn total_keys(&self) -> u64 {
        self.total_changes() + self.unchanged
    }

    fn count(&mut self, status: RowStatus) {
        match status {
            RowStatus::Deleted => self.deleted += 1,
            RowStatus::Added => self.added += 1,
            RowStatus::Updated => self.updated += 1,
            RowStatus::Unchanged => self.unchanged += 1,
        }
    }

    pub fn merge(&mut self, other: &DiffSummary) {
        self.deleted += other.deleted;
        self.added += other.added;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
    }
}

/// Column-set differences between the two sides.
///
/// Each side fingerprints its own columns, so any drift here can make rows
/// look updated (or, for dropped columns, unchanged) for schema reasons alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDrift {
    pub only_in_old: Vec<String>,
    pub only_in_new: Vec<String>,
    /// Same shared columns, different relative order
    pub reordered: bool,
}

impl SchemaDrift {
    pub fn between(old: &[String], new: &[String]) -> Self {
        let only_in_old: Vec<String> = old.iter().filter(|c| !new.contains(c)).cloned().collect();
        let only_in_new: Vec<String> = new.iter().filter(|c| !old.contains(c)).cloned().collect();

        let shared_old = old.iter().filter(|c| new.contains(c));
        let shared_new = new.iter().filter(|c| old.contains(c));
        let reordered = !shared_old.eq(shared_new);

        Self {
            only_in_old,
            only_in_new,
            reordered,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.only_in_old.is_empty() && self.only_in_new.is_empty() && !self.reordered
    }
}

/// Everything known about one entity's comparison
#[derive(Debug, Clone, Serialize)]
pub struct DiffOutcome {
    pub entity: String,
    pub key_mode: KeyMode,
    pub key_columns: Vec<String>,
    pub summary: DiffSummary,
    #[serde(skip_serializing_if = "SchemaDrift::is_empty")]
    pub schema_drift: SchemaDrift,
    pub old_stats: SnapshotStats,
    pub new_stats: SnapshotStats,
    pub diffs: Vec<RowDiff>,
}

impl DiffOutcome {
    pub fn rows_with_status(&self, status: RowStatus) -> impl Iterator<Item = &RowDiff> {
        self.diffs.iter().filter(move |d| d.status == status)
    }
}

/// Set difference over two snapshots with a fingerprint short-circuit.
///
/// Runs in O(|old| + |new|). Output order is fixed for a given pair of
/// snapshots: deleted rows in old order first, then added, updated and
/// unchanged rows interleaved in new order.
pub struct ChangeDetector {
    emit_unchanged: bool,
    progress: Arc<dyn ProgressSink>,
}

impl ChangeDetector {
    pub fn new(emit_unchanged: bool) -> Self {
        Self {
            emit_unchanged,
            progress: progress::noop(),
        }
    }

    pub fn from_options(options: &CompareOptions) -> Self {
        Self::new(options.emit_unchanged)
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Classify every key of `old` ∪ `new`. Both snapshots are consumed.
    pub fn detect(&self, entity: &str, old: Snapshot, new: Snapshot) -> DiffOutcome {
        let schema_drift = SchemaDrift::between(old.columns(), new.columns());
        if !schema_drift.is_empty() {
            log::warn!(
                "[{}] column sets differ (only in old: {:?}, only in new: {:?}, reordered: {}); updated rows may reflect schema drift",
                entity,
                schema_drift.only_in_old,
                schema_drift.only_in_new,
                schema_drift.reordered
            );
        }
        if old.key_mode() != new.key_mode() || !same_key_columns(old.key_columns(), new.key_columns()) {
            log::warn!(
                "[{}] sides are keyed differently ({:?} {:?} vs {:?} {:?}); keys will not line up",
                entity,
                old.key_mode(),
                old.key_columns(),
                new.key_mode(),
                new.key_columns()
            );
        }

        let key_mode = old.key_mode();
        let key_columns = old.key_columns().to_vec();
        let old_stats = old.stats().clone();
        let new_stats = new.stats().clone();

        let old_entries = old.into_entries();
        let new_entries = new.into_entries();

        let mut summary = DiffSummary::default();
        let mut diffs = Vec::new();
        let mut matched: HashMap<Key, SnapshotEntry> = HashMap::new();

        for (key, entry) in old_entries {
            if new_entries.contains_key(&key) {
                matched.insert(key, entry);
            } else {
                summary.count(RowStatus::Deleted);
                diffs.push(RowDiff {
                    entity: entity.to_string(),
                    status: RowStatus::Deleted,
                    key,
                    old_values: Some(entry.values),
                    new_values: None,
                    changed_columns: Vec::new(),
                });
            }
        }

        for (key, entry) in new_entries {
            let diff = match matched.remove(&key) {
                None => Some(RowDiff {
                    entity: entity.to_string(),
                    status: RowStatus::Added,
                    key,
                    old_values: None,
                    new_values: Some(entry.values),
                    changed_columns: Vec::new(),
                }),
                Some(old_entry) if old_entry.fingerprint != entry.fingerprint => {
                    let changed_columns = changed_columns(&old_entry.values, &entry.values);
                    Some(RowDiff {
                        entity: entity.to_string(),
                        status: RowStatus::Updated,
                        key,
                        old_values: Some(old_entry.values),
                        new_values: Some(entry.values),
                        changed_columns,
                    })
                }
                Some(old_entry) => {
                    summary.count(RowStatus::Unchanged);
                    self.emit_unchanged.then(|| RowDiff {
                        entity: entity.to_string(),
                        status: RowStatus::Unchanged,
                        key,
                        old_values: Some(old_entry.values),
                        new_values: Some(entry.values),
                        changed_columns: Vec::new(),
                    })
                }
            };
            if let Some(diff) = diff {
                if diff.status != RowStatus::Unchanged {
                    summary.count(diff.status);
                }
                diffs.push(diff);
            }
        }

        let changes = summary.total_changes();
        self.progress.report(
            changes,
            changes,
            &format!(
                "[{}] complete: deleted={}, added={}, updated={}, unchanged={}",
                entity, summary.deleted, summary.added, summary.updated, summary.unchanged
            ),
        );

        DiffOutcome {
            entity: entity.to_string(),
            key_mode,
            key_columns,
            summary,
            schema_drift,
            old_stats,
            new_stats,
            diffs,
        }
    }
}

/// Keys sort their parts by column name, so only the set of columns matters
fn same_key_columns(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Columns whose value differs, old column order first, then new-only columns
fn changed_columns(old: &Record, new: &Record) -> Vec<String> {
    let mut changed: Vec<String> = old
        .columns()
        .filter(|c| old.get(c) != new.get(c))
        .map(str::to_string)
        .collect();
    changed.extend(
        new.columns()
            .filter(|c| !old.contains_column(c))
            .map(str::to_string),
    );
    changed
}
