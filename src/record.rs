//! Records, canonical keys and key extraction

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A single cell: textual value, or `None` for an absent value (SQL NULL)
pub type CellValue = Option<String>;

/// Ordered mapping from column name to textual value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, CellValue>);

impl Record {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Insert or replace a column value, keeping the original column position
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.0.insert(column.into(), value);
    }

    /// `None` when the column is missing, `Some(None)` when the value is absent
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    /// Textual value of a column, treating missing and absent alike
    pub fn value(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(|v| v.as_deref())
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Immutable row identity.
///
/// Parts are sorted by column name at construction, so equality, hashing and
/// ordering never depend on the order the columns were supplied in. An absent
/// value equals another absent value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    parts: Box<[(String, CellValue)]>,
}

impl Key {
    pub fn new<I, K>(parts: I) -> Self
    where
        I: IntoIterator<Item = (K, CellValue)>,
        K: Into<String>,
    {
        let mut parts: Vec<(String, CellValue)> =
            parts.into_iter().map(|(k, v)| (k.into(), v)).collect();
        parts.sort_by(|a, b| a.0.cmp(&b.0));
        parts.dedup_by(|later, earlier| later.0 == earlier.0);
        Self {
            parts: parts.into_boxed_slice(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.parts
            .binary_search_by(|(name, _)| name.as_str().cmp(column))
            .ok()
            .map(|idx| &self.parts[idx].1)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.parts.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value.as_deref().unwrap_or("NULL"))?;
        }
        Ok(())
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.parts.len()))?;
        for (name, value) in self.parts.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// How a side's rows are identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// Identified by the declared primary-key columns
    Declared,
    /// No usable key columns; the entire row is the identity
    FullRow,
}

/// Column split of one side into key columns and fingerprinted value columns
#[derive(Debug, Clone)]
pub struct KeyLayout {
    mode: KeyMode,
    columns: Vec<String>,
    key_columns: Vec<(String, Option<usize>)>,
    value_indices: Vec<usize>,
}

impl KeyLayout {
    /// Resolve declared key columns against a side's own ordered column list.
    ///
    /// Declared columns missing from the side stay in the key as absent
    /// values. When none of them exist (or none were declared) the layout
    /// falls back to full-row mode.
    pub fn resolve(columns: &[String], declared: &[String]) -> Self {
        let mut key_columns: Vec<(String, Option<usize>)> = Vec::with_capacity(declared.len());
        for name in declared {
            if key_columns.iter().any(|(existing, _)| existing == name) {
                continue;
            }
            let idx = columns.iter().position(|c| c == name);
            key_columns.push((name.clone(), idx));
        }

        if key_columns.iter().all(|(_, idx)| idx.is_none()) {
            return Self::full_row(columns);
        }

        let value_indices = (0..columns.len())
            .filter(|i| !key_columns.iter().any(|(_, idx)| *idx == Some(*i)))
            .collect();

        Self {
            mode: KeyMode::Declared,
            columns: columns.to_vec(),
            key_columns,
            value_indices,
        }
    }

    /// Every column is both key and value
    pub fn full_row(columns: &[String]) -> Self {
        Self {
            mode: KeyMode::FullRow,
            columns: columns.to_vec(),
            key_columns: columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), Some(i)))
                .collect(),
            value_indices: (0..columns.len()).collect(),
        }
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    pub fn is_full_row(&self) -> bool {
        self.mode == KeyMode::FullRow
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &str> {
        self.key_columns.iter().map(|(name, _)| name.as_str())
    }

    /// Declared key columns this side does not have
    pub fn missing_key_columns(&self) -> Vec<&str> {
        self.key_columns
            .iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Fingerprinted columns in schema order
    pub fn value_columns(&self) -> impl Iterator<Item = &str> {
        self.value_indices.iter().map(|&i| self.columns[i].as_str())
    }

    /// Split one row (aligned with `columns()`) into its key and value record
    pub fn split(&self, mut values: Vec<CellValue>) -> (Key, Record) {
        values.resize(self.columns.len(), None);

        let key = Key::new(
            self.key_columns
                .iter()
                .map(|(name, idx)| (name.clone(), idx.and_then(|i| values[i].clone()))),
        );

        let mut record = Record::with_capacity(self.value_indices.len());
        if self.is_full_row() {
            for (column, value) in self.columns.iter().zip(values) {
                record.insert(column.clone(), value);
            }
        } else {
            for &i in &self.value_indices {
                record.insert(self.columns[i].clone(), values[i].take());
            }
        }

        (key, record)
    }
}
