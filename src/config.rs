//! Per-job comparison options

use crate::error::{Result, RowdiffError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options accepted by the loader and the diff engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Records accumulated before merging into the snapshot (must be > 0)
    pub batch_size: usize,
    /// Treat empty strings as absent values, as SQL NULL is
    pub empty_as_null: bool,
    /// Materialize unchanged rows in the output, not just count them
    pub emit_unchanged: bool,
    /// Key columns overriding schema introspection; empty means introspect
    pub key_columns: Vec<String>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            batch_size: crate::DEFAULT_BATCH_SIZE,
            empty_as_null: true,
            emit_unchanged: false,
            key_columns: Vec::new(),
        }
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub batch_size: Option<usize>,
    pub keep_empty_strings: bool,
    pub emit_unchanged: bool,
    pub key_columns: Vec<String>,
}

impl CompareOptions {
    /// Load options from a JSON file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RowdiffError::config(format!("Cannot read options file {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_str(&content).map_err(|e| {
            RowdiffError::config(format!("Invalid options file {}: {}", path.display(), e))
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_key_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.key_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_emit_unchanged(mut self, emit: bool) -> Self {
        self.emit_unchanged = emit;
        self
    }

    pub fn with_empty_as_null(mut self, empty_as_null: bool) -> Self {
        self.empty_as_null = empty_as_null;
        self
    }

    /// Command-line values win over file values
    pub fn apply_overrides(&mut self, overrides: &OptionOverrides) {
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
        if overrides.keep_empty_strings {
            self.empty_as_null = false;
        }
        if overrides.emit_unchanged {
            self.emit_unchanged = true;
        }
        if !overrides.key_columns.is_empty() {
            self.key_columns = overrides.key_columns.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RowdiffError::config("batch_size must be greater than 0"));
        }
        if self.key_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(RowdiffError::config("key column names must not be empty"));
        }
        Ok(())
    }
}
