//! Source collaborator contract

use crate::error::Result;
use crate::record::CellValue;

/// What a source reports about itself once opened
#[derive(Debug, Clone, Default)]
pub struct SourceSchema {
    /// Full column list in the source's own order
    pub columns: Vec<String>,
    /// Introspected primary-key columns; empty when the source has none
    pub primary_key: Vec<String>,
    /// Row count if cheaply known, for progress totals
    pub estimated_rows: Option<u64>,
}

/// One item produced while streaming a source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
    /// Values aligned with `SourceSchema::columns`
    Values(Vec<CellValue>),
    /// A record that could not be reconstructed; the loader skips it
    Malformed { line: u64, reason: String },
}

/// A readable table or file.
///
/// `open` must be called before `stream_rows`. Sources are read-only and each
/// loader owns its source exclusively.
pub trait RowSource: Send {
    /// Human-readable name used in errors and progress messages
    fn name(&self) -> String;

    /// Connect or open the underlying resource and introspect its columns.
    /// Failure here is `SourceUnavailable`.
    fn open(&mut self) -> Result<SourceSchema>;

    /// Stream every row in order, handing each to `visit`. An error returned
    /// by `visit` stops the stream and is propagated unchanged.
    fn stream_rows(&mut self, visit: &mut dyn FnMut(SourceRow) -> Result<()>) -> Result<()>;
}

/// In-memory source, handy for callers that already hold rows
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    schema: SourceSchema,
    rows: Vec<SourceRow>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            schema: SourceSchema {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                primary_key: Vec::new(),
                estimated_rows: Some(0),
            },
            rows: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.schema.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append a row of text values; empty strings stay empty strings
    pub fn push_row(&mut self, values: &[&str]) {
        self.push_values(values.iter().map(|v| Some(v.to_string())).collect());
    }

    pub fn push_values(&mut self, values: Vec<CellValue>) {
        self.rows.push(SourceRow::Values(values));
        self.schema.estimated_rows = Some(self.rows.len() as u64);
    }

    pub fn with_rows(mut self, rows: &[&[&str]]) -> Self {
        for row in rows {
            self.push_row(row);
        }
        self
    }
}

impl RowSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn open(&mut self) -> Result<SourceSchema> {
        Ok(self.schema.clone())
    }

    fn stream_rows(&mut self, visit: &mut dyn FnMut(SourceRow) -> Result<()>) -> Result<()> {
        for row in &self.rows {
            visit(row.clone())?;
        }
        Ok(())
    }
}
