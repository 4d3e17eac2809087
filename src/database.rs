//! Database table source backed by DuckDB

use crate::error::{Result, RowdiffError};
use crate::source::{RowSource, SourceRow, SourceSchema};
use duckdb::{params, AccessMode, Config, Connection};
use std::path::{Path, PathBuf};

/// Default schema of a DuckDB database
pub const DEFAULT_SCHEMA: &str = "main";

/// Quote an identifier for interpolation into SQL
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Open a database file without write access
fn connect_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(RowdiffError::source_unavailable(
            path.display().to_string(),
            "database file not found",
        ));
    }
    let config = Config::default()
        .access_mode(AccessMode::ReadOnly)
        .map_err(|e| RowdiffError::source_unavailable(path.display().to_string(), e))?;
    Connection::open_with_flags(path, config)
        .map_err(|e| RowdiffError::source_unavailable(path.display().to_string(), e))
}

/// Ordered primary-key columns of a table; empty when it has none
pub fn primary_key_columns(conn: &Connection, schema: &str, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT unnest(constraint_column_names)
         FROM duckdb_constraints()
         WHERE schema_name = ? AND table_name = ? AND constraint_type = 'PRIMARY KEY'",
    )?;
    let rows = stmt.query_map(params![schema, table], |row| row.get::<_, String>(0))?;
    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

/// All columns of a table in ordinal order
pub fn table_columns(conn: &Connection, schema: &str, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT column_name
         FROM information_schema.columns
         WHERE table_schema = ? AND table_name = ?
         ORDER BY ordinal_position",
    )?;
    let rows = stmt.query_map(params![schema, table], |row| row.get::<_, String>(0))?;
    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

/// One table in a DuckDB database file
pub struct DuckDbSource {
    path: PathBuf,
    schema: String,
    table: String,
    connection: Option<Connection>,
    columns: Vec<String>,
}

impl DuckDbSource {
    pub fn new(path: impl Into<PathBuf>, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            schema: schema.into(),
            table: table.into(),
            connection: None,
            columns: Vec::new(),
        }
    }

    /// `schema.table`, the entity name used in reports
    pub fn entity_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Base tables of a schema, sorted by name
    pub fn list_tables(path: &Path, schema: &str) -> Result<Vec<String>> {
        let conn = connect_read_only(path)?;
        let mut stmt = conn.prepare(
            "SELECT table_name
             FROM information_schema.tables
             WHERE table_schema = ? AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )?;
        let rows = stmt.query_map(params![schema], |row| row.get::<_, String>(0))?;
        let mut tables = Vec::new();
        for row in rows {
            tables.push(row?);
        }
        Ok(tables)
    }

    fn qualified_table(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl RowSource for DuckDbSource {
    fn name(&self) -> String {
        format!("{}:{}", self.path.display(), self.entity_name())
    }

    fn open(&mut self) -> Result<SourceSchema> {
        let conn = connect_read_only(&self.path)?;

        let columns = table_columns(&conn, &self.schema, &self.table)
            .map_err(|e| RowdiffError::source_unavailable(self.name(), e))?;
        if columns.is_empty() {
            return Err(RowdiffError::source_unavailable(self.name(), "table not found"));
        }
        let primary_key = primary_key_columns(&conn, &self.schema, &self.table)
            .map_err(|e| RowdiffError::source_unavailable(self.name(), e))?;

        let count_sql = format!("SELECT COUNT(*) FROM {}", self.qualified_table());
        let row_count: i64 = conn
            .query_row(&count_sql, [], |row| row.get(0))
            .map_err(|e| RowdiffError::source_unavailable(self.name(), e))?;

        log::debug!(
            "{}: {} columns, primary key {:?}, {} rows",
            self.name(),
            columns.len(),
            primary_key,
            row_count
        );

        self.columns = columns.clone();
        self.connection = Some(conn);

        Ok(SourceSchema {
            columns,
            primary_key,
            estimated_rows: Some(row_count.max(0) as u64),
        })
    }

    fn stream_rows(&mut self, visit: &mut dyn FnMut(SourceRow) -> Result<()>) -> Result<()> {
        let conn = self.connection.as_ref().ok_or_else(|| {
            RowdiffError::invalid_input(format!("{} was not opened before streaming", self.name()))
        })?;

        // Values are compared as text, so the database renders them
        let select_list = self
            .columns
            .iter()
            .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", select_list, self.qualified_table());

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let column_count = self.columns.len();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(row.get::<_, Option<String>>(i)?);
            }
            visit(SourceRow::Values(values))?;
        }
        Ok(())
    }
}
