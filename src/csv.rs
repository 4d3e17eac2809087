//! CSV line grammar and file source

use crate::error::{Result, RowdiffError};
use crate::source::{RowSource, SourceRow, SourceSchema};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const BOM: char = '\u{feff}';

/// Split one CSV line into fields.
///
/// Fields are comma separated and may be wrapped in double quotes. Inside
/// quotes a doubled quote is a literal quote and commas are not separators.
/// Any other quote toggles the quoting state. Never fails: an unterminated
/// quote simply runs to the end of the line.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Make header names unique by suffixing repeats (`name`, `name_2`, ...)
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        if !headers.contains(&name) {
            headers.push(name);
            continue;
        }
        let mut n = 2;
        let renamed = loop {
            let candidate = format!("{}_{}", name, n);
            if !headers.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        log::warn!("Duplicate CSV header '{}' renamed to '{}'", name, renamed);
        headers.push(renamed);
    }
    headers
}

fn trim_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

/// Number of lines after the header, for progress totals
fn count_data_lines(path: &Path) -> std::io::Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines = 0u64;
    let mut last = b'\n';
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        lines += buf.iter().filter(|&&b| b == b'\n').count() as u64;
        last = buf[buf.len() - 1];
        let len = buf.len();
        reader.consume(len);
    }
    if last != b'\n' {
        lines += 1;
    }
    Ok(lines.saturating_sub(1))
}

/// A UTF-8 CSV file whose first line is the header
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    column_count: usize,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: None,
            column_count: 0,
        }
    }
}

impl RowSource for CsvSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&mut self) -> Result<SourceSchema> {
        if self.path.is_dir() {
            return Err(RowdiffError::source_unavailable(self.name(), "path is a directory"));
        }
        let file = File::open(&self.path)
            .map_err(|e| RowdiffError::source_unavailable(self.name(), e))?;
        let estimated_rows = count_data_lines(&self.path)
            .map_err(|e| RowdiffError::source_unavailable(self.name(), e))?;

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| RowdiffError::source_unavailable(self.name(), e))?;
        trim_line_ending(&mut buf);

        let header = String::from_utf8(buf).map_err(|_| {
            RowdiffError::source_unavailable(self.name(), "header line is not valid UTF-8")
        })?;
        let header = header.strip_prefix(BOM).unwrap_or(&header);

        let columns = if header.trim().is_empty() {
            Vec::new()
        } else {
            unique_headers(parse_csv_line(header))
        };
        log::debug!("{}: {} columns, ~{} data lines", self.name(), columns.len(), estimated_rows);

        self.column_count = columns.len();
        self.reader = Some(reader);

        Ok(SourceSchema {
            columns,
            primary_key: Vec::new(),
            estimated_rows: Some(estimated_rows),
        })
    }

    fn stream_rows(&mut self, visit: &mut dyn FnMut(SourceRow) -> Result<()>) -> Result<()> {
        let mut reader = self.reader.take().ok_or_else(|| {
            RowdiffError::invalid_input(format!("{} was not opened before streaming", self.name()))
        })?;
        if self.column_count == 0 {
            return Ok(());
        }

        let mut buf = Vec::new();
        let mut line_no = 1u64;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;
            trim_line_ending(&mut buf);

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(_) => {
                    visit(SourceRow::Malformed {
                        line: line_no,
                        reason: "line is not valid UTF-8".to_string(),
                    })?;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let fields = parse_csv_line(line);
            if fields.len() != self.column_count {
                visit(SourceRow::Malformed {
                    line: line_no,
                    reason: format!(
                        "expected {} fields, found {}",
                        self.column_count,
                        fields.len()
                    ),
                })?;
                continue;
            }
            visit(SourceRow::Values(fields.into_iter().map(Some).collect()))?;
        }
        Ok(())
    }
}
