//! Command-line interface for rowdiff

use crate::config::OptionOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rowdiff")]
#[command(about = "A key-aware row-level diff tool for database tables and CSV files")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Log filter for the chosen verbosity
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare two CSV files
    Csv {
        /// Old (base) CSV file
        base: PathBuf,

        /// New (compare) CSV file
        compare: PathBuf,

        /// Entity name used in the report (defaults to the base file stem)
        #[arg(long)]
        table: Option<String>,

        #[command(flatten)]
        common: CompareArgs,
    },

    /// Compare every CSV file present in both directories
    Dir {
        /// Directory holding the old (base) files
        base_dir: PathBuf,

        /// Directory holding the new (compare) files
        compare_dir: PathBuf,

        /// File names to skip (case-insensitive, repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        #[command(flatten)]
        common: CompareArgs,
    },

    /// Compare tables across two DuckDB database files
    Db {
        /// Old (base) database file
        old: PathBuf,

        /// New (compare) database file
        new: PathBuf,

        /// Schema holding the tables
        #[arg(long, default_value = "main")]
        schema: String,

        /// Tables to compare (comma-separated); defaults to every table in the old database
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        #[command(flatten)]
        common: CompareArgs,
    },
}

/// Arguments shared by every comparison command
#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Key columns (comma-separated), overriding primary-key introspection
    #[arg(short, long, value_delimiter = ',')]
    pub key: Vec<String>,

    /// Batch size for loading rows (must be > 0)
    #[arg(long, value_parser = validate_batch_size)]
    pub batch_size: Option<usize>,

    /// Keep empty strings distinct from NULL
    #[arg(long)]
    pub keep_empty: bool,

    /// Include unchanged rows in the report
    #[arg(long)]
    pub emit_unchanged: bool,

    /// JSON file with comparison options
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: "pretty", "json"
    #[arg(long, default_value = "pretty")]
    pub format: String,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Sample rows printed per status in pretty output
    #[arg(long, default_value = "5")]
    pub sample: usize,
}

impl CompareArgs {
    pub fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            batch_size: self.batch_size,
            keep_empty_strings: self.keep_empty,
            emit_unchanged: self.emit_unchanged,
            key_columns: self.key.iter().map(|k| k.trim().to_string()).collect(),
        }
    }
}

impl Commands {
    pub fn common(&self) -> &CompareArgs {
        match self {
            Commands::Csv { common, .. } | Commands::Dir { common, .. } | Commands::Db { common, .. } => common,
        }
    }
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Validate that batch size is greater than 0
fn validate_batch_size(s: &str) -> Result<usize, String> {
    let batch_size: usize = s
        .parse()
        .map_err(|_| format!("Invalid batch size: '{}'. Must be a positive integer.", s))?;

    if batch_size == 0 {
        return Err("Batch size must be greater than 0".to_string());
    }

    Ok(batch_size)
}
