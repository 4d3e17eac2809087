//! Command implementations for rowdiff CLI

use crate::cli::{CompareArgs, Commands, OutputFormat};
use crate::config::CompareOptions;
use crate::database::DuckDbSource;
use crate::discovery::discover_csv_pairs;
use crate::error::{Result, RowdiffError};
use crate::job::{run_jobs, ComparisonJob};
use crate::output::{DiffReport, JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use std::path::Path;

/// Execute a command
pub fn execute_command(command: Commands) -> Result<()> {
    let common = command.common().clone();
    let format = OutputFormat::parse(&common.format).map_err(RowdiffError::invalid_input)?;
    let options = resolve_options(&common)?;

    let reporter = if common.no_progress || format == OutputFormat::Json {
        ProgressReporter::new_minimal()
    } else {
        ProgressReporter::new_for_run()
    };

    let jobs = match command {
        Commands::Csv {
            base,
            compare,
            table,
            ..
        } => vec![csv_job(&base, &compare, table, &options)],
        Commands::Dir {
            base_dir,
            compare_dir,
            exclude,
            ..
        } => dir_jobs(&base_dir, &compare_dir, &exclude, &options)?,
        Commands::Db {
            old,
            new,
            schema,
            tables,
            ..
        } => db_jobs(&old, &new, &schema, tables, &options)?,
    };

    if jobs.is_empty() {
        return Err(RowdiffError::invalid_input("Nothing to compare"));
    }

    let jobs: Vec<ComparisonJob> = jobs
        .into_iter()
        .map(|job| {
            let (old, new) = reporter.side_sinks(job.entity());
            job.with_side_progress(old, new)
        })
        .collect();

    let report = DiffReport::new(options, run_jobs(jobs));
    drop(reporter);

    if report.has_failures() {
        for failure in &report.failures {
            eprintln!("❌ {}: {}", failure.entity, failure.error);
        }
        return Err(RowdiffError::Generic(anyhow::anyhow!(
            "{} of {} comparisons failed; no report written",
            report.failures.len(),
            report.failures.len() + report.outcomes.len()
        )));
    }

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_report(&report, common.sample),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&report)?),
    }

    if let Some(path) = &common.output {
        JsonFormatter::write_to_file(&report, path)?;
        if format == OutputFormat::Pretty {
            println!("✅ Report written to {}", path.display());
        }
    }

    Ok(())
}

/// Options file first, then explicit flags on top
fn resolve_options(common: &CompareArgs) -> Result<CompareOptions> {
    let mut options = match &common.options {
        Some(path) => CompareOptions::from_file(path)?,
        None => CompareOptions::default(),
    };
    options.apply_overrides(&common.overrides());
    options.validate()?;
    log::debug!("Comparison options: {:?}", options);
    Ok(options)
}

fn csv_job(base: &Path, compare: &Path, table: Option<String>, options: &CompareOptions) -> ComparisonJob {
    let entity = table.unwrap_or_else(|| {
        base.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| base.display().to_string())
    });
    ComparisonJob::csv(entity, base, compare, options.clone())
}

fn dir_jobs(base_dir: &Path, compare_dir: &Path, exclude: &[String], options: &CompareOptions) -> Result<Vec<ComparisonJob>> {
    let pairs = discover_csv_pairs(base_dir, compare_dir, exclude)?;
    log::info!("Found {} CSV pairs", pairs.len());
    Ok(pairs
        .into_iter()
        .map(|pair| ComparisonJob::csv(pair.name, &pair.base, &pair.compare, options.clone()))
        .collect())
}

fn db_jobs(old: &Path, new: &Path, schema: &str, tables: Vec<String>, options: &CompareOptions) -> Result<Vec<ComparisonJob>> {
    let tables = if tables.is_empty() {
        DuckDbSource::list_tables(old, schema)?
    } else {
        tables.into_iter().map(|t| t.trim().to_string()).collect()
    };
    log::info!("Comparing {} tables in schema {}", tables.len(), schema);
    Ok(tables
        .iter()
        .map(|table| ComparisonJob::duckdb(old, new, schema, table, options.clone()))
        .collect())
}
