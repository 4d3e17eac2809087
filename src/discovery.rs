//! Pairing of CSV files across a base and a compare directory

use crate::error::{Result, RowdiffError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A CSV file present under both directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPair {
    /// Entity name: relative path without the extension
    pub name: String,
    pub base: PathBuf,
    pub compare: PathBuf,
}

/// Collect `.csv` files under `root`, keyed by lowercased relative path
fn csv_files(root: &Path) -> Result<BTreeMap<String, PathBuf>> {
    if !root.is_dir() {
        return Err(RowdiffError::invalid_input(format!(
            "Directory not found: {}",
            root.display()
        )));
    }

    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        let match_key = relative.to_string_lossy().replace('\\', "/").to_lowercase();
        files.insert(match_key, path.to_path_buf());
    }
    Ok(files)
}

fn is_excluded(path: &Path, exclude: &[String]) -> bool {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    exclude.iter().any(|e| e.eq_ignore_ascii_case(&file_name))
}

/// Pair CSV files that exist under both directories.
///
/// Matching is case-insensitive on the path relative to each root. Files
/// present on one side only are logged and skipped. Pairs come back sorted
/// by name.
pub fn discover_csv_pairs(base_dir: &Path, compare_dir: &Path, exclude: &[String]) -> Result<Vec<CsvPair>> {
    let base_files = csv_files(base_dir)?;
    let mut compare_files = csv_files(compare_dir)?;

    let mut pairs = Vec::new();
    for (match_key, base) in base_files {
        if is_excluded(&base, exclude) {
            log::debug!("Excluded {}", base.display());
            compare_files.remove(&match_key);
            continue;
        }
        match compare_files.remove(&match_key) {
            Some(compare) => {
                let relative = base.strip_prefix(base_dir).unwrap_or(&base);
                let name = relative
                    .with_extension("")
                    .to_string_lossy()
                    .replace('\\', "/");
                pairs.push(CsvPair { name, base, compare });
            }
            None => log::warn!("{} has no counterpart in {}", base.display(), compare_dir.display()),
        }
    }

    for compare in compare_files.values() {
        if !is_excluded(compare, exclude) {
            log::warn!("{} has no counterpart in {}", compare.display(), base_dir.display());
        }
    }

    pairs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(pairs)
}
