//! Seed-file loaders.

use std::path::Path;

use tracing::{info, warn};

use dbbuilder_shared::{DbBuilderError, Result, TargetKey};

use crate::delimited::{DEFAULT_DELIMITER, parse_records};

/// Read every record of a headerless delimited file.
pub fn read_records(path: &Path) -> Result<Vec<Vec<String>>> {
    if !path.is_file() {
        return Err(DbBuilderError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|e| DbBuilderError::io(path, e))?;
    parse_records(&text, DEFAULT_DELIMITER)
}

/// Load targets: each row's cells joined with a space form `"<code> <label>"`.
///
/// Rows that do not look like a target (a header, a stray note) are skipped
/// with a warning.
pub fn load_targets(path: &Path) -> Result<Vec<TargetKey>> {
    let mut targets = Vec::new();

    for (line, row) in read_records(path)?.into_iter().enumerate() {
        let projection = row.join(" ");
        if projection.trim().is_empty() {
            continue;
        }
        match TargetKey::parse(&projection) {
            Ok(key) => targets.push(key),
            Err(e) => warn!(line = line + 1, error = %e, "skipping row"),
        }
    }

    info!(path = %path.display(), count = targets.len(), "targets loaded");
    Ok(targets)
}

/// Load names from the first column, trimmed, skipping empty cells.
pub fn load_names(path: &Path) -> Result<Vec<String>> {
    let names: Vec<String> = read_records(path)?
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    info!(path = %path.display(), count = names.len(), "names loaded");
    Ok(names)
}

/// File name for a target's table: `"<code> <label>.csv"` with path
/// separators replaced.
pub fn table_file_name(key: &TargetKey) -> String {
    let stem: String = key
        .to_string()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c => c,
        })
        .collect();
    format!("{stem}.csv")
}
