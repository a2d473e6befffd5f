//! Creates new timestamped migration file pairs.
//!
//! `create` never touches the database: the duplicate check runs against
//! the directory scan only.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use drift_core::{DriftError, DriftResult};

use crate::catalog::scan_directory;

/// Lowercases the description and keeps only word characters; any run of
/// other characters collapses to a single underscore, and underscores are
/// trimmed from both ends. Returns the empty string when nothing survives.
pub fn sanitize_description(raw: &str) -> String {
    let mut sanitized = String::new();
    let mut pending_separator = false;

    for ch in raw.to_lowercase().chars() {
        if ch.is_alphanumeric() || ch == '_' {
            if pending_separator && !sanitized.is_empty() {
                sanitized.push('_');
            }
            pending_separator = false;
            sanitized.push(ch);
        } else {
            pending_separator = true;
        }
    }

    sanitized.trim_matches('_').to_string()
}

/// Creates the empty `.up.sql` / `.down.sql` pair for `raw_description`,
/// stamped with the current local time. Returns the two paths.
pub fn create(path: &Path, raw_description: &str) -> DriftResult<(PathBuf, PathBuf)> {
    let version = Local::now().format("%Y%m%d_%H%M%S").to_string();
    create_with_version(path, raw_description, &version)
}

/// `create` with an explicit version stamp; tests pin the clock here
pub fn create_with_version(
    path: &Path,
    raw_description: &str,
    version: &str,
) -> DriftResult<(PathBuf, PathBuf)> {
    if raw_description.trim().is_empty() {
        return Err(DriftError::InvalidName(
            "create - a description is required".to_string(),
        ));
    }

    let description = sanitize_description(raw_description);
    if description.is_empty() {
        return Err(DriftError::InvalidName(
            "create - migration name only contains invalid characters".to_string(),
        ));
    }

    // scan_directory creates the directory when it is missing
    let existing = scan_directory(path)?;
    if existing.contains_key(version) {
        return Err(DriftError::Catalog(format!(
            "create - migration files with prefix {:?} already exist",
            version
        )));
    }

    let stem = format!("{}_{}", version, description);

    let up_path = path.join(format!("{}.up.sql", stem));
    println!("creating {}", up_path.display());
    fs::File::create(&up_path).map_err(|e| {
        DriftError::Catalog(format!("create - writing {} - {}", up_path.display(), e))
    })?;

    let down_path = path.join(format!("{}.down.sql", stem));
    println!("creating {}", down_path.display());
    fs::File::create(&down_path).map_err(|e| {
        DriftError::Catalog(format!("create - writing {} - {}", down_path.display(), e))
    })?;

    tracing::info!("create - created migration pair {}", stem);
    Ok((up_path, down_path))
}
