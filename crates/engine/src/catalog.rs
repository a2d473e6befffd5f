//! Migration catalog: filesystem discovery merged with the applied set.
//!
//! A catalog snapshot is a value. It is computed once per command from a
//! directory listing plus the tracking table's rows and never mutated
//! afterwards; the planner operates on exactly one snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use drift_core::{DriftError, DriftResult};

use crate::version::{Direction, MigrationVersion};

static MIGRATION_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{8}_\d{6})_(\w+)\.(down|up)\.sql$").expect("invalid migration filename regex")
});

/// Parses a migration filename into (version, description, direction).
/// Returns `None` for anything that does not match the grammar.
pub fn parse_filename(name: &str) -> Option<(String, String, Direction)> {
    let caps = MIGRATION_FILE_RE.captures(name)?;
    let direction = match &caps[3] {
        "up" => Direction::Up,
        _ => Direction::Down,
    };
    Some((caps[1].to_string(), caps[2].to_string(), direction))
}

/// Reads the migration directory into a version-keyed map.
///
/// Non-matching filenames are logged and skipped; a second file for the
/// same (version, direction) is a fatal catalog error. A missing directory
/// is created and scans empty.
pub fn scan_directory(path: &Path) -> DriftResult<BTreeMap<String, MigrationVersion>> {
    let mut catalog = BTreeMap::new();

    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            DriftError::Catalog(format!(
                "catalog - creating migration directory {} - {}",
                path.display(),
                e
            ))
        })?;
    }

    let entries = fs::read_dir(path).map_err(|e| {
        DriftError::Catalog(format!(
            "catalog - reading migration directory {} - {}",
            path.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            DriftError::Catalog(format!("catalog - reading directory entry - {}", e))
        })?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::info!("catalog - skipping non-utf8 filename {:?}", file_name);
            continue;
        };

        let Some((version, description, direction)) = parse_filename(name) else {
            tracing::info!("catalog - unable to parse separate parts of filename {}", name);
            continue;
        };

        let mv = catalog
            .entry(version.clone())
            .or_insert_with(|| MigrationVersion {
                version,
                description,
                ..Default::default()
            });

        match direction {
            Direction::Up => {
                if mv.up_file_exists {
                    return Err(DriftError::Catalog(format!(
                        "catalog - more than one up migration file found for migration version {}",
                        mv.version
                    )));
                }
                mv.up_file_exists = true;
            }
            Direction::Down => {
                if mv.down_file_exists {
                    return Err(DriftError::Catalog(format!(
                        "catalog - more than one down migration file found for migration version {}",
                        mv.version
                    )));
                }
                mv.down_file_exists = true;
            }
        }
    }

    Ok(catalog)
}

/// Joins the directory scan with the tracking table's applied versions and
/// returns the sorted snapshot. Versions known only to the database appear
/// with an empty description and no file flags.
pub fn build_catalog(path: &Path, applied: &[String]) -> DriftResult<Vec<MigrationVersion>> {
    let mut map = scan_directory(path)?;

    for version in applied {
        map.entry(version.clone())
            .and_modify(|mv| mv.exists_in_db = true)
            .or_insert_with(|| MigrationVersion {
                version: version.clone(),
                exists_in_db: true,
                ..Default::default()
            });
    }

    Ok(map.into_values().collect())
}

/// Finds every version older than `current_version` that has never been
/// applied, together with the last version applied before the first gap
/// (the `fix` command migrates down to that one).
pub fn find_gaps(
    catalog: &[MigrationVersion],
    current_version: &str,
) -> (Vec<MigrationVersion>, String) {
    let mut gaps = Vec::new();
    let mut last_valid = String::new();

    for mv in catalog {
        if mv.version.as_str() >= current_version {
            break;
        }

        if !mv.exists_in_db {
            gaps.push(mv.clone());
        }
        if gaps.is_empty() {
            last_valid = mv.version.clone();
        }
    }

    (gaps, last_valid)
}
