//! Core migration version model.
//!
//! A `MigrationVersion` is the join of what the filesystem and the tracking
//! table each know about one version identifier. Version identifiers are
//! `YYYYMMDD_HHMMSS` strings; lexicographic order coincides with
//! chronological order, so every comparison in the engine is plain string
//! ordering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two scripts of a migration to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One version as seen by the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationVersion {
    /// `YYYYMMDD_HHMMSS` identifier; unique within a catalog snapshot
    pub version: String,
    /// Taken from the filename; empty when only the tracking table knows
    /// the version
    pub description: String,
    /// A row for this version exists in the tracking table
    pub exists_in_db: bool,
    pub up_file_exists: bool,
    pub down_file_exists: bool,
}

impl MigrationVersion {
    /// Filename of the script for `direction`
    pub fn filename(&self, direction: Direction) -> String {
        format!("{}_{}.{}.sql", self.version, self.description, direction)
    }

    pub fn file_exists(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up_file_exists,
            Direction::Down => self.down_file_exists,
        }
    }
}
