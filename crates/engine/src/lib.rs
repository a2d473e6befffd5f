//! drift-engine - planning and execution for SQL schema migrations.
//!
//! The engine reconciles two sources of truth: a directory of
//! timestamp-named migration files and the `schema_migration` tracking
//! table inside the target database. Modules, leaves first:
//!
//! - `version`: the in-memory join of a file pair and a tracking-table row
//! - `dialect`: per-flavor SQL for the tracking table
//! - `repository`: connection pool + transactional script application
//! - `catalog`: filesystem discovery merged with the applied set
//! - `planner`: command interpretation into an ordered, directed plan
//! - `migrator`: drives plans end to end, owns confirmation and progress
//! - `creator`: new migration file pairs
//! - `inspect`: `list` / `version` read-only views

pub mod catalog;
pub mod creator;
pub mod dialect;
pub mod inspect;
pub mod migrator;
pub mod planner;
pub mod repository;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

pub use dialect::{dialect_for, Dialect};
pub use migrator::Migrator;
pub use planner::{Command, MigrationPlan, PlanOutcome};
pub use repository::{MigrationStore, SqlRepository};
pub use version::{Direction, MigrationVersion};
