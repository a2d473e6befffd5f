//! Migration planning: command interpretation, direction, ordered steps.
//!
//! The planner is a pure function over one catalog snapshot. It validates
//! the argument, resolves the target version, derives the direction from
//! target vs current (command and direction are separate values; `goto`
//! alone can produce either direction), enforces the gap rule, and emits
//! the ordered list of versions to process. Nothing here touches the
//! filesystem or the database.

use std::fmt;

use drift_core::{DriftError, DriftResult};

use crate::catalog::find_gaps;
use crate::version::{Direction, MigrationVersion};

/// Largest accepted count for `up N` / `down N`
pub const MAX_MIGRATION_COUNT: i64 = 9_999_999;

/// The mutating commands. `create`, `list`, `version`, and `fix` have their
/// own entry points and never reach the planner directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Up,
    Down,
    Upto,
    Downto,
    Goto,
    Force,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Up => "up",
            Command::Down => "down",
            Command::Upto => "upto",
            Command::Downto => "downto",
            Command::Goto => "goto",
            Command::Force => "force",
        }
    }

    /// `up` and `down` take an optional count; the rest take a version
    fn takes_count(&self) -> bool {
        matches!(self, Command::Up | Command::Down)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of versions to process for one command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Version the tracker ends at; empty when rolling back everything
    pub target: String,
    pub direction: Direction,
    /// Strictly increasing (up) or strictly decreasing (down)
    pub steps: Vec<MigrationVersion>,
}

/// What the planner decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Plan(MigrationPlan),
    /// The catalog is empty; there is nothing to plan against
    NoMigrations,
    /// Target equals the current version; nothing to do
    AlreadyAtTarget,
}

fn invalid_count() -> DriftError {
    DriftError::InvalidArgument(
        "migrate - a valid number of migrations [N] is required".to_string(),
    )
}

/// Computes the plan for `command` with `argument` against one catalog
/// snapshot and the tracker's current version.
pub fn plan(
    catalog: &[MigrationVersion],
    current_version: &str,
    command: Command,
    argument: Option<&str>,
) -> DriftResult<PlanOutcome> {
    let argument = argument.map(str::trim).filter(|s| !s.is_empty());

    let mut count: i64 = 0;
    let mut target = String::new();

    if command.takes_count() {
        if let Some(arg) = argument {
            let n: i64 = arg.parse().map_err(|_| invalid_count())?;
            if !(1..=MAX_MIGRATION_COUNT).contains(&n) {
                return Err(invalid_count());
            }
            count = if command == Command::Down { -n } else { n };
        }
    } else {
        match argument {
            Some(arg) => target = arg.to_string(),
            None => {
                return Err(DriftError::InvalidArgument(format!(
                    "migrate - the {} command requires a to version to be specified",
                    command
                )));
            }
        }
    }

    if catalog.is_empty() {
        return Ok(PlanOutcome::NoMigrations);
    }

    // Numeric resolution: convert N to a target version by scanning the
    // catalog outward from the current version. Down candidates are the
    // applied entries with a down file; running out of candidates means
    // "as far as possible" (down degrades to a full rollback).
    if count > 0 {
        let mut remaining = count;
        for mv in catalog {
            if mv.version.as_str() <= current_version {
                continue;
            }
            target = mv.version.clone();
            remaining -= 1;
            if remaining <= 0 {
                break;
            }
        }
    } else if count < 0 {
        let mut remaining = count;
        for mv in catalog.iter().rev() {
            if mv.version.as_str() >= current_version {
                continue;
            }
            if !mv.exists_in_db || !mv.down_file_exists {
                continue;
            }
            target = mv.version.clone();
            remaining += 1;
            if remaining >= 0 {
                break;
            }
        }
        if remaining < 0 {
            target.clear();
        }
    }

    // `up` with no explicit target climbs to the newest version that has
    // an up file
    if target.is_empty() && command == Command::Up {
        if let Some(mv) = catalog.iter().rev().find(|mv| mv.up_file_exists) {
            target = mv.version.clone();
        }
    }

    // The target must exist in the catalog; the one exception is `down`
    // resolving to the empty version, which rolls back everything
    let found = (command == Command::Down && target.is_empty())
        || catalog.iter().any(|mv| mv.version == target);
    if !found {
        return Err(DriftError::InvalidArgument(format!(
            "migrate - migration version {} not found",
            target
        )));
    }

    let direction = if target.as_str() > current_version {
        Direction::Up
    } else {
        Direction::Down
    };

    // Gap rule: never advance the tracker while an older migration has not
    // been run. `force` is exempt by definition.
    if command != Command::Force && target.as_str() >= current_version {
        let (gaps, _) = find_gaps(catalog, current_version);
        if !gaps.is_empty() {
            return Err(DriftError::Plan(
                "migrate - up migrations not allowed when all older migrations have not been run"
                    .to_string(),
            ));
        }
    }

    if target == current_version {
        return Ok(PlanOutcome::AlreadyAtTarget);
    }

    // User intent must agree with the derived direction; only `goto` and
    // `force` may swing both ways
    match command {
        Command::Up | Command::Upto if direction == Direction::Down => {
            return Err(DriftError::Plan(format!(
                "migrate - up migration not allowed because the current db version ({}) is higher than {}",
                current_version, target
            )));
        }
        Command::Down | Command::Downto if direction == Direction::Up => {
            return Err(DriftError::Plan(format!(
                "migrate - down migration not allowed because the current db version ({}) is lower than {}",
                current_version, target
            )));
        }
        _ => {}
    }

    let steps = migrations_to_run(catalog, current_version, &target, direction, command)?;

    Ok(PlanOutcome::Plan(MigrationPlan {
        target,
        direction,
        steps,
    }))
}

/// Collects every version between the current version (excluded) and the
/// target (included), ascending for up, descending for down. Each step is
/// validated against the files it will need; `force` runs no scripts so it
/// skips those checks.
fn migrations_to_run(
    catalog: &[MigrationVersion],
    current_version: &str,
    target: &str,
    direction: Direction,
    command: Command,
) -> DriftResult<Vec<MigrationVersion>> {
    let mut steps = Vec::new();

    match direction {
        Direction::Up => {
            for mv in catalog {
                if mv.version.as_str() > current_version && mv.version.as_str() <= target {
                    if command != Command::Force && !mv.up_file_exists {
                        return Err(DriftError::Plan(format!(
                            "migrate - no up migration file found for version {}",
                            mv.version
                        )));
                    }
                    steps.push(mv.clone());
                }
            }
        }
        Direction::Down => {
            for mv in catalog.iter().rev() {
                if mv.version.as_str() <= current_version
                    && mv.version.as_str() > target
                    && (mv.exists_in_db || command == Command::Force)
                {
                    if command != Command::Force && !mv.down_file_exists {
                        return Err(DriftError::Plan(format!(
                            "migrate - no down migration file found for version {}",
                            mv.version
                        )));
                    }
                    steps.push(mv.clone());
                }
            }
        }
    }

    Ok(steps)
}
