//! Migration executor: drives one command end to end.
//!
//! The executor owns the store for the duration of a command invocation:
//! connect, ensure the tracking table, snapshot the catalog, plan, confirm
//! where required, then apply each planned step. The store is released on
//! every exit path, including failures and declined confirmations.

use std::fs;
use std::path::PathBuf;

use drift_core::{AppConfig, DriftError, DriftResult, Prompt, Style};

use crate::catalog::{build_catalog, find_gaps};
use crate::planner::{plan, Command, MigrationPlan, PlanOutcome};
use crate::repository::MigrationStore;
use crate::version::Direction;

/// Literal sentence shown before any down migration runs
pub const CONFIRM_SENTENCE: &str = "please type 'yes' to continue or 'no' to cancel";

/// Drives migration commands against a [`MigrationStore`]
pub struct Migrator<S: MigrationStore> {
    pub(crate) store: S,
    pub(crate) config: AppConfig,
    pub(crate) path: PathBuf,
    pub(crate) style: Style,
    pub(crate) prompt: Box<dyn Prompt>,
    pub(crate) confirmation_provided: bool,
}

impl<S: MigrationStore> Migrator<S> {
    pub fn new(store: S, config: AppConfig, prompt: Box<dyn Prompt>) -> Self {
        let path = config.migrations_dir.clone();
        Self {
            store,
            config,
            path,
            style: Style,
            prompt,
            confirmation_provided: false,
        }
    }

    /// The underlying store, mainly for inspection after a command
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one mutating command. The store is closed before returning,
    /// whatever the outcome.
    pub async fn migrate(&mut self, command: Command, argument: Option<&str>) -> DriftResult<()> {
        let result = self.migrate_inner(command, argument).await;
        self.store.close().await;
        result
    }

    async fn migrate_inner(
        &mut self,
        command: Command,
        argument: Option<&str>,
    ) -> DriftResult<()> {
        self.store.connect().await?;
        tracing::info!("migrate - successfully connected to the database");
        self.store.ensure_tracking_table().await?;

        let applied = self.store.applied_versions().await?;
        let catalog = build_catalog(&self.path, &applied)?;
        let current = self.store.current_version().await?;

        let migration_plan = match plan(&catalog, &current, command, argument)? {
            PlanOutcome::NoMigrations => {
                self.style.highlight("no migrations found");
                tracing::info!("migrate - no migrations found");
                return Ok(());
            }
            PlanOutcome::AlreadyAtTarget => {
                self.style.success("db already migrated to the newest version");
                tracing::info!("migrate - db already migrated to the newest version");
                return Ok(());
            }
            PlanOutcome::Plan(p) => p,
        };

        if command == Command::Up && argument.is_none() {
            let msg = format!("migrating up to version {}", migration_plan.target);
            self.style.highlight(&msg);
            tracing::info!("migrate - {}", msg);
        }

        if command != Command::Force
            && migration_plan.direction == Direction::Down
            && !migration_plan.steps.is_empty()
        {
            self.confirm()?;
        }

        if command == Command::Force {
            return self.run_force(&migration_plan).await;
        }
        self.run_scripts(&migration_plan).await
    }

    /// Applies every planned step by reading its file and running it in
    /// its own transaction. The first failure aborts the rest; earlier
    /// steps stay applied.
    async fn run_scripts(&mut self, migration_plan: &MigrationPlan) -> DriftResult<()> {
        for mv in &migration_plan.steps {
            let filename = mv.filename(migration_plan.direction);
            let file_path = self.path.join(&filename);
            let script = fs::read_to_string(&file_path).map_err(|e| {
                DriftError::Plan(format!(
                    "migrate - reading migration file {} - {}",
                    file_path.display(),
                    e
                ))
            })?;

            let msg = format!("running {} migration {}", migration_plan.direction, filename);
            self.style.highlight_partial(&msg);
            match self
                .store
                .apply_script(&mv.version, &script, migration_plan.direction)
                .await
            {
                Ok(()) => {
                    self.style.success(" - success");
                    tracing::info!("migrate - {} - success", msg);
                }
                Err(e) => {
                    self.style.error_suffix(" - failed");
                    tracing::error!("migrate - {} - failed", msg);
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// `force` marks the tracker without executing any script
    async fn run_force(&mut self, migration_plan: &MigrationPlan) -> DriftResult<()> {
        let msg = format!("forcing current version to {}", migration_plan.target);
        self.style.highlight_partial(&msg);

        for mv in &migration_plan.steps {
            if let Err(e) = self
                .store
                .force_mark(&mv.version, migration_plan.direction)
                .await
            {
                self.style.error_suffix(" - failed");
                tracing::error!("migrate - {} - failed", msg);
                return Err(e);
            }
        }

        self.style.success(" - success");
        tracing::info!("migrate - {} - success", msg);
        Ok(())
    }

    /// Detects migration gaps and repairs them: down to the last version
    /// applied before the first gap, then back up to where the tracker was.
    pub async fn fix(&mut self) -> DriftResult<()> {
        if !self.config.allow_fix {
            return Err(DriftError::FixDisabled);
        }

        let result = self.fix_inner().await;
        self.store.close().await;
        result
    }

    async fn fix_inner(&mut self) -> DriftResult<()> {
        self.store.connect().await?;
        self.store.ensure_tracking_table().await?;

        let applied = self.store.applied_versions().await?;
        let catalog = build_catalog(&self.path, &applied)?;
        let current = self.store.current_version().await?;

        let (gaps, last_valid) = find_gaps(&catalog, &current);
        if gaps.is_empty() {
            self.style.success("nothing to fix");
            tracing::info!("fix - nothing to fix");
            return Ok(());
        }

        self.style.highlight("migration gaps found");
        let msg = format!(
            "oldest migration version not yet executed: {}",
            gaps[0].version
        );
        self.style.highlight(&msg);
        tracing::info!("fix - {}", msg);

        let msg = format!(
            "fix will migrate down to version {} and back up to version {}",
            last_valid, current
        );
        self.style.highlight(&msg);
        tracing::info!("fix - {}", msg);
        self.confirm()?;

        if last_valid.is_empty() {
            self.migrate(Command::Down, None).await?;
        } else {
            let down_target = last_valid.clone();
            self.migrate(Command::Downto, Some(&down_target)).await?;
        }

        let up_target = current.clone();
        self.migrate(Command::Upto, Some(&up_target)).await?;
        Ok(())
    }

    /// Asks once per command invocation; silent mode and a previous `yes`
    /// both count as confirmation.
    fn confirm(&mut self) -> DriftResult<()> {
        if self.confirmation_provided || self.config.silent_mode {
            self.confirmation_provided = true;
            return Ok(());
        }

        let answer = self.prompt.ask(CONFIRM_SENTENCE)?;
        if answer != "yes" {
            return Err(DriftError::Cancelled);
        }

        self.confirmation_provided = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::test_support::{test_config, write_pair, MemoryStore, NoPrompt, ScriptedPrompt};

    const V1: &str = "20240101_000000";
    const VGAP: &str = "20240101_120000";
    const V2: &str = "20240102_000000";

    #[tokio::test]
    async fn up_applies_every_pending_migration_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), false, false);
        let mut migrator = Migrator::new(MemoryStore::default(), config, Box::new(NoPrompt));

        migrator.migrate(Command::Up, None).await.unwrap();

        assert_eq!(migrator.store().versions(), [V1, V2]);
        let log = migrator.store().log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], (V1.to_string(), Direction::Up, true));
        assert_eq!(log[1], (V2.to_string(), Direction::Up, true));
    }

    #[tokio::test]
    async fn gap_blocks_up_and_leaves_the_tracker_untouched() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), V2, "b");
        // an older migration appears after V1 and V2 were applied
        fs::write(dir.path().join(format!("{}_c.up.sql", VGAP)), "select 1;").unwrap();

        let config = test_config(dir.path(), false, false);
        let mut migrator =
            Migrator::new(MemoryStore::seeded(&[V1, V2]), config, Box::new(NoPrompt));

        let err = migrator.migrate(Command::Up, None).await.unwrap_err();
        assert!(matches!(err, DriftError::Plan(_)));
        assert!(err.to_string().contains("up migrations not allowed"));
        assert_eq!(migrator.store().versions(), [V1, V2]);
        assert!(migrator.store().log().is_empty());
    }

    #[tokio::test]
    async fn fix_replays_down_past_the_gap_and_back_up() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), VGAP, "c");
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), false, true);
        let mut migrator = Migrator::new(
            MemoryStore::seeded(&[V1, V2]),
            config,
            ScriptedPrompt::answering(&["yes"]),
        );

        migrator.fix().await.unwrap();

        assert_eq!(migrator.store().versions(), [V1, VGAP, V2]);
        // the interim state must have gone down to V1 before climbing back
        let log = migrator.store().log();
        assert_eq!(
            log,
            vec![
                (V2.to_string(), Direction::Down, true),
                (VGAP.to_string(), Direction::Up, true),
                (V2.to_string(), Direction::Up, true),
            ]
        );
    }

    #[tokio::test]
    async fn fix_requires_the_allow_fix_setting() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), false, false);
        let mut migrator = Migrator::new(MemoryStore::default(), config, Box::new(NoPrompt));

        let err = migrator.fix().await.unwrap_err();
        assert!(matches!(err, DriftError::FixDisabled));
    }

    #[tokio::test]
    async fn fix_without_gaps_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");

        let config = test_config(dir.path(), false, true);
        let mut migrator =
            Migrator::new(MemoryStore::seeded(&[V1]), config, Box::new(NoPrompt));

        migrator.fix().await.unwrap();
        assert!(migrator.store().log().is_empty());
    }

    #[tokio::test]
    async fn declined_confirmation_cancels_a_down_migration() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), false, false);
        let mut migrator = Migrator::new(
            MemoryStore::seeded(&[V1, V2]),
            config,
            ScriptedPrompt::answering(&["no"]),
        );

        let err = migrator
            .migrate(Command::Downto, Some(V1))
            .await
            .unwrap_err();
        assert!(matches!(err, DriftError::Cancelled));
        assert_eq!(migrator.store().versions(), [V1, V2]);
    }

    #[tokio::test]
    async fn confirmation_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), false, false);
        let mut migrator = Migrator::new(
            MemoryStore::seeded(&[V1, V2]),
            config,
            ScriptedPrompt::answering(&["YES"]),
        );

        let err = migrator
            .migrate(Command::Downto, Some(V1))
            .await
            .unwrap_err();
        assert!(matches!(err, DriftError::Cancelled));
    }

    #[tokio::test]
    async fn confirmation_uses_the_literal_sentence() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), false, false);
        let asked = Arc::new(Mutex::new(Vec::new()));
        let prompt = Box::new(ScriptedPrompt {
            answers: VecDeque::from(["yes"]),
            asked: Arc::clone(&asked),
        });
        let mut migrator = Migrator::new(MemoryStore::seeded(&[V1, V2]), config, prompt);

        migrator.migrate(Command::Downto, Some(V1)).await.unwrap();
        assert_eq!(asked.lock().unwrap().as_slice(), [CONFIRM_SENTENCE]);
    }

    #[tokio::test]
    async fn silent_mode_skips_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), true, false);
        let mut migrator = Migrator::new(
            MemoryStore::seeded(&[V1, V2]),
            config,
            Box::new(NoPrompt),
        );

        migrator.migrate(Command::Down, None).await.unwrap();
        assert!(migrator.store().versions().is_empty());
        let log = migrator.store().log();
        assert_eq!(
            log,
            vec![
                (V2.to_string(), Direction::Down, true),
                (V1.to_string(), Direction::Down, true),
            ]
        );
    }

    #[tokio::test]
    async fn force_marks_the_tracker_without_running_scripts() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), false, false);
        let mut migrator = Migrator::new(MemoryStore::default(), config, Box::new(NoPrompt));

        migrator.migrate(Command::Force, Some(V2)).await.unwrap();

        assert_eq!(migrator.store().versions(), [V2]);
        assert_eq!(
            migrator.store().log(),
            vec![(V2.to_string(), Direction::Up, false)]
        );
    }

    #[tokio::test]
    async fn first_failure_aborts_the_rest_of_the_plan() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), false, false);
        let store = MemoryStore::default().failing_on(V2);
        let mut migrator = Migrator::new(store, config, Box::new(NoPrompt));

        let err = migrator.migrate(Command::Up, None).await.unwrap_err();
        assert!(matches!(err, DriftError::Database(_)));

        // the first step stays applied; the failed one left no row
        assert_eq!(migrator.store().versions(), [V1]);
    }

    #[tokio::test]
    async fn up_when_already_at_the_newest_version_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");

        let config = test_config(dir.path(), false, false);
        let mut migrator =
            Migrator::new(MemoryStore::seeded(&[V1]), config, Box::new(NoPrompt));

        migrator.migrate(Command::Up, None).await.unwrap();
        assert!(migrator.store().log().is_empty());
    }

    #[tokio::test]
    async fn round_trip_returns_to_the_prior_version() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), V1, "a");
        write_pair(dir.path(), V2, "b");

        let config = test_config(dir.path(), true, false);
        let mut migrator = Migrator::new(MemoryStore::default(), config, Box::new(NoPrompt));

        migrator.migrate(Command::Upto, Some(V2)).await.unwrap();
        assert_eq!(migrator.store().versions(), [V1, V2]);

        migrator.migrate(Command::Downto, Some(V1)).await.unwrap();
        assert_eq!(migrator.store().versions(), [V1]);
    }
}
