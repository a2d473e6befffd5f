//! Shared fixtures for the engine's test modules: an in-memory
//! `MigrationStore`, scripted prompts, and filesystem helpers.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use drift_core::{
    AppConfig, ConnectionConfig, DatabaseDriver, DriftError, DriftResult, Prompt, SslMode,
};

use crate::repository::MigrationStore;
use crate::version::Direction;

/// In-memory store: tracks versions in a set and records every call so
/// tests can assert ordering and the script/force split
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) state: Mutex<StoreState>,
}

#[derive(Default)]
pub(crate) struct StoreState {
    pub(crate) versions: BTreeSet<String>,
    pub(crate) fail_versions: HashSet<String>,
    /// (version, direction, ran_a_script)
    pub(crate) log: Vec<(String, Direction, bool)>,
}

impl MemoryStore {
    pub(crate) fn seeded(versions: &[&str]) -> Self {
        let store = MemoryStore::default();
        {
            let mut state = store.state.lock().unwrap();
            state.versions = versions.iter().map(|v| v.to_string()).collect();
        }
        store
    }

    pub(crate) fn failing_on(self, version: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_versions
            .insert(version.to_string());
        self
    }

    pub(crate) fn versions(&self) -> Vec<String> {
        self.state.lock().unwrap().versions.iter().cloned().collect()
    }

    pub(crate) fn log(&self) -> Vec<(String, Direction, bool)> {
        self.state.lock().unwrap().log.clone()
    }
}

impl MigrationStore for MemoryStore {
    async fn connect(&mut self) -> DriftResult<()> {
        Ok(())
    }

    async fn close(&mut self) {}

    async fn ensure_tracking_table(&self) -> DriftResult<()> {
        Ok(())
    }

    async fn current_version(&self) -> DriftResult<String> {
        let state = self.state.lock().unwrap();
        Ok(state.versions.iter().next_back().cloned().unwrap_or_default())
    }

    async fn applied_versions(&self) -> DriftResult<Vec<String>> {
        Ok(self.versions())
    }

    async fn apply_script(
        &self,
        version: &str,
        _sql: &str,
        direction: Direction,
    ) -> DriftResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_versions.contains(version) {
            return Err(DriftError::Database(format!(
                "apply {} migration {} - forced failure",
                direction, version
            )));
        }

        match direction {
            Direction::Up => state.versions.insert(version.to_string()),
            Direction::Down => state.versions.remove(version),
        };
        state.log.push((version.to_string(), direction, true));
        Ok(())
    }

    async fn force_mark(&self, version: &str, direction: Direction) -> DriftResult<()> {
        let mut state = self.state.lock().unwrap();
        match direction {
            Direction::Up => state.versions.insert(version.to_string()),
            Direction::Down => state.versions.remove(version),
        };
        state.log.push((version.to_string(), direction, false));
        Ok(())
    }
}

/// Scripted answers; records every message it was asked with
#[derive(Default)]
pub(crate) struct ScriptedPrompt {
    pub(crate) answers: VecDeque<&'static str>,
    pub(crate) asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompt {
    pub(crate) fn answering(answers: &[&'static str]) -> Box<Self> {
        Box::new(Self {
            answers: answers.iter().copied().collect(),
            asked: Arc::default(),
        })
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, message: &str) -> DriftResult<String> {
        self.asked.lock().unwrap().push(message.to_string());
        Ok(self
            .answers
            .pop_front()
            .expect("prompt asked more often than scripted")
            .to_string())
    }
}

/// Panics when asked; used where no prompt must ever appear
pub(crate) struct NoPrompt;

impl Prompt for NoPrompt {
    fn ask(&mut self, _message: &str) -> DriftResult<String> {
        panic!("confirmation prompt must not be shown");
    }
}

pub(crate) fn test_config(dir: &Path, silent: bool, allow_fix: bool) -> AppConfig {
    AppConfig {
        driver: DatabaseDriver::Postgres,
        connection: ConnectionConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "appdb".to_string(),
            user: "app".to_string(),
            password: "secret".to_string(),
            ssl_mode: SslMode::Disable,
        },
        migrations_dir: dir.to_path_buf(),
        allow_fix,
        silent_mode: silent,
        verbose: false,
    }
}

pub(crate) fn write_pair(dir: &Path, version: &str, description: &str) {
    fs::write(
        dir.join(format!("{}_{}.up.sql", version, description)),
        "select 1;",
    )
    .unwrap();
    fs::write(
        dir.join(format!("{}_{}.down.sql", version, description)),
        "select 1;",
    )
    .unwrap();
}
