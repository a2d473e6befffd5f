//! Read-only views over the catalog: `list` and `version`.
//!
//! Both connect, ensure the tracking table exists, and release the store on
//! every exit path; neither mutates the database schema.

use std::collections::HashSet;

use drift_core::DriftResult;

use crate::catalog::{build_catalog, find_gaps};
use crate::migrator::Migrator;
use crate::repository::MigrationStore;

fn yn(value: bool) -> &'static str {
    if value {
        "Y"
    } else {
        ""
    }
}

fn table_row(c1: &str, c2: &str, c3: &str, c4: &str, c5: &str) -> String {
    format!("{:<15} | {:<30} | {:<8} | {:<9} | {:<11}", c1, c2, c3, c4, c5)
}

impl<S: MigrationStore> Migrator<S> {
    /// Prints every catalog entry (or the last `limit`) as a fixed-column
    /// table. Gap rows get the highlight style, the current version the
    /// success style.
    pub async fn list(&mut self, limit: Option<usize>) -> DriftResult<()> {
        let result = self.list_inner(limit).await;
        self.store.close().await;
        result
    }

    async fn list_inner(&mut self, limit: Option<usize>) -> DriftResult<()> {
        self.store.connect().await?;
        self.store.ensure_tracking_table().await?;

        let applied = self.store.applied_versions().await?;
        let catalog = build_catalog(&self.path, &applied)?;
        let current = self.store.current_version().await?;

        let (gaps, _) = find_gaps(&catalog, &current);
        let gap_versions: HashSet<&str> = gaps.iter().map(|mv| mv.version.as_str()).collect();

        println!(
            "{}",
            table_row("Version", "Description", "Migrated", "Up Exists", "Down Exists")
        );
        println!(
            "{}",
            table_row("-------", "-----------", "--------", "---------", "-----------")
        );

        let skip = limit.map_or(0, |n| catalog.len().saturating_sub(n));
        for mv in catalog.iter().skip(skip) {
            let line = table_row(
                &mv.version,
                &mv.description,
                yn(mv.exists_in_db),
                yn(mv.up_file_exists),
                yn(mv.down_file_exists),
            );
            if gap_versions.contains(mv.version.as_str()) {
                self.style.highlight(&line);
            } else if mv.version == current {
                self.style.success(&line);
            } else {
                println!("{}", line);
            }
        }

        Ok(())
    }

    /// Prints the tracker's current version
    pub async fn version(&mut self) -> DriftResult<()> {
        let result = self.version_inner().await;
        self.store.close().await;
        result
    }

    async fn version_inner(&mut self) -> DriftResult<()> {
        self.store.connect().await?;
        self.store.ensure_tracking_table().await?;

        let current = self.store.current_version().await?;
        if current.is_empty() {
            self.style.highlight("no migration have been run yet");
            tracing::info!("version - no migration have been run yet");
        } else {
            let msg = format!("current version: {}", current);
            self.style.success(&msg);
            tracing::info!("version - {}", msg);
        }

        Ok(())
    }
}
