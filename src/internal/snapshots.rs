//! Index over the on-disk snapshot tree `{root}/{YYYY-MM-DD}/{project}/{file}.json`.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::models::SnapshotDocument;
use super::state::{KeyPathStore, paths};
use crate::utils::datetime::parse_snapshot_date;

/// Projects and dates found by one directory scan.
///
/// The index is not refreshed automatically; call [`SnapshotIndex::scan`]
/// again to observe filesystem changes.
#[derive(Debug, Clone, Default)]
pub struct SnapshotIndex {
    root: PathBuf,
    projects: BTreeSet<String>,
    dates: BTreeSet<String>,
}

/// Result of [`SnapshotIndex::select_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub project: String,
    pub date: Option<String>,
    pub snapshot: Option<String>,
    pub project_dates: Vec<String>,
}

impl SnapshotIndex {
    /// Walk the immediate date folders of `root` and their project folders.
    ///
    /// Entries that are not directories and folder names that are not real
    /// `YYYY-MM-DD` dates are skipped. A missing root yields an empty index.
    #[tracing::instrument(skip_all)]
    pub fn scan(root: impl Into<PathBuf>) -> Self {
        let start = Instant::now();
        let root = root.into();
        let mut index = Self {
            root,
            ..Default::default()
        };

        let date_entries = match fs::read_dir(&index.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    root = %index.root.display(),
                    error = %e,
                    "Snapshot directory is not readable; continuing with no snapshots"
                );
                return index;
            }
        };

        for entry in date_entries.flatten() {
            let path = entry.path();
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !path.is_dir() || parse_snapshot_date(&name).is_none() {
                tracing::debug!(entry = %path.display(), "Skipping non-date entry");
                continue;
            }

            match fs::read_dir(&path) {
                Ok(projects) => {
                    for project in projects.flatten() {
                        let project_name = project.file_name();
                        if project.path().is_dir()
                            && let Some(project_name) = project_name.to_str()
                        {
                            index.projects.insert(project_name.to_string());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(dir = %path.display(), error = %e, "Failed to read date folder");
                }
            }
            index.dates.insert(name);
        }

        tracing::info!(
            root = %index.root.display(),
            projects = index.projects.len(),
            dates = index.dates.len(),
            "Scanned snapshot directory"
        );
        tracing::debug!(elapsed = ?start.elapsed(), "snapshots.scan");
        index
    }

    /// Scan `root` and publish the project and date lists into `store`.
    pub fn load(root: impl Into<PathBuf>, store: &KeyPathStore) -> Self {
        let index = Self::scan(root);
        index.publish(store);
        index
    }

    /// Write the sorted project and date lists to their fixed key paths.
    pub fn publish(&self, store: &KeyPathStore) {
        store.set(paths::ALL_PROJECTS, string_array(&self.projects()));
        store.set(paths::ALL_DATES, string_array(&self.dates()));
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects(&self) -> Vec<String> {
        self.projects.iter().cloned().collect()
    }

    pub fn dates(&self) -> Vec<String> {
        self.dates.iter().cloned().collect()
    }

    pub fn has_date(&self, date: &str) -> bool {
        self.dates.contains(date)
    }

    /// Dates, ascending, on which `project` has at least one snapshot file.
    pub fn project_dates(&self, project: &str) -> Vec<String> {
        self.dates
            .iter()
            .filter(|date| self.latest_snapshot_for_date(project, date).is_some())
            .cloned()
            .collect()
    }

    /// Lexicographically greatest `*.json` file in `{root}/{date}/{project}`.
    pub fn latest_snapshot_for_date(&self, project: &str, date: &str) -> Option<String> {
        if parse_snapshot_date(date).is_none() {
            return None;
        }
        let entries = fs::read_dir(self.root.join(date).join(project)).ok()?;
        entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.ends_with(".json"))
            .max()
    }

    /// Most recent `(date, file)` for `project`, if it has any snapshot.
    pub fn latest_snapshot(&self, project: &str) -> Option<(String, String)> {
        self.dates.iter().rev().find_map(|date| {
            self.latest_snapshot_for_date(project, date)
                .map(|file| (date.clone(), file))
        })
    }

    /// Make `project` the current selection and write it into `store`.
    ///
    /// Without `date` the project's latest date is used. A `date` on which the
    /// project has no snapshot resolves to no date and no snapshot. This is the
    /// only writer of the four `snapshots.current_*` paths.
    pub fn select_project(
        &self,
        store: &KeyPathStore,
        project: &str,
        date: Option<&str>,
    ) -> Selection {
        let project_dates = self.project_dates(project);

        let resolved_date = match date {
            None => project_dates.last().cloned(),
            Some(d) => project_dates.iter().find(|pd| pd.as_str() == d).cloned(),
        };
        let resolved_snapshot = resolved_date
            .as_deref()
            .and_then(|d| self.latest_snapshot_for_date(project, d));

        tracing::info!(
            project,
            requested_date = ?date,
            date = ?resolved_date,
            snapshot = ?resolved_snapshot,
            "Selecting project"
        );

        store.set(paths::CURRENT_PROJECT, project);
        store.set(paths::CURRENT_DATE, optional_string(resolved_date.as_deref()));
        store.set(
            paths::CURRENT_SNAPSHOT,
            optional_string(resolved_snapshot.as_deref()),
        );
        store.set(paths::CURRENT_PROJECT_DATES, string_array(&project_dates));

        Selection {
            project: project.to_string(),
            date: resolved_date,
            snapshot: resolved_snapshot,
            project_dates,
        }
    }

    pub fn snapshot_path(&self, project: &str, date: &str, file: &str) -> PathBuf {
        self.root.join(date).join(project).join(file)
    }

    /// Read and parse one snapshot file.
    pub fn read_snapshot(&self, project: &str, date: &str, file: &str) -> Result<SnapshotDocument> {
        let path = self.snapshot_path(project, date, file);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        SnapshotDocument::from_json(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }
}

fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn optional_string(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}
