//! Per-run, per-engine output directory
//!
//! Layout: `<results-dir>/<timestamp>/<engine>/` holding `snapshots/`,
//! `graph.json`, `failures.json` and `summary.md`.

use crate::crawler::FailureRecord;
use crate::graph::ReachabilityGraph;
use crate::output::markdown::format_markdown_summary;
use crate::output::traits::{OutputError, OutputHandler, OutputResult, RunSummary};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Output writer for one run directory
#[derive(Debug, Clone)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    /// Creates `<results_dir>/<timestamp>/<engine>/`
    ///
    /// The timestamp is RFC 3339 with `:` replaced by `.` so the directory
    /// name is valid on every file system.
    pub fn create(
        results_dir: &Path,
        started: DateTime<Utc>,
        engine: &str,
    ) -> OutputResult<Self> {
        let root = results_dir
            .join(run_timestamp(started))
            .join(engine);

        std::fs::create_dir_all(&root).map_err(|source| OutputError::Write {
            path: root.clone(),
            source,
        })?;

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Directory the snapshot archive writes into
    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    fn write(&self, name: &str, content: &str) -> OutputResult<PathBuf> {
        let path = self.root.join(name);
        let tmp = self.root.join(format!("{}.tmp", name));

        std::fs::write(&tmp, content)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|source| OutputError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Directory name for a run started at `started`
pub fn run_timestamp(started: DateTime<Utc>) -> String {
    started
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace(':', ".")
}

impl OutputHandler for RunDirectory {
    fn write_graph(&self, graph: &ReachabilityGraph) -> OutputResult<PathBuf> {
        let json = serde_json::to_string_pretty(&graph.export())?;
        self.write("graph.json", &json)
    }

    fn write_failures(&self, failures: &[FailureRecord]) -> OutputResult<PathBuf> {
        let json = serde_json::to_string_pretty(failures)?;
        self.write("failures.json", &json)
    }

    fn write_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf> {
        self.write("summary.md", &format_markdown_summary(summary))
    }
}
