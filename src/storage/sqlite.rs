//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::FailureRecord;
use crate::graph::ReachabilityGraph;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{LedgerState, NewRun, RunCounts, RunRecord, RunStatus};
use crate::AtlasError;
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const RUN_COLUMNS: &str =
    "id, engine, root_url, started_at, finished_at, config_hash, status, stop_reason, output_dir";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file (parent directories are created)
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(AtlasError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, AtlasError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Engines run concurrently, each with its own connection
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, AtlasError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        engine: row.get(1)?,
        root_url: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        config_hash: row.get(5)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(RunStatus::Failed),
        stop_reason: row.get(7)?,
        output_dir: row.get(8)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (engine, root_url, started_at, config_hash, status, output_dir)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.engine,
                run.root_url,
                now,
                run.config_hash,
                RunStatus::Running.to_db_string(),
                run.output_dir
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .map_err(|_| StorageError::RunNotFound(run_id))
    }

    fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs ORDER BY id DESC", RUN_COLUMNS))?;

        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        stop_reason: &str,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, stop_reason = ?2, finished_at = ?3 WHERE id = ?4",
            params![status.to_db_string(), stop_reason, now, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Results =====

    fn record_results(
        &mut self,
        run_id: i64,
        graph: &ReachabilityGraph,
        failures: &[FailureRecord],
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        {
            let mut insert_state = tx.prepare(
                "INSERT OR IGNORE INTO states (run_id, identity, sequence_number, depth, url, snapshot_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for state in graph.states() {
                insert_state.execute(params![
                    run_id,
                    state.identity.as_str(),
                    state.sequence_number as i64,
                    state.depth,
                    state.url,
                    state.snapshot.to_string_lossy().into_owned()
                ])?;
            }

            let mut insert_transition = tx.prepare(
                "INSERT INTO transitions (run_id, position, from_identity, to_identity, trigger)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, transition) in graph.transitions().iter().enumerate() {
                insert_transition.execute(params![
                    run_id,
                    position as i64,
                    transition.from.as_str(),
                    transition.to.as_str(),
                    transition.trigger
                ])?;
            }

            let mut insert_failure = tx.prepare(
                "INSERT INTO failures (run_id, url, trigger, depth, kind, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for failure in failures {
                insert_failure.execute(params![
                    run_id,
                    failure.url,
                    failure.trigger,
                    failure.depth,
                    failure.kind.as_str(),
                    failure.message
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_states(&self, run_id: i64) -> StorageResult<Vec<LedgerState>> {
        let mut stmt = self.conn.prepare(
            "SELECT identity, sequence_number, depth, url FROM states
             WHERE run_id = ?1 ORDER BY sequence_number",
        )?;

        let states = stmt
            .query_map(params![run_id], |row| {
                Ok(LedgerState {
                    identity: row.get(0)?,
                    sequence_number: row.get::<_, i64>(1)? as u64,
                    depth: row.get(2)?,
                    url: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(states)
    }

    // ===== Statistics =====

    fn count_results(&self, run_id: i64) -> StorageResult<RunCounts> {
        let count = |table: &str| -> StorageResult<u64> {
            let count: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE run_id = ?1", table),
                params![run_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        };

        Ok(RunCounts {
            states: count("states")?,
            transitions: count("transitions")?,
            failures: count("failures")?,
        })
    }

    fn get_failure_summary(&self, run_id: i64) -> StorageResult<BTreeMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*) FROM failures WHERE run_id = ?1 GROUP BY kind",
        )?;

        let summary = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(summary)
    }

    fn get_depth_breakdown(&self, run_id: i64) -> StorageResult<BTreeMap<u32, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT depth, COUNT(*) FROM states WHERE run_id = ?1 GROUP BY depth",
        )?;

        let breakdown = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(breakdown)
    }
}
