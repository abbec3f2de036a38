//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the run ledger.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One exploration run of one engine
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    engine TEXT NOT NULL,
    root_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    stop_reason TEXT,
    output_dir TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_engine ON runs(engine);

-- Distinct states discovered by a run
CREATE TABLE IF NOT EXISTS states (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    identity TEXT NOT NULL,
    sequence_number INTEGER NOT NULL,
    depth INTEGER NOT NULL,
    url TEXT NOT NULL,
    snapshot_path TEXT NOT NULL,
    UNIQUE(run_id, identity)
);

CREATE INDEX IF NOT EXISTS idx_states_run ON states(run_id);
CREATE INDEX IF NOT EXISTS idx_states_identity ON states(identity);

-- Transitions exercised by a run, in order
CREATE TABLE IF NOT EXISTS transitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    position INTEGER NOT NULL,
    from_identity TEXT NOT NULL,
    to_identity TEXT NOT NULL,
    trigger TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transitions_run ON transitions(run_id);

-- Failed render or action attempts
CREATE TABLE IF NOT EXISTS failures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    trigger TEXT NOT NULL,
    depth INTEGER NOT NULL,
    kind TEXT NOT NULL,
    message TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_failures_run ON failures(run_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
