//! Database schema definitions
//!
//! This module contains the SQL schema of the progress index.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    task_space TEXT NOT NULL,
    total_tasks INTEGER NOT NULL,
    status TEXT NOT NULL
);

-- Tasks whose results are durable
CREATE TABLE IF NOT EXISTS completed_tasks (
    court_id TEXT NOT NULL,
    search_date TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    PRIMARY KEY (court_id, search_date)
);

-- Checkpoint files written; numbers restart after a merge deletes the files
CREATE TABLE IF NOT EXISTS checkpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    number INTEGER NOT NULL,
    path TEXT NOT NULL,
    records INTEGER NOT NULL,
    written_at TEXT NOT NULL
);
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
