//! Store schema migration runner.
//!
//! Migrations are executed in order on every open. Each migration is guarded
//! by the `user_version` pragma so it runs exactly once per database file.

use rusqlite::Connection;

use crate::store::error::{Result, StoreError};

/// Current schema version. Bump this and add a new migration step whenever
/// the schema changes.
pub(crate) const CURRENT_VERSION: u32 = 1;

/// Run all pending migrations against the open connection.
pub(crate) fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::debug!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking store migrations"
    );

    if current < 1 {
        tracing::info!("applying store migration v001_initial");
        apply_v001(conn).map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}

/// v001: the record table (one row per entity, versioned for optimistic
/// concurrency) and the id-allocation sequences.
fn apply_v001(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            kind         TEXT    NOT NULL,
            partition_id TEXT    NOT NULL,
            local_id     TEXT    NOT NULL,
            version      INTEGER NOT NULL,
            payload      TEXT    NOT NULL,
            updated_at   TEXT    NOT NULL,
            PRIMARY KEY (kind, partition_id, local_id)
        );

        CREATE TABLE IF NOT EXISTS sequences (
            kind         TEXT    NOT NULL,
            partition_id TEXT    NOT NULL,
            next_id      INTEGER NOT NULL,
            PRIMARY KEY (kind, partition_id)
        );",
    )
}
