//! Database schema migrations for wellnudge.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: key-value store, goals, progress entries, recommendations.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS goals (
            id         TEXT PRIMARY KEY,
            title      TEXT NOT NULL,
            category   TEXT NOT NULL,
            status     TEXT NOT NULL DEFAULT 'active',
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS progress_entries (
            id          TEXT PRIMARY KEY,
            goal_id     TEXT NOT NULL REFERENCES goals(id),
            recorded_at TEXT NOT NULL,
            note        TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS recommendations (
            id         TEXT PRIMARY KEY,
            title      TEXT NOT NULL,
            category   TEXT NOT NULL,
            status     TEXT NOT NULL DEFAULT 'pending',
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_progress_goal ON progress_entries(goal_id);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: per-category streaks.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS streaks (
            category      TEXT PRIMARY KEY,
            current_count INTEGER NOT NULL CHECK (current_count >= 1),
            longest_count INTEGER NOT NULL,
            last_updated  TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: hour-of-day response samples for personalization.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS response_samples (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            key         TEXT NOT NULL,
            hour        INTEGER NOT NULL CHECK (hour BETWEEN 0 AND 23),
            recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_response_samples_key ON response_samples(key);",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()
}
