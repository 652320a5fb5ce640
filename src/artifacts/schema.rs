/*!
 * SQLite schema of the artifact store.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create or upgrade the schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // WAL keeps readers unblocked while a unit is being written
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .context("Failed to enable WAL mode")?;

    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing artifact schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        anyhow::bail!(
            "Artifact database schema v{} is newer than supported v{}",
            current_version,
            SCHEMA_VERSION
        );
    } else {
        debug!("Artifact schema is up to date (v{})", current_version);
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()
        .context("Failed to read schema version")?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    // Absent indices are stored as -1 so the primary key stays total
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            content_id TEXT NOT NULL,
            language TEXT NOT NULL,
            kind TEXT NOT NULL,
            unit_index INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            data BLOB NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (content_id, language, kind, unit_index, chunk_index)
        );

        CREATE INDEX IF NOT EXISTS idx_artifacts_run ON artifacts(content_id, language);
        "#,
    )
    .context("Failed to create artifacts table")?;

    Ok(())
}
