//! Database schema migrations.
//!
//! Applies the initial schema: the publications table plus the
//! schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use exobio_core::error::ExobioError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), ExobioError> {
    // Create the migrations tracking table first.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ExobioError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ExobioError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), ExobioError> {
    conn.execute_batch(
        "
        -- Publication records. List-valued fields (authors, keywords,
        -- connections) are stored as JSON arrays in TEXT columns.
        CREATE TABLE IF NOT EXISTS publications (
            id              INTEGER PRIMARY KEY NOT NULL,
            title           TEXT NOT NULL,
            authors         TEXT NOT NULL DEFAULT '[]',
            year            INTEGER NOT NULL,
            mission         TEXT NOT NULL DEFAULT '',
            organism        TEXT NOT NULL DEFAULT '',
            experiment_type TEXT NOT NULL DEFAULT '',
            abstract        TEXT NOT NULL DEFAULT '',
            keywords        TEXT NOT NULL DEFAULT '[]',
            connections     TEXT NOT NULL DEFAULT '[]',
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_publications_year
            ON publications (year ASC);

        CREATE INDEX IF NOT EXISTS idx_publications_organism
            ON publications (organism);

        CREATE INDEX IF NOT EXISTS idx_publications_mission
            ON publications (mission);

        CREATE INDEX IF NOT EXISTS idx_publications_experiment_type
            ON publications (experiment_type);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| ExobioError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
