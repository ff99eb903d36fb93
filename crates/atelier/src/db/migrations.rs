//! Schema migrations.
//!
//! Each migration is one embedded SQL file. Applied versions are recorded in
//! `_migrations`, and only versions above the highest recorded one run, each
//! inside its own transaction.

use rusqlite::Connection;

use super::error::DatabaseError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_commissions_table",
        sql: include_str!("sql/001_create_commissions.sql"),
    },
    Migration {
        version: 2,
        description: "create_visual_assets_table",
        sql: include_str!("sql/002_create_visual_assets.sql"),
    },
    Migration {
        version: 3,
        description: "create_site_status_tables",
        sql: include_str!("sql/003_create_site_status.sql"),
    },
    Migration {
        version: 4,
        description: "create_goals_table",
        sql: include_str!("sql/004_create_goals.sql"),
    },
    Migration {
        version: 5,
        description: "create_commission_catalog_tables",
        sql: include_str!("sql/005_create_commission_catalog.sql"),
    },
];

/// Brings the schema up to the latest version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );
        apply(conn, migration).map_err(|source| DatabaseError::Migration {
            version: migration.version,
            description: migration.description,
            source,
        })?;
    }

    Ok(())
}

/// The schema change and its `_migrations` record commit together.
fn apply(conn: &Connection, migration: &Migration) -> Result<(), rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.description],
    )?;
    tx.commit()
}
