//! Startup schema evolution
//!
//! The record shape grew after initial deployment; dropping and
//! recreating tables would lose production data, so missing columns are
//! added in place with `ALTER TABLE`. The helper is idempotent and
//! best-effort: one failed column does not stop the rest, and a file
//! that cannot be opened only produces a warning.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, Row, SqliteConnection};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Columns that may be absent from databases created by earlier
/// releases, with the type and default to add them with.
const REQUIRED_COLUMNS: &[(&str, &str, &str, &str)] = &[
    ("user", "force_password_change", "INTEGER", "0"),
    ("clamp_data", "amount_paid", "REAL", "0.0"),
    ("clamp_data", "image_filename", "TEXT", "''"),
    ("clamp_data", "time_called", "TEXT", "''"),
    ("clamp_data", "car_type", "TEXT", "''"),
    ("clamp_data", "color", "TEXT", "''"),
    ("clamp_data", "clamp_ref", "TEXT", "''"),
];

/// Probe the candidate database files in order and evolve the first one
/// that exists and needed changes. Files that exist but are already
/// current fall through to the next candidate; missing files are simply
/// skipped (the database has not been initialized yet).
pub async fn ensure_schema_columns(candidates: &[PathBuf]) {
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match migrate_file(path).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => {
                warn!(
                    "Migration warning for {}: could not ensure schema columns: {err}",
                    path.display()
                );
            }
        }
    }
}

/// Add any missing columns to one database file. Returns whether at
/// least one column was added.
async fn migrate_file(path: &Path) -> Result<bool, sqlx::Error> {
    let mut conn: SqliteConnection = SqliteConnectOptions::new()
        .filename(path)
        .connect()
        .await?;
    let mut migrated_any = false;

    for (table, column, col_type, default) in REQUIRED_COLUMNS {
        let rows = match sqlx::query(&format!("PRAGMA table_info('{table}')"))
            .fetch_all(&mut conn)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!("Migration: could not inspect table {table}: {err}");
                continue;
            }
        };
        // An empty result means the table does not exist in this file.
        if rows.is_empty() {
            continue;
        }
        let present = rows
            .iter()
            .any(|row| row.get::<String, _>("name") == *column);
        if present {
            continue;
        }

        let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {col_type} DEFAULT {default}");
        match sqlx::query(&sql).execute(&mut conn).await {
            Ok(_) => {
                migrated_any = true;
                info!(
                    "Migration: added column {column} to {table} in {}",
                    path.display()
                );
            }
            Err(err) => {
                warn!("Migration: could not add column {table}.{column}: {err}");
            }
        }
    }

    conn.close().await.ok();
    Ok(migrated_any)
}
