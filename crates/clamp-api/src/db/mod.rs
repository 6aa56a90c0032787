//! SQLite persistence: pool setup, base schema, bootstrap admin

pub mod migrate;
pub mod schema;

use crate::error::ApiError;
use clamp_core::PasswordScheme;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::warn;

/// Username of the protected bootstrap account.
pub const BOOTSTRAP_ADMIN: &str = "admin";

pub async fn connect(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Non-destructive base schema. Pre-existing databases are reshaped by
/// the evolution helper before this runs.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS clamp_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            location TEXT NOT NULL,
            registration TEXT,
            clamp_date DATE NOT NULL,
            time_in TIME NOT NULL,
            time_called TIME,
            time_released TIME,
            car_type TEXT,
            color TEXT,
            clamp_ref TEXT,
            image_filename TEXT,
            offense TEXT NOT NULL,
            payment_status TEXT DEFAULT 'Processing',
            amount_paid REAL DEFAULT 0.0,
            created_at DATETIME
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS appeal (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            clamp_id INTEGER NOT NULL REFERENCES clamp_data(id),
            appeal_date DATE NOT NULL,
            appeal_reason TEXT NOT NULL,
            appeal_status TEXT DEFAULT 'Pending',
            notes TEXT,
            created_at DATETIME
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_admin INTEGER DEFAULT 0,
            force_password_change INTEGER DEFAULT 0,
            created_at DATETIME
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the `admin` account on first startup if it does not exist.
///
/// An operator-supplied credential is used verbatim; otherwise the
/// account gets the insecure fallback password and must change it on
/// first login.
pub async fn ensure_bootstrap_admin(
    pool: &SqlitePool,
    passwords: &dyn PasswordScheme,
    configured_password: Option<&str>,
) -> Result<(), ApiError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM user WHERE username = ?1")
        .bind(BOOTSTRAP_ADMIN)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let (password, force_change) = match configured_password {
        Some(pw) => (pw, false),
        None => {
            warn!("DEFAULT_ADMIN_PASSWORD not set; bootstrap admin uses the fallback password");
            warn!("The fallback password is insecure and must be changed at first login");
            (BOOTSTRAP_ADMIN, true)
        }
    };
    let digest = passwords.hash_password(password)?;

    sqlx::query(
        "INSERT INTO user (username, password_hash, is_admin, force_password_change, created_at)
         VALUES (?1, ?2, 1, ?3, ?4)",
    )
    .bind(BOOTSTRAP_ADMIN)
    .bind(digest)
    .bind(force_change)
    .bind(chrono::Utc::now().naive_utc())
    .execute(pool)
    .await?;

    Ok(())
}
