pub mod filter;
pub mod migrations;
pub mod queries;

use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;

use crate::errors::{AppError, AppResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Locks the shared connection. A poisoned lock means a writer panicked
/// mid-call; SQLite already rolled back its open transaction, so the
/// connection itself is still usable.
pub fn lock(db: &Mutex<Connection>) -> AppResult<MutexGuard<'_, Connection>> {
    match db.lock() {
        Ok(guard) => Ok(guard),
        Err(poisoned) => {
            tracing::warn!("database mutex was poisoned, recovering connection");
            Ok(poisoned.into_inner())
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("invalid stored date: {s}"))
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid stored timestamp: {s}"))
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now().naive_utc())
}

/// Maps a missing row to `NotFound` with the given description.
pub fn required<T>(value: Option<T>, what: impl FnOnce() -> String) -> AppResult<T> {
    value.ok_or_else(|| AppError::NotFound(what()))
}
