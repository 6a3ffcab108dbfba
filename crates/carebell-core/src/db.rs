//! SQLite connection helpers shared by the stores.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{CareError, CareResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Open a database file, creating its parent directory if needed.
pub(crate) fn open(path: impl AsRef<Path>) -> CareResult<Connection> {
    let path = path.as_ref();
    if path.as_os_str() == ":memory:" {
        return Ok(Connection::open_in_memory()?);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(path)?)
}

/// Lock a shared connection.
pub(crate) fn lock(conn: &Mutex<Connection>) -> CareResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| CareError::database("connection mutex poisoned"))
}

pub(crate) fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(raw: &str) -> CareResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| CareError::timestamp(format!("bad timestamp '{}': {}", raw, e)))
}
