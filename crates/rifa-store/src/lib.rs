// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! SQLite persistence for the raffle catalog, the number ledger and the
//! receipt lifecycle. All methods are synchronous; async callers hop through
//! `spawn_blocking`. One connection, serialized behind a mutex — uniqueness
//! is still enforced by the schema's UNIQUE constraint so a second process
//! on the same database file cannot violate it either.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

mod error;
mod ledger;
mod raffles;
mod receipts;
mod schema;

pub use error::StoreError;
pub use receipts::NewReservation;

pub const CRATE_NAME: &str = "rifa-store";

#[derive(Clone)]
pub struct RaffleStore {
    conn: Arc<Mutex<Connection>>,
}

impl RaffleStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Internal(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Private scratch database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(std::time::Duration::from_millis(5000))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Internal("store mutex poisoned".to_string()))
    }

    /// Readiness probe.
    pub fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 UTC so timestamp comparisons in SQL text columns are
/// chronological.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::Internal(format!("invalid stored timestamp {raw:?}: {e}")))
}
