#![forbid(unsafe_code)]
//! SQLite persistence for Lugline.
//!
//! One connection behind a mutex, accessed from async code through a
//! `spawn_blocking` wrapper. Callers never see rusqlite types; rows come back
//! as `lugline-model` values.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

mod deliveries;
mod error;
mod notifications;
mod schema;
mod sessions;
mod users;

pub use error::{Result, StoreError};
pub use schema::CREATE_TABLES_SQL;

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and applies the
    /// schema. WAL + foreign keys + a 5s busy timeout, same as every other
    /// writer in this codebase would expect.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        conn.execute("PRAGMA foreign_keys=ON;", [])?;
        conn.execute_batch(CREATE_TABLES_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("connection mutex poisoned: {e}")))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

pub(crate) fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {ms}")))
}

pub(crate) fn opt_millis(t: Option<DateTime<Utc>>) -> Option<i64> {
    t.map(to_millis)
}

pub(crate) fn opt_from_millis(ms: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    ms.map(from_millis).transpose()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Store;
    use tempfile::TempDir;

    /// A store over a throwaway on-disk database. The TempDir must outlive
    /// the store or SQLite loses its file.
    pub fn temp_store() -> (Store, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path().join("lugline-test.sqlite3")).expect("open store");
        (store, dir)
    }
}
