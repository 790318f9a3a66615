pub mod accounts;
pub mod board;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod sessions;

pub use error::{Error, Result};

use rusqlite::{Connection, OpenFlags, Transaction};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DbOptions {
    /// Number of read-only connections next to the single writer.
    pub readers: usize,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            readers: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite store with a reader/writer split: every write goes through the one
/// writer connection, reads are spread round-robin over the readers.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &DbOptions::default())
    }

    pub fn open_with(path: &Path, opts: &DbOptions) -> Result<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(opts.busy_timeout)?;

        migrations::run(&writer)?;

        let count = opts.readers.max(1);
        let mut readers = Vec::with_capacity(count);
        for _ in 0..count {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(opts.busy_timeout)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            count
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx].lock().map_err(|_| Error::Poisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a transaction on the writer. The transaction commits
    /// only if `f` succeeds; any error rolls it back when it is dropped.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.writer.lock().map_err(|_| Error::Poisoned)?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tempfile::TempDir;

    /// Keeps the temp dir alive for as long as the database is in use.
    pub struct TestDb {
        pub db: Database,
        _dir: TempDir,
    }

    impl std::ops::Deref for TestDb {
        type Target = Database;

        fn deref(&self) -> &Database {
            &self.db
        }
    }

    pub fn open() -> TestDb {
        let dir = TempDir::new().unwrap();
        let opts = DbOptions {
            readers: 2,
            ..DbOptions::default()
        };
        let db = Database::open_with(&dir.path().join("test.db"), &opts).unwrap();
        TestDb { db, _dir: dir }
    }
}
