use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use directories::BaseDirs;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{RecordError, Result};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".school-records";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "records.sqlite";
/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the store lives and how hard to try when opening it.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Database file. `None` keeps everything in memory (tests, demos).
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_pool_size() -> usize {
    4
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: default_pool_size(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl StoreConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Resolve the default database location inside the user's home.
pub fn default_db_path() -> anyhow::Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

/// A fixed set of SQLite connections shared by every request. Each call to
/// [`Store::with_conn`] borrows one slot for the duration of its closure.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Pool>,
}

struct Pool {
    slots: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl Store {
    /// Open the store, retrying with a fixed delay instead of failing on the
    /// first error. Every failed attempt is logged.
    pub fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let attempts = config.connect_attempts.max(1);
        let delay = Duration::from_millis(config.retry_delay_ms);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match Self::open(config) {
                Ok(store) => {
                    info!(
                        path = %display_path(config.path.as_deref()),
                        pool_size = store.pool_size(),
                        "record store ready"
                    );
                    return Ok(store);
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %format!("{err:#}"), "failed to open record store");
                    last_error = Some(err);
                    if attempt < attempts {
                        thread::sleep(delay);
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("no connection attempt was made"))
            .context(format!("record store unavailable after {attempts} attempts")))
    }

    /// Single attempt: open every pooled connection, apply the schema, and
    /// verify connectivity.
    pub fn open(config: &StoreConfig) -> anyhow::Result<Self> {
        let slots = match &config.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).context("failed to create data directory")?;
                }
                let size = config.pool_size.max(1);
                let mut slots = Vec::with_capacity(size);
                for _ in 0..size {
                    slots.push(Mutex::new(open_file(path)?));
                }
                slots
            }
            // Each in-memory connection is a separate database, so the pool
            // collapses to one slot.
            None => vec![Mutex::new(open_memory()?)],
        };

        let store = Self {
            inner: Arc::new(Pool {
                slots,
                next: AtomicUsize::new(0),
            }),
        };

        store
            .with_conn(|conn| ensure_schema(conn).map_err(RecordError::from))
            .map_err(anyhow::Error::from)?;
        store.ping().map_err(anyhow::Error::from)?;
        Ok(store)
    }

    /// In-memory store with the schema applied.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::open(&StoreConfig::default())
    }

    pub fn pool_size(&self) -> usize {
        self.inner.slots.len()
    }

    /// Borrow a connection for one query sequence.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.checkout();
        f(&conn)
    }

    /// Take the first idle slot, scanning from a rotating start. Only when
    /// every slot is busy does the caller wait, on the start slot.
    fn checkout(&self) -> MutexGuard<'_, Connection> {
        let slots = &self.inner.slots;
        let start = self.inner.next.fetch_add(1, Ordering::Relaxed) % slots.len();

        for offset in 0..slots.len() {
            match slots[(start + offset) % slots.len()].try_lock() {
                Ok(conn) => return conn,
                // A panic inside a previous closure does not leave the
                // connection in a bad state, so a poisoned slot is still usable.
                Err(TryLockError::Poisoned(poisoned)) => return poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => continue,
            }
        }
        slots[start].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a query sequence on the blocking pool so async handlers never hold
    /// a runtime worker while SQLite works.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.with_conn(f))
            .await
            .context("store task failed to complete")?
    }

    /// Cheap connectivity probe used at startup.
    pub fn ping(&self) -> Result<()> {
        self.with_conn(ping)
    }

    /// Close every pooled connection. Fails if other handles to the store are
    /// still alive.
    pub fn close(self) -> anyhow::Result<()> {
        let pool = match Arc::try_unwrap(self.inner) {
            Ok(pool) => pool,
            Err(_) => bail!("record store is still in use"),
        };

        for slot in pool.slots {
            let conn = slot.into_inner().unwrap_or_else(PoisonError::into_inner);
            conn.close()
                .map_err(|(_, err)| err)
                .context("failed to close connection")?;
        }
        debug!("record store closed");
        Ok(())
    }
}

/// Open a write transaction that takes the write lock up front. A deferred
/// transaction that reads first cannot wait out another writer: SQLite
/// reports the lock upgrade as busy at once, bypassing the busy timeout.
pub fn begin_write(conn: &Connection) -> anyhow::Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .context("failed to begin write transaction")
}

/// `SELECT 1` on one connection; also backs the `/health` endpoint.
pub fn ping(conn: &Connection) -> Result<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .context("store ping failed")?;
    Ok(())
}

fn open_file(path: &Path) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open SQLite database")?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;
    configure(&conn)?;
    Ok(conn)
}

fn open_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    configure(&conn)?;
    Ok(conn)
}

/// Foreign keys are off by default in SQLite and the setting is per
/// connection, so every pooled connection turns them on.
fn configure(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;
    Ok(())
}

/// Create the three tables if they are missing. Enrollments cascade when
/// their student or course is deleted.
pub(crate) fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            address TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create students table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            credits INTEGER,
            instructor TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create courses table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            enrolled_at TEXT NOT NULL,
            UNIQUE (student_id, course_id),
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE,
            FOREIGN KEY(course_id) REFERENCES courses(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create enrollments table")?;

    Ok(())
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_creates_file_and_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.sqlite");
        let config = StoreConfig {
            pool_size: 3,
            ..StoreConfig::at(&path)
        };

        let store = Store::connect(&config).unwrap();
        assert!(path.exists());
        assert_eq!(store.pool_size(), 3);
        store.ping().unwrap();
        store.close().unwrap();
    }

    #[test]
    fn busy_slot_is_skipped_for_an_idle_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&StoreConfig {
            pool_size: 2,
            ..StoreConfig::at(dir.path().join("records.sqlite"))
        })
        .unwrap();

        let held = store.checkout();
        // Both rotations land on the free slot instead of waiting on `held`.
        store.ping().unwrap();
        store.ping().unwrap();
        drop(held);
    }

    #[test]
    fn write_transaction_holds_the_lock_from_the_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.sqlite");
        let store = Store::open(&StoreConfig::at(&path)).unwrap();

        store
            .with_conn(|conn| {
                let _tx = begin_write(conn)?;
                let other = Connection::open(&path).context("failed to open")?;
                other
                    .busy_timeout(Duration::ZERO)
                    .context("failed to set busy timeout")?;
                let err = other
                    .execute_batch("BEGIN IMMEDIATE")
                    .expect_err("second writer should be locked out");
                assert_eq!(err.sqlite_error_code(), Some(rusqlite::ErrorCode::DatabaseBusy));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn memory_store_uses_a_single_slot() {
        let store = Store::connect(&StoreConfig {
            pool_size: 8,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(store.pool_size(), 1);
    }

    #[test]
    fn connect_gives_up_after_configured_attempts() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        // The parent "directory" is a regular file, so every attempt fails.
        let config = StoreConfig {
            connect_attempts: 2,
            retry_delay_ms: 0,
            ..StoreConfig::at(blocker.path().join("records.sqlite"))
        };

        let err = Store::connect(&config).err().unwrap();
        assert!(format!("{err:#}").contains("after 2 attempts"));
    }

    #[test]
    fn close_refuses_while_shared() {
        let store = Store::open_in_memory().unwrap();
        let other = store.clone();
        assert!(store.close().is_err());
        other.ping().unwrap();
    }

    #[test]
    fn schema_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| ensure_schema(conn).map_err(RecordError::from))
            .unwrap();
    }

    #[test]
    fn foreign_keys_are_enabled() {
        let store = Store::open_in_memory().unwrap();
        let enabled: i64 = store
            .with_conn(|conn| {
                Ok(conn
                    .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                    .context("pragma read failed")?)
            })
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
