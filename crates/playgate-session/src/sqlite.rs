//! SQLite-backed [`Archive`].
//!
//! One table, one row per handle:
//!
//! ```sql
//! CREATE TABLE sessions (
//!     handle            TEXT PRIMARY KEY,
//!     external_identity TEXT NOT NULL,
//!     archived_at       INTEGER NOT NULL   -- unix seconds of the last upsert
//! )
//! ```
//!
//! rusqlite is blocking, so every call runs on tokio's blocking pool
//! with the connection behind a `std::sync::Mutex`.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use playgate_protocol::PlayerHandle;
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Archive, SessionError, SessionRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    handle            TEXT PRIMARY KEY,
    external_identity TEXT NOT NULL,
    archived_at       INTEGER NOT NULL
);
";

/// A durable [`Archive`] in a single SQLite file.
#[derive(Clone)]
pub struct SqliteArchive {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteArchive {
    /// Opens (or creates) the database at `path` and ensures the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, SessionError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SessionError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| SessionError::Store("sqlite connection lock poisoned".into()))?;
            f(&guard).map_err(SessionError::from)
        })
        .await
        .map_err(|e| SessionError::Store(format!("sqlite task failed: {e}")))?
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

impl Archive for SqliteArchive {
    async fn upsert(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let handle = record.handle.as_str().to_string();
        let identity = record.external_identity.clone();
        let archived_at = unix_now();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (handle, external_identity, archived_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(handle) DO UPDATE SET
                     external_identity = excluded.external_identity,
                     archived_at = excluded.archived_at",
                params![handle, identity, archived_at],
            )
            .map(|_| ())
        })
        .await
    }

    async fn get(&self, handle: &PlayerHandle) -> Result<Option<SessionRecord>, SessionError> {
        let handle = handle.as_str().to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT handle, external_identity FROM sessions WHERE handle = ?1",
                params![handle],
                |row| {
                    Ok(SessionRecord::new(
                        PlayerHandle::new(row.get::<_, String>(0)?),
                        row.get::<_, String>(1)?,
                    ))
                },
            )
            .optional()
        })
        .await
    }

    async fn scan_all(&self) -> Result<Vec<SessionRecord>, SessionError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT handle, external_identity FROM sessions")?;
            let rows = stmt.query_map([], |row| {
                Ok(SessionRecord::new(
                    PlayerHandle::new(row.get::<_, String>(0)?),
                    row.get::<_, String>(1)?,
                ))
            })?;
            rows.collect()
        })
        .await
    }

    async fn len(&self) -> Result<usize, SessionError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get::<_, i64>(0))
                .map(|n| usize::try_from(n).unwrap_or(0))
        })
        .await
    }
}
