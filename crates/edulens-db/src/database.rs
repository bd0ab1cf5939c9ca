//! The pooled SQLite handle.

use crate::error::{DbError, DbResult};
use crate::migrations;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use tracing::{debug, info};

pub(crate) type PooledConn = PooledConnection<SqliteConnectionManager>;

/// File databases serve the worker pool and the caller at once.
const FILE_POOL_SIZE: u32 = 10;

const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA foreign_keys = ON;
     PRAGMA busy_timeout = 5000;";

/// Storage handle shared by every pipeline component.
///
/// Cloning is cheap and shares the pool. The handle is opened once at
/// process start and closed when the last clone is dropped.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (creating if needed) the database file and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DbError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        info!("Opening database at: {}", path.display());
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch(FILE_PRAGMAS));
        Self::with_manager(manager, FILE_POOL_SIZE)
    }

    /// A private in-memory store, used by tests.
    ///
    /// Every connection to `:memory:` is a separate database, so the pool holds one.
    pub fn open_in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::with_manager(manager, 1)
    }

    fn with_manager(manager: SqliteConnectionManager, max_size: u32) -> DbResult<Self> {
        let pool = Pool::builder().max_size(max_size).build(manager)?;
        migrations::initialize_schema(&*pool.get()?)?;
        debug!(max_size, "Database pool ready");
        Ok(Self { pool })
    }

    /// Borrow a pooled connection.
    ///
    /// Never hold the returned connection across an `.await`: the in-memory
    /// pool has a single connection.
    pub(crate) fn conn(&self) -> DbResult<PooledConn> {
        Ok(self.pool.get()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_has_schema() {
        let db = Database::open_in_memory().unwrap();
        let fk: i64 = db
            .conn()
            .unwrap()
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("edulens.db");
        let db = Database::open(&path).unwrap();

        let mode: String = db
            .conn()
            .unwrap()
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edulens.db");
        Database::open(&path)
            .unwrap()
            .conn()
            .unwrap()
            .execute_batch("CREATE TABLE marker (x INTEGER); INSERT INTO marker VALUES (7);")
            .unwrap();

        let db = Database::open(&path).unwrap();
        let x: i64 = db
            .conn()
            .unwrap()
            .query_row("SELECT x FROM marker", [], |row| row.get(0))
            .unwrap();
        assert_eq!(x, 7);
    }
}
