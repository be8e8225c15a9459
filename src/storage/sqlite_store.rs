use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tokio::sync::watch;

use super::{Dao, TableVersions, Tables};
use crate::error::{Result, TilError};

pub const TIL_DIR: &str = ".til";
pub const TIL_DB: &str = "til.db";

/// SQLite-backed storage engine.
///
/// Every committed write bumps the counters of the tables it touched and
/// publishes them, so live queries can re-run.
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
    versions: watch::Sender<TableVersions>,
}

impl SqliteStore {
    /// Initialize a new journal under `root`
    pub fn init(root: &Path) -> Result<Self> {
        let til_dir = root.join(TIL_DIR);

        if til_dir.join(TIL_DB).exists() {
            return Err(TilError::AlreadyInitialized);
        }

        fs::create_dir_all(&til_dir)?;
        Self::open_path(&til_dir.join(TIL_DB))
    }

    /// Open an existing journal under `root`
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(TIL_DIR).join(TIL_DB);

        if !path.exists() {
            return Err(TilError::NotInitialized);
        }

        Self::open_path(&path)
    }

    /// Open or create the database file at `path`
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened database");
        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        let (versions, _) = watch::channel(TableVersions::default());
        let store = Self {
            conn,
            path,
            versions,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                color_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS colors (
                id TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS note_categories (
                note_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                PRIMARY KEY (note_id, category_id)
            );

            CREATE INDEX IF NOT EXISTS idx_notes_updated_at ON notes(updated_at);
            CREATE INDEX IF NOT EXISTS idx_note_categories_category ON note_categories(category_id);
            ",
        )?;
        Ok(())
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Subscribe to commit notifications
    pub fn subscribe(&self) -> watch::Receiver<TableVersions> {
        self.versions.subscribe()
    }

    pub fn versions(&self) -> TableVersions {
        *self.versions.borrow()
    }

    /// Run `body` outside an explicit transaction. Each statement commits on
    /// its own; use this for reads and single-statement writes.
    pub fn run<T>(&self, body: impl FnOnce(&Dao<'_>) -> Result<T>) -> Result<T> {
        let dao = Dao::new(&self.conn);
        let result = body(&dao);
        self.publish(dao.touched());
        result
    }

    /// Run `body` inside one transaction. Either every write in `body` is
    /// committed together or, when `body` fails, none of them are.
    /// Nested calls fail with a storage error.
    pub fn transaction<T>(&self, body: impl FnOnce(&Dao<'_>) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let dao = Dao::new(&tx);

        match body(&dao) {
            Ok(value) => {
                let touched = dao.touched();
                tx.commit()?;
                self.publish(touched);
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(error = %e, "rolling back transaction");
                // dropping `tx` rolls back
                Err(e)
            }
        }
    }

    fn publish(&self, touched: Tables) {
        if touched.is_empty() {
            return;
        }
        self.versions.send_modify(|v| v.bump(touched));
        tracing::debug!(versions = ?self.versions(), "committed write");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Category;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_db() {
        let tmp = TempDir::new().unwrap();
        let _store = SqliteStore::init(tmp.path()).unwrap();
        assert!(tmp.path().join(".til/til.db").exists());
    }

    #[test]
    fn test_init_twice_fails() {
        let tmp = TempDir::new().unwrap();
        SqliteStore::init(tmp.path()).unwrap();
        assert!(matches!(SqliteStore::init(tmp.path()), Err(TilError::AlreadyInitialized)));
    }

    #[test]
    fn test_open_without_init_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(SqliteStore::open(tmp.path()), Err(TilError::NotInitialized)));
    }

    #[test]
    fn test_data_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = SqliteStore::init(tmp.path()).unwrap();
            store
                .run(|dao| dao.insert_category(&Category::new("Rust".to_string())))
                .unwrap();
        }
        let store = SqliteStore::open(tmp.path()).unwrap();
        let categories = store.run(|dao| dao.get_all_categories()).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Rust");
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = SqliteStore::open_in_memory().unwrap();

        let result: Result<()> = store.transaction(|dao| {
            dao.insert_category(&Category::new("Rust".to_string()))?;
            Err(TilError::Storage("boom".to_string()))
        });

        assert!(result.is_err());
        assert!(store.run(|dao| dao.get_all_categories()).unwrap().is_empty());
        assert_eq!(store.versions(), TableVersions::default());
    }

    #[test]
    fn test_nested_transaction_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.transaction(|_| store.transaction(|_| Ok(())));
        assert!(matches!(result, Err(TilError::Storage(_))));
    }

    #[test]
    fn test_commit_publishes_versions() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rx = store.subscribe();

        store
            .transaction(|dao| dao.insert_category(&Category::new("Go".to_string())))
            .unwrap();

        let versions = *rx.borrow();
        assert_eq!(versions.categories, 1);
        assert_eq!(
            versions.changed_since(&TableVersions::default()),
            Tables::CATEGORIES
        );
    }

    #[test]
    fn test_reads_do_not_publish() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.run(|dao| dao.get_all_colors()).unwrap();
        assert_eq!(store.versions(), TableVersions::default());
    }
}
