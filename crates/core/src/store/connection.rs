//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations.

use super::migrations;
use crate::Error;
use std::path::PathBuf;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA busy_timeout=5000;
     PRAGMA foreign_keys=ON;";

/// Where the page table lives, parsed from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Private in-memory database, gone when the last handle drops.
    Memory,
    /// SQLite database file, created on first open.
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parse a connection string.
    ///
    /// Accepted forms: `sqlite://<path>`, `sqlite:<path>`, `sqlite::memory:`,
    /// `:memory:` and a bare filesystem path. Any other `scheme://` is
    /// rejected with a human-readable reason.
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err("must not be empty".into());
        }

        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);

        if path == ":memory:" {
            return Ok(Self::Memory);
        }

        if let Some((scheme, _)) = path.split_once("://") {
            return Err(format!("unsupported scheme: {scheme}"));
        }

        if path.is_empty() {
            return Err("missing database path".into());
        }

        Ok(Self::File(PathBuf::from(path)))
    }
}

/// Page store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the same connection; use
/// [`PageStore::detached`] for an independent one.
#[derive(Clone, Debug)]
pub struct PageStore {
    pub(crate) conn: Connection,
    location: DatabaseLocation,
}

impl PageStore {
    /// Open the store at the given location.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(location: &DatabaseLocation) -> Result<Self, Error> {
        let conn = match location {
            DatabaseLocation::Memory => Connection::open_in_memory().await,
            DatabaseLocation::File(path) => Connection::open(path).await,
        }
        .map_err(|e| Error::Database(e.into()))?;

        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        tracing::debug!(location = ?location, "page store opened");

        Ok(Self { conn, location: location.clone() })
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        Self::open(&DatabaseLocation::Memory).await
    }

    /// Open a second handle whose lifetime is independent of this one.
    ///
    /// File databases get a fresh connection (WAL lets both write). An
    /// in-memory database is private to its connection, so the handle is
    /// shared instead.
    pub async fn detached(&self) -> Result<Self, Error> {
        match &self.location {
            DatabaseLocation::File(_) => Self::open(&self.location).await,
            DatabaseLocation::Memory => Ok(self.clone()),
        }
    }

    /// Close the connection, finishing any queued calls first.
    ///
    /// Clones that share it fail with a database error from then on.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await.map_err(Error::Database)
    }

    /// Cheap liveness probe used by the health endpoint.
    pub async fn ping(&self) -> Result<(), Error> {
        self.conn
            .call(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = PageStore::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_fails_shared_handles() {
        let db = PageStore::open_in_memory().await.unwrap();
        let shared = db.clone();
        db.close().await.unwrap();

        assert!(matches!(shared.ping().await, Err(Error::Database(_))));
        assert!(matches!(shared.find_by_url("https://example.com").await, Err(Error::Database(_))));
    }

    #[test]
    fn test_parse_locations() {
        assert_eq!(DatabaseLocation::parse(":memory:").unwrap(), DatabaseLocation::Memory);
        assert_eq!(DatabaseLocation::parse("sqlite::memory:").unwrap(), DatabaseLocation::Memory);
        assert_eq!(
            DatabaseLocation::parse("sqlite://data/pages.db").unwrap(),
            DatabaseLocation::File("data/pages.db".into())
        );
        assert_eq!(
            DatabaseLocation::parse("/var/lib/pages.db").unwrap(),
            DatabaseLocation::File("/var/lib/pages.db".into())
        );
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = DatabaseLocation::parse("postgresql://postgres@localhost/webscraper").unwrap_err();
        assert!(err.contains("postgresql"));
        assert!(DatabaseLocation::parse("").is_err());
        assert!(DatabaseLocation::parse("sqlite://").is_err());
    }

    #[tokio::test]
    async fn test_detached_file_store_sees_same_rows() {
        let dir = std::env::temp_dir().join(format!("scrapecache-detached-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let location = DatabaseLocation::File(dir.join("pages.sqlite"));

        let store = PageStore::open(&location).await.unwrap();
        let other = store.detached().await.unwrap();

        let written = other.upsert("https://example.com", "Example", "body").await.unwrap();
        let read = store.find_by_url("https://example.com").await.unwrap().unwrap();
        assert_eq!(read.id, written.id);

        drop(store);
        drop(other);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
