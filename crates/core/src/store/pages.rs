//! Page CRUD operations.
//!
//! Every method runs in a single scoped transaction on the store's
//! connection thread. The transaction rolls back when dropped, so an
//! early return through `?` never commits a partial write.

use super::connection::PageStore;
use crate::Error;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row, types::Type};

/// Largest page size `list` will return in one call.
pub const MAX_LIST_LIMIT: u32 = 1000;

const PAGE_COLUMNS: &str = "id, url, title, content, scraped_at, last_accessed";

/// A cached web page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl Page {
    /// Whether the stored copy is good enough to serve without a synchronous fetch.
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Page {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            scraped_at: parse_timestamp(row, 4)?,
            last_accessed: parse_timestamp(row, 5)?,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Unicode-aware case-insensitive substring test. `needle` is already lowercased.
fn contains_folded(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|text| text.to_lowercase().contains(needle))
}

fn select_by_url(conn: &rusqlite::Connection, url: &str) -> rusqlite::Result<Option<Page>> {
    conn.query_row(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE url = ?1"), params![url], Page::from_row)
        .optional()
}

fn select_by_id(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<Page>> {
    conn.query_row(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?1"), params![id], Page::from_row)
        .optional()
}

impl PageStore {
    /// Get a page by URL.
    ///
    /// Returns None if the URL has never been fetched.
    pub async fn find_by_url(&self, url: &str) -> Result<Option<Page>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Page>, Error> {
                let tx = conn.transaction()?;
                let page = select_by_url(&tx, &url)?;
                tx.commit()?;
                Ok(page)
            })
            .await
            .map_err(Error::from)
    }

    /// Get a page by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Page>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<Page>, Error> {
                let tx = conn.transaction()?;
                let page = select_by_id(&tx, id)?;
                tx.commit()?;
                Ok(page)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or update a page by URL.
    ///
    /// Uses UPSERT semantics on the unique `url` column: a new row gets
    /// `scraped_at = last_accessed = now`; an existing row has its title and
    /// content overwritten and `last_accessed` bumped, keeping its id and
    /// `scraped_at`. Returns the row as written.
    pub async fn upsert(&self, url: &str, title: &str, content: &str) -> Result<Page, Error> {
        let url = url.to_string();
        let title = title.to_string();
        let content = content.to_string();
        let now = format_timestamp(&Utc::now());

        self.conn
            .call(move |conn| -> Result<Page, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO pages (url, title, content, scraped_at, last_accessed)
                    VALUES (?1, ?2, ?3, ?4, ?4)
                    ON CONFLICT(url) DO UPDATE SET
                        title = excluded.title,
                        content = excluded.content,
                        last_accessed = MAX(pages.last_accessed, excluded.last_accessed)",
                    params![url, title, content, now],
                )?;
                let page = select_by_url(&tx, &url)?.ok_or_else(|| Error::NotFound(url.clone()))?;
                tx.commit()?;
                Ok(page)
            })
            .await
            .map_err(Error::from)
    }

    /// Bump `last_accessed` without touching content.
    ///
    /// Returns the updated row, or None (and changes nothing) if the id is unknown.
    pub async fn touch_access(&self, id: i64) -> Result<Option<Page>, Error> {
        let now = format_timestamp(&Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<Page>, Error> {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    "UPDATE pages SET last_accessed = MAX(last_accessed, ?2) WHERE id = ?1",
                    params![id, now],
                )?;
                if updated == 0 {
                    return Ok(None);
                }
                let page = select_by_id(&tx, id)?;
                tx.commit()?;
                Ok(page)
            })
            .await
            .map_err(Error::from)
    }

    /// List pages in insertion order.
    ///
    /// `limit` is clamped to [`MAX_LIST_LIMIT`].
    pub async fn list(&self, offset: u32, limit: u32) -> Result<Vec<Page>, Error> {
        let limit = limit.min(MAX_LIST_LIMIT);
        self.conn
            .call(move |conn| -> Result<Vec<Page>, Error> {
                let tx = conn.transaction()?;
                let pages = {
                    let mut stmt =
                        tx.prepare(&format!("SELECT {PAGE_COLUMNS} FROM pages ORDER BY id LIMIT ?1 OFFSET ?2"))?;
                    stmt.query_map(params![limit, offset], Page::from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                };
                tx.commit()?;
                Ok(pages)
            })
            .await
            .map_err(Error::from)
    }

    /// Case-insensitive substring search over title and content.
    ///
    /// An empty query matches nothing and never reaches the database.
    pub async fn search(&self, query: &str) -> Result<Vec<Page>, Error> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        // SQLite's LIKE only folds ASCII, so rows are matched here instead.
        let needle = query.to_lowercase();
        self.conn
            .call(move |conn| -> Result<Vec<Page>, Error> {
                let tx = conn.transaction()?;
                let pages = {
                    let mut stmt = tx.prepare(&format!("SELECT {PAGE_COLUMNS} FROM pages ORDER BY id"))?;
                    let mut rows = stmt.query([])?;
                    let mut found = Vec::new();
                    while let Some(row) = rows.next()? {
                        let page = Page::from_row(row)?;
                        if contains_folded(page.title.as_deref(), &needle)
                            || contains_folded(page.content.as_deref(), &needle)
                        {
                            found.push(page);
                        }
                    }
                    found
                };
                tx.commit()?;
                Ok(pages)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a page by id. Maintenance only; the cache never deletes.
    ///
    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                let deleted = tx.execute("DELETE FROM pages WHERE id = ?1", params![id])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
