//! Named cache operations.
//!
//! Mirrors the Cache Storage surface a service worker sees: open, enumerate,
//! delete whole caches, and put/match request URLs inside one cache.

use super::connection::CacheStorage;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response, keyed by request URL inside one named cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedResponse {
    pub fn new(url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { url: url.into(), status, headers, body, stored_at: chrono::Utc::now().to_rfc3339() }
    }
}

fn row_to_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, u16, String, Vec<u8>, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode(raw: (String, u16, String, Vec<u8>, String)) -> Result<CachedResponse, Error> {
    let (url, status, headers_json, body, stored_at) = raw;
    let headers = serde_json::from_str(&headers_json)?;
    Ok(CachedResponse { url, status, headers, body, stored_at })
}

impl CacheStorage {
    /// Open a named cache, creating it if it doesn't exist.
    pub async fn open_cache(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check if a named cache exists.
    pub async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All cache names, oldest first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a named cache and all of its entries.
    ///
    /// Returns false if no cache with that name existed.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response under its request URL in the named cache.
    ///
    /// Creates the cache if needed and replaces any previous entry for the URL.
    pub async fn put(&self, name: &str, response: &CachedResponse) -> Result<(), Error> {
        let name = name.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (cache_name, url, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(cache_name, url) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![name, response.url, response.status, headers_json, response.body, response.stored_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request URL in one named cache.
    pub async fn match_url(&self, name: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let name = name.to_string();
        let url = url.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<_>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, headers_json, body, stored_at
                    FROM cache_entries WHERE cache_name = ?1 AND url = ?2",
                    params![name, url],
                    row_to_response,
                );

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(decode).transpose()
    }

    /// Look up a request URL across every cache, oldest cache first.
    pub async fn match_any(&self, url: &str) -> Result<Option<CachedResponse>, Error> {
        let url = url.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<_>, Error> {
                let result = conn.query_row(
                    "SELECT e.url, e.status, e.headers_json, e.body, e.stored_at
                    FROM cache_entries e JOIN caches c ON c.name = e.cache_name
                    WHERE e.url = ?1
                    ORDER BY c.created_at ASC, c.rowid ASC
                    LIMIT 1",
                    params![url],
                    row_to_response,
                );

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(decode).transpose()
    }

    /// Request URLs stored in the named cache, sorted.
    pub async fn urls(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE cache_name = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
