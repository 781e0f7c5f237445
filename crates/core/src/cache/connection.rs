//! Database connection management with pragma configuration.
//!
//! This module handles opening the precache database, applying required
//! pragmas for performance and concurrency (WAL mode), and running migrations.

use crate::Error;
use crate::migrations::{self, CACHE_MIGRATIONS};
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Persistent cache storage handle.
///
/// Holds every named cache for one origin. Wraps a tokio-rusqlite Connection
/// that runs database operations on a background thread; clones share it, so
/// concurrent fetch handlers all observe the same caches.
#[derive(Clone, Debug)]
pub struct CacheStorage {
    pub(crate) conn: Connection,
}

impl CacheStorage {
    /// Open cache storage at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Storage(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open in-memory cache storage for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Storage(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Storage)?;

        migrations::run(&conn, CACHE_MIGRATIONS).await?;

        Ok(Self { conn })
    }
}
