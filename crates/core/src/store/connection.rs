//! Scoped store access.
//!
//! Every logical operation opens its own connection, upgrades the schema to
//! the declared version, runs inside one transaction, and closes the
//! connection before returning, whether the operation succeeded or not.

use super::object_store::{KEY_PATH, ObjectStore, ensure_object_store};
use crate::Error;
use crate::migrations::{self, STORE_MIGRATIONS};
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::TransactionBehavior;

const PRAGMAS: &str = "PRAGMA busy_timeout=5000;
     PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA foreign_keys=ON;";

/// Transaction mode requested for one store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

impl TransactionMode {
    fn behavior(self) -> TransactionBehavior {
        match self {
            TransactionMode::ReadOnly => TransactionBehavior::Deferred,
            TransactionMode::ReadWrite => TransactionBehavior::Immediate,
        }
    }
}

/// A declared offline database: a fixed location and an integer schema version.
///
/// Not a connection. Cloning is cheap and every call to [`Database::with_store`]
/// acquires and releases its own connection.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    version: i64,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>, version: i64) -> Self {
        Self { path: path.into(), version }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Run `operation` against the named object store inside one transaction.
    ///
    /// Opens the database (creating it if absent), runs the upgrade handler
    /// when the declared version exceeds the stored one, ensures the object
    /// store exists with key path `"id"`, and begins a transaction in `mode`.
    /// The transaction commits only if `operation` succeeds. The connection is
    /// closed on every exit path.
    ///
    /// # Errors
    ///
    /// Open, upgrade, transaction and close failures surface as storage
    /// errors; errors returned by `operation` are passed through unchanged
    /// after the transaction is rolled back.
    pub async fn with_store<T, F>(&self, store: &str, mode: TransactionMode, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&ObjectStore<'_>) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Connection::open(&self.path)
            .await
            .map_err(|e| Error::Storage(e.into()))?;

        let store = store.to_string();
        let version = self.version;
        let result = conn
            .call(move |conn| -> Result<T, Error> {
                conn.execute_batch(PRAGMAS)?;
                migrations::upgrade(conn, STORE_MIGRATIONS, Some(version))?;
                ensure_object_store(conn, &store, KEY_PATH)?;

                let tx = conn.transaction_with_behavior(mode.behavior())?;
                let value = operation(&ObjectStore::new(&tx, &store, mode))?;
                tx.commit()?;
                Ok(value)
            })
            .await
            .map_err(Error::from);

        let closed = conn.close().await.map_err(Error::Storage);

        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "failed to close store connection after error");
                }
                Err(e)
            }
        }
    }
}
