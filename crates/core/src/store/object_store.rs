//! Object store handle bound to one open transaction.

use super::connection::TransactionMode;
use crate::Error;
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Transaction};

/// Field every record is keyed by.
pub const KEY_PATH: &str = "id";

/// Register an object store if it doesn't exist yet.
pub(crate) fn ensure_object_store(conn: &rusqlite::Connection, name: &str, key_path: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO object_stores (name, key_path) VALUES (?1, ?2)",
        params![name, key_path],
    )?;
    Ok(())
}

/// Key-value access to one object store, valid for the lifetime of the
/// enclosing transaction. Records are JSON objects keyed by their `"id"`.
pub struct ObjectStore<'a> {
    tx: &'a Transaction<'a>,
    name: &'a str,
    mode: TransactionMode,
}

impl<'a> ObjectStore<'a> {
    pub(crate) fn new(tx: &'a Transaction<'a>, name: &'a str, mode: TransactionMode) -> Self {
        Self { tx, name, mode }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    fn require_write(&self, op: &'static str) -> Result<(), Error> {
        match self.mode {
            TransactionMode::ReadWrite => Ok(()),
            TransactionMode::ReadOnly => Err(Error::ReadOnly(op)),
        }
    }

    /// Point lookup by key.
    pub fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let raw: Option<String> = self
            .tx
            .query_row(
                "SELECT value FROM records WHERE store = ?1 AND key = ?2",
                params![self.name, key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }

    /// Full scan, ordered by key.
    pub fn get_all(&self) -> Result<Vec<Value>, Error> {
        let mut stmt = self
            .tx
            .prepare("SELECT value FROM records WHERE store = ?1 ORDER BY key")?;
        let rows = stmt
            .query_map(params![self.name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }

    pub fn count(&self) -> Result<u64, Error> {
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM records WHERE store = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Insert or replace a record, returning its key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` if the value has no non-empty string `"id"`.
    pub fn put(&self, value: &Value) -> Result<String, Error> {
        self.require_write("put")?;

        let key = value
            .get(KEY_PATH)
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::InvalidRecord(format!("record in '{}' has no string '{KEY_PATH}'", self.name)))?
            .to_string();

        self.tx.execute(
            "INSERT INTO records (store, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(store, key) DO UPDATE SET value = excluded.value",
            params![self.name, key, serde_json::to_string(value)?],
        )?;
        Ok(key)
    }

    /// Delete by key. Deleting an absent key is not an error.
    pub fn delete(&self, key: &str) -> Result<(), Error> {
        self.require_write("delete")?;
        self.tx
            .execute("DELETE FROM records WHERE store = ?1 AND key = ?2", params![self.name, key])?;
        Ok(())
    }

    /// Delete every record in this store.
    pub fn clear(&self) -> Result<u64, Error> {
        self.require_write("clear")?;
        let deleted = self
            .tx
            .execute("DELETE FROM records WHERE store = ?1", params![self.name])?;
        Ok(deleted as u64)
    }
}
