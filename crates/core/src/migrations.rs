//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.
//! Each migration is a SQL batch that transforms the schema. The offline
//! record store declares a target version, so migrations double as its
//! upgrade handler: they only run when the requested version exceeds the
//! stored one.

use std::num::ParseIntError;

use crate::Error;
use tokio_rusqlite::rusqlite::{self, TransactionBehavior};
use tokio_rusqlite::{Connection, params};

/// A migration list: (version, SQL).
pub type Migrations = &'static [(&'static str, &'static str)];

/// Versioned precache storage schema.
pub const CACHE_MIGRATIONS: Migrations = &[("1", include_str!("../migrations/cache/001_cache_storage.sql"))];

/// Offline record store schema.
pub const STORE_MIGRATIONS: Migrations = &[("1", include_str!("../migrations/store/001_object_stores.sql"))];

/// Run every pending migration in `migrations`.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub async fn run(conn: &Connection, migrations: Migrations) -> Result<(), Error> {
    conn.call(move |conn| upgrade(conn, migrations, None))
        .await
        .map_err(Error::from)
}

/// Bring the schema up to `target` (or to the newest migration when `None`).
///
/// Migrations with a version in `(stored, target]` are applied in order. When
/// the target exceeds the newest migration, the target version is still
/// recorded so later opens see it as current.
///
/// # Errors
///
/// Returns `Error::VersionError` when the stored version is newer than
/// `target`, or a storage error if a migration fails.
pub fn upgrade(conn: &mut rusqlite::Connection, migrations: Migrations, target: Option<i64>) -> Result<(), Error> {
    // Immediate: concurrent openers must not both apply the same version.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current = stored_version(&tx)?;

    if let Some(requested) = target
        && current > requested
    {
        return Err(Error::VersionError { stored: current, requested });
    }

    let mut applied = current;
    for (version, sql) in migrations {
        let version_num: i64 = version
            .parse()
            .map_err(|e: ParseIntError| Error::MigrationFailed(e.to_string()))?;
        if version_num <= current || target.is_some_and(|t| version_num > t) {
            continue;
        }

        tx.execute_batch(sql)
            .map_err(|e| Error::MigrationFailed(format!("version {version_num}: {e}")))?;
        tx.execute(
            "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
            params![version_num, chrono::Utc::now().to_rfc3339()],
        )?;

        tracing::debug!(version = version_num, "applied migration");
        applied = version_num;
    }

    if let Some(requested) = target
        && requested > applied
    {
        tx.execute(
            "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
            params![requested, chrono::Utc::now().to_rfc3339()],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Highest recorded schema version, or 0 for a fresh database.
pub fn stored_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn, CACHE_MIGRATIONS).await.unwrap();
        run(&conn, CACHE_MIGRATIONS).await.unwrap();

        let has_entries: bool = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='cache_entries')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();

        assert!(has_entries);
    }

    #[tokio::test]
    async fn test_migrations_version_tracking() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn, STORE_MIGRATIONS).await.unwrap();

        let count: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0)))
            .await
            .unwrap();

        assert_eq!(count, STORE_MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_upgrade_records_declared_version() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        upgrade(&mut conn, STORE_MIGRATIONS, Some(3)).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 3);

        upgrade(&mut conn, STORE_MIGRATIONS, Some(3)).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 3);
    }

    #[test]
    fn test_upgrade_rejects_downgrade() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        upgrade(&mut conn, STORE_MIGRATIONS, Some(2)).unwrap();

        let result = upgrade(&mut conn, STORE_MIGRATIONS, Some(1));
        assert!(matches!(result, Err(Error::VersionError { stored: 2, requested: 1 })));
    }
}
