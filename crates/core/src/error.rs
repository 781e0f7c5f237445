//! Unified error types for snipshelf.
//!
//! Every message starts with a stable upper-case code so callers and logs can
//! classify failures without matching on variants.

use tokio_rusqlite::rusqlite;

/// Unified error type for the offline caching layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty snippet id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A record could not be encoded, decoded, or lacks its key path.
    #[error("INVALID_RECORD: {0}")]
    InvalidRecord(String),

    /// Database open, transaction, or quota failure.
    #[error("STORAGE_ERROR: {0}")]
    Storage(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The stored schema is newer than the version the caller declared.
    #[error("VERSION_ERROR: stored version {stored} is newer than requested {requested}")]
    VersionError { stored: i64, requested: i64 },

    /// A write was attempted through a read-only transaction.
    #[error("READ_ONLY: cannot {0} in a read-only transaction")]
    ReadOnly(&'static str),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Network failure while fetching a resource.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// Mirroring an authoritative result into the offline store failed.
    #[error("SYNC_MIRROR_FAILED: {0}")]
    SyncMirror(String),
}

impl Error {
    /// Whether this error belongs to the storage family (open, transaction,
    /// quota, schema, or record encoding failures).
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Storage(_)
                | Error::MigrationFailed(_)
                | Error::VersionError { .. }
                | Error::ReadOnly(_)
                | Error::InvalidRecord(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Storage(tokio_rusqlite::Error::Close(c)),
            _ => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Storage(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidRecord(err.to_string())
    }
}
