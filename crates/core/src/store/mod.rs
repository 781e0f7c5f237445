//! Offline record store.
//!
//! A minimal transactional key-value layer over a per-origin SQLite
//! database, plus the snippet schema built on top of it. Connections are
//! never held between operations: [`Database::with_store`] scopes one
//! connection and one transaction to each call.

pub mod connection;
pub mod object_store;
pub mod snippets;

pub use connection::{Database, TransactionMode};
pub use object_store::{KEY_PATH, ObjectStore};
pub use snippets::{OfflineStore, OfflineView, SNIPPETS_STORE, SavedSnippet, SnippetPatch};
