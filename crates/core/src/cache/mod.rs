//! SQLite-backed versioned cache storage for precached responses.
//!
//! This module provides the persistent cache a service worker installs into
//! and serves from, using SQLite with async access via tokio-rusqlite. It
//! supports:
//!
//! - Named caches, one per cache version
//! - Whole-cache deletion for version cutover
//! - Per-cache and cross-cache URL matching
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod version;

pub use crate::Error;

pub use connection::CacheStorage;
pub use entries::CachedResponse;
pub use version::{CacheVersion, PRECACHE_PREFIX};
