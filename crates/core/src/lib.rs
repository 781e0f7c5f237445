//! Core types and shared functionality for snipshelf.
//!
//! This crate provides:
//! - Versioned precache storage with SQLite backend
//! - The offline record store for pinned snippets
//! - Unified error types
//! - Configuration structures
//! - The access-token broadcast

pub mod broadcast;
pub mod cache;
pub mod config;
pub mod error;
pub mod migrations;
pub mod store;

pub use broadcast::{AccessToken, TokenBroadcast, TokenSubscription};
pub use cache::{CacheStorage, CacheVersion, CachedResponse};
pub use config::{AppConfig, Environment};
pub use error::Error;
pub use store::{Database, OfflineStore, OfflineView, SavedSnippet, SnippetPatch};
