//! Open pages the worker can control.
//!
//! A page loaded before any worker was active starts uncontrolled. Activation
//! claims every open page so the new version serves it without a reload.

use snipshelf_core::CacheVersion;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Registry of open pages and the worker version controlling each.
///
/// Shared between successive workers; cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct Clients {
    inner: Arc<RwLock<HashMap<String, Option<CacheVersion>>>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened page. It stays uncontrolled until the next claim.
    pub async fn register(&self, id: impl Into<String>) {
        self.inner.write().await.entry(id.into()).or_insert(None);
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    /// Take control of every open page, returning how many changed hands.
    pub async fn claim(&self, version: &CacheVersion) -> usize {
        let mut inner = self.inner.write().await;
        let mut claimed = 0;
        for controller in inner.values_mut() {
            if controller.as_ref() != Some(version) {
                *controller = Some(version.clone());
                claimed += 1;
            }
        }
        tracing::debug!(version = %version, claimed, total = inner.len(), "claimed clients");
        claimed
    }

    /// Version controlling the page, if any.
    pub async fn controller(&self, id: &str) -> Option<CacheVersion> {
        self.inner.read().await.get(id).cloned().flatten()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registered_page_starts_uncontrolled() {
        let clients = Clients::new();
        clients.register("tab-1").await;

        assert_eq!(clients.len().await, 1);
        assert_eq!(clients.controller("tab-1").await, None);
    }

    #[tokio::test]
    async fn test_claim_takes_over_all_pages() {
        let clients = Clients::new();
        clients.register("tab-1").await;
        clients.register("tab-2").await;

        let v1 = CacheVersion::new("v1");
        assert_eq!(clients.claim(&v1).await, 2);
        assert_eq!(clients.controller("tab-1").await, Some(v1.clone()));

        // Claiming again with the same version is a no-op.
        assert_eq!(clients.claim(&v1).await, 0);

        let v2 = CacheVersion::new("v2");
        assert_eq!(clients.claim(&v2).await, 2);
        assert_eq!(clients.controller("tab-2").await, Some(v2));
    }

    #[tokio::test]
    async fn test_register_keeps_existing_controller() {
        let clients = Clients::new();
        clients.register("tab-1").await;
        clients.claim(&CacheVersion::new("v1")).await;
        clients.register("tab-1").await;

        assert_eq!(clients.controller("tab-1").await, Some(CacheVersion::new("v1")));
    }

    #[tokio::test]
    async fn test_remove() {
        let clients = Clients::new();
        clients.register("tab-1").await;

        assert!(clients.remove("tab-1").await);
        assert!(!clients.remove("tab-1").await);
        assert!(clients.is_empty().await);
    }
}
