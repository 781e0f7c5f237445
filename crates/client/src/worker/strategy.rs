//! The three response strategies.
//!
//! Every branch resolves to a [`Response`]: network failures and cache misses
//! end in [`Response::network_error`] rather than an error value, because a
//! fetch handler that fails leaves the page with nothing at all.

use crate::fetch::{Network, Request, Response, Url, resolve};
use crate::manifest::{OFFLINE_FALLBACK, SHELL_DOCUMENT};
use snipshelf_core::CacheStorage;

/// What a strategy needs from the running worker.
pub struct FetchContext<'a> {
    pub caches: &'a CacheStorage,
    pub network: &'a dyn Network,
    /// Name of the current version's precache.
    pub precache: &'a str,
    pub origin: &'a Url,
}

/// Cache key for a request URL. Fragments never reach the server and are
/// never part of a stored key.
pub fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.to_string()
}

impl FetchContext<'_> {
    async fn from_network(&self, request: &Request) -> Option<Response> {
        match self.network.fetch(request).await {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::debug!("network fetch for {} failed: {}", request.url, e);
                None
            }
        }
    }

    async fn from_precache(&self, url: &str) -> Option<Response> {
        match self.caches.match_url(self.precache, url).await {
            Ok(hit) => hit.map(Response::from_cached),
            Err(e) => {
                tracing::warn!("precache lookup for {} failed: {}", url, e);
                None
            }
        }
    }

    async fn from_any_cache(&self, url: &str) -> Option<Response> {
        match self.caches.match_any(url).await {
            Ok(hit) => hit.map(Response::from_cached),
            Err(e) => {
                tracing::warn!("cache lookup for {} failed: {}", url, e);
                None
            }
        }
    }

    async fn shell(&self, path: &str) -> Option<Response> {
        let url = resolve(self.origin, path).ok()?;
        self.from_precache(url.as_str()).await
    }
}

/// Network, then an exact cache match, then the precached shell document,
/// then the offline page, then a network error.
pub async fn network_first(ctx: &FetchContext<'_>, request: &Request) -> Response {
    if let Some(response) = ctx.from_network(request).await {
        return response;
    }

    let key = cache_key(&request.url);
    if let Some(response) = ctx.from_any_cache(&key).await {
        tracing::debug!("offline: served {} from cache", key);
        return response;
    }
    if let Some(response) = ctx.shell(SHELL_DOCUMENT).await {
        tracing::debug!("offline: served shell for {}", key);
        return response;
    }
    if let Some(response) = ctx.shell(OFFLINE_FALLBACK).await {
        tracing::debug!("offline: served fallback page for {}", key);
        return response;
    }

    tracing::debug!("offline: nothing cached for {}", key);
    Response::network_error()
}

/// Current precache, then network, then a network error.
pub async fn cache_first(ctx: &FetchContext<'_>, request: &Request) -> Response {
    let key = cache_key(&request.url);
    if let Some(response) = ctx.from_precache(&key).await {
        return response;
    }

    ctx.from_network(request)
        .await
        .unwrap_or_else(Response::network_error)
}

/// Network, then a network error. Nothing is read from or written to cache.
pub async fn network_only(ctx: &FetchContext<'_>, request: &Request) -> Response {
    ctx.from_network(request)
        .await
        .unwrap_or_else(Response::network_error)
}
