//! Request classification as an ordered (predicate, strategy) table.
//!
//! Routes are evaluated top-down; the first matching predicate decides the
//! strategy. The table is plain data so it can be tested without a worker.

use crate::fetch::{Destination, Request};
use reqwest::Method;
use std::fmt;

/// Path prefix the bundler emits hashed assets under.
pub const ASSET_PREFIX: &str = "/assets/";

/// Root files served as static assets.
pub const ROOT_FILES: &[&str] = &[
    "/manifest.webmanifest",
    "/robots.txt",
    "/favicon.ico",
    "/favicon.svg",
    "/apple-touch-icon.png",
];

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Network, falling back to cached copies and then a synthetic error.
    NetworkFirst,
    /// Versioned precache, falling back to the network.
    CacheFirst,
    /// Straight to the network; failures become a synthetic error.
    NetworkOnly,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::NetworkFirst => write!(f, "network-first"),
            Strategy::CacheFirst => write!(f, "cache-first"),
            Strategy::NetworkOnly => write!(f, "network-only"),
        }
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub name: &'static str,
    pub matches: fn(&Request) -> bool,
    pub strategy: Strategy,
}

/// Ordered routing table.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

/// Strategy used when no route matches.
const UNMATCHED: Route = Route { name: "unmatched", matches: |_| true, strategy: Strategy::NetworkOnly };

impl Default for Router {
    /// Navigation → network-first, static assets → cache-first, anything
    /// else → network-only.
    fn default() -> Self {
        Self::new(vec![
            Route { name: "navigation", matches: is_navigation, strategy: Strategy::NetworkFirst },
            Route { name: "static-asset", matches: is_static_asset, strategy: Strategy::CacheFirst },
            Route { name: "passthrough", matches: |_| true, strategy: Strategy::NetworkOnly },
        ])
    }
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route whose predicate matches. Requests no route claims are
    /// passed through to the network.
    pub fn route(&self, request: &Request) -> &Route {
        self.routes
            .iter()
            .find(|route| (route.matches)(request))
            .unwrap_or(&UNMATCHED)
    }
}

/// Full-page document loads.
pub fn is_navigation(request: &Request) -> bool {
    request.is_navigation() && request.method == Method::GET
}

/// Build assets, well-known root files, and subresources the page loads as
/// script, style, font, image, or manifest.
pub fn is_static_asset(request: &Request) -> bool {
    if request.method != Method::GET {
        return false;
    }

    let path = request.url.path();
    path.starts_with(ASSET_PREFIX)
        || path.starts_with("/icons/")
        || ROOT_FILES.contains(&path)
        || matches!(
            request.destination,
            Destination::Script | Destination::Style | Destination::Font | Destination::Image | Destination::Manifest
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn url(path: &str) -> Url {
        Url::parse("https://app.test").unwrap().join(path).unwrap()
    }

    fn strategy(request: &Request) -> Strategy {
        Router::default().route(request).strategy
    }

    #[test]
    fn test_navigation_is_network_first() {
        let request = Request::navigate(url("/snippets/42"));
        assert_eq!(strategy(&request), Strategy::NetworkFirst);
        assert_eq!(Router::default().route(&request).name, "navigation");
    }

    #[test]
    fn test_navigation_wins_over_asset_path() {
        // Order matters: a navigation to an asset path is still a navigation.
        let request = Request::navigate(url("/assets/report.html"));
        assert_eq!(strategy(&request), Strategy::NetworkFirst);
    }

    #[test]
    fn test_asset_prefix_is_cache_first() {
        let request = Request::get(url("/assets/index-4f2a.js"));
        assert_eq!(strategy(&request), Strategy::CacheFirst);
    }

    #[test]
    fn test_root_files_are_cache_first() {
        for path in ["/robots.txt", "/manifest.webmanifest", "/icons/icon-192.png"] {
            assert_eq!(strategy(&Request::get(url(path))), Strategy::CacheFirst, "{path}");
        }
    }

    #[test]
    fn test_destinations_are_cache_first() {
        for destination in [
            Destination::Script,
            Destination::Style,
            Destination::Font,
            Destination::Image,
            Destination::Manifest,
        ] {
            let request = Request::get(url("/cdn/thing")).with_destination(destination);
            assert_eq!(strategy(&request), Strategy::CacheFirst, "{destination:?}");
        }
    }

    #[test]
    fn test_api_calls_are_network_only() {
        let read = Request::get(url("/api/snippets/42"));
        let write = Request::get(url("/api/snippets/42"))
            .with_method(Method::PATCH)
            .with_body("{}");
        assert_eq!(strategy(&read), Strategy::NetworkOnly);
        assert_eq!(strategy(&write), Strategy::NetworkOnly);
    }

    #[test]
    fn test_mutation_on_asset_path_is_network_only() {
        let request = Request::get(url("/assets/upload")).with_method(Method::POST);
        assert_eq!(strategy(&request), Strategy::NetworkOnly);
    }

    #[test]
    fn test_empty_table_passes_through() {
        let router = Router::new(Vec::new());
        let route = router.route(&Request::navigate(url("/")));
        assert_eq!(route.strategy, Strategy::NetworkOnly);
        assert_eq!(route.name, "unmatched");
    }

    #[test]
    fn test_custom_table_order() {
        let router = Router::new(vec![
            Route { name: "everything-cached", matches: |_| true, strategy: Strategy::CacheFirst },
            Route { name: "navigation", matches: is_navigation, strategy: Strategy::NetworkFirst },
        ]);
        assert_eq!(router.route(&Request::navigate(url("/"))).strategy, Strategy::CacheFirst);
    }
}
