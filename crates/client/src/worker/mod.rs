//! Service worker runtime.
//!
//! ### Lifecycle
//! - `install` opens the precache for the worker's [`CacheVersion`] and
//!   fetches every manifest URL independently. A failed URL is logged and
//!   reported; it never aborts the others or fails the install.
//! - `activate` deletes every cache whose name is not the current precache,
//!   then claims all open pages.
//! - Both run their storage work inside an [`ExtendableEvent`].
//!
//! ### Fetch
//! - [`ServiceWorker::handle_fetch`] classifies the request through the
//!   [`Router`] and always resolves to a [`Response`].

pub mod clients;
pub mod lifetime;
pub mod router;
pub mod strategy;

use futures_util::future::join_all;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use clients::Clients;
pub use lifetime::ExtendableEvent;
pub use router::{Route, Router, Strategy};
pub use strategy::{FetchContext, cache_key};

use crate::fetch::{Network, Request, Response, Url, resolve};
use crate::manifest::PrecacheManifest;
use snipshelf_core::{CacheStorage, CacheVersion, Error};

/// Where a worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// A manifest URL that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cache_name: String,
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of activate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub claimed: usize,
}

/// One version of the worker, bound to the manifest it was built with.
pub struct ServiceWorker {
    version: CacheVersion,
    manifest: PrecacheManifest,
    origin: Url,
    caches: CacheStorage,
    network: Arc<dyn Network>,
    router: Router,
    clients: Clients,
    state: RwLock<WorkerState>,
}

impl ServiceWorker {
    pub fn new(
        version: CacheVersion, manifest: PrecacheManifest, origin: Url, caches: CacheStorage,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            version,
            manifest,
            origin,
            caches,
            network,
            router: Router::default(),
            clients: Clients::new(),
            state: RwLock::new(WorkerState::Parsed),
        }
    }

    /// Share a page registry with other worker versions.
    pub fn with_clients(mut self, clients: Clients) -> Self {
        self.clients = clients;
        self
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn version(&self) -> &CacheVersion {
        &self.version
    }

    pub fn manifest(&self) -> &PrecacheManifest {
        &self.manifest
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    /// Name of this version's precache.
    pub fn cache_name(&self) -> String {
        self.version.cache_name()
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn transition(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        let previous = *state;
        tracing::info!(version = %self.version, from = %previous, to = %next, "worker state changed");
        *state = next;
    }

    /// Retire this worker once a newer version has taken over.
    pub async fn mark_redundant(&self) {
        self.transition(WorkerState::Redundant).await;
    }

    /// Populate this version's precache.
    ///
    /// # Errors
    ///
    /// Only when the precache itself cannot be opened. Individual URL
    /// failures are reported in [`InstallReport::failed`].
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Installing).await;

        let event = ExtendableEvent::new();
        event.wait_until(precache(
            self.caches.clone(),
            Arc::clone(&self.network),
            self.cache_name(),
            self.origin.clone(),
            self.manifest.urls().map(str::to_string).collect(),
        ));
        let outcome = event
            .settle()
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| Ok(InstallReport::default()));

        match outcome {
            Ok(report) => {
                tracing::info!(
                    cache = %report.cache_name,
                    cached = report.cached.len(),
                    failed = report.failed.len(),
                    "install complete"
                );
                self.transition(WorkerState::Installed).await;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("install failed: {}", e);
                self.transition(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Delete every cache but this version's precache and claim open pages.
    ///
    /// Cleanup failures are logged; activation itself always completes.
    pub async fn activate(&self) -> ActivateReport {
        self.transition(WorkerState::Activating).await;

        let event = ExtendableEvent::new();
        event.wait_until(prune(self.caches.clone(), self.cache_name()));
        let deleted = event.settle().await.into_iter().flatten().collect();

        let claimed = self.clients.claim(&self.version).await;
        self.transition(WorkerState::Activated).await;

        ActivateReport { deleted, claimed }
    }

    /// Answer an intercepted request. Never fails.
    pub async fn handle_fetch(&self, request: &Request) -> Response {
        let route = self.router.route(request);
        tracing::debug!("{} {} -> {} ({})", request.method, request.url, route.name, route.strategy);

        let precache = self.cache_name();
        let ctx = FetchContext {
            caches: &self.caches,
            network: self.network.as_ref(),
            precache: &precache,
            origin: &self.origin,
        };

        match route.strategy {
            Strategy::NetworkFirst => strategy::network_first(&ctx, request).await,
            Strategy::CacheFirst => strategy::cache_first(&ctx, request).await,
            Strategy::NetworkOnly => strategy::network_only(&ctx, request).await,
        }
    }
}

async fn precache(
    caches: CacheStorage, network: Arc<dyn Network>, cache_name: String, origin: Url, paths: Vec<String>,
) -> Result<InstallReport, Error> {
    // A reused version name starts from an empty cache.
    if caches.delete(&cache_name).await? {
        tracing::info!("reset existing cache {}", cache_name);
    }
    caches.open_cache(&cache_name).await?;

    let (caches, network, cache_name, origin) = (&caches, network.as_ref(), cache_name.as_str(), &origin);
    let results = join_all(paths.into_iter().map(move |path| async move {
        let result = precache_one(caches, network, cache_name, origin, &path).await;
        (path, result)
    }))
    .await;

    let mut report = InstallReport { cache_name: cache_name.to_string(), ..Default::default() };
    for (url, result) in results {
        match result {
            Ok(()) => report.cached.push(url),
            Err(reason) => {
                tracing::warn!("failed to precache {}: {}", url, reason);
                report.failed.push(PrecacheFailure { url, reason });
            }
        }
    }
    Ok(report)
}

async fn precache_one(
    caches: &CacheStorage, network: &dyn Network, cache_name: &str, origin: &Url, path: &str,
) -> Result<(), String> {
    let url = resolve(origin, path).map_err(|e| e.to_string())?;
    let response = network
        .fetch(&Request::get(url.clone()))
        .await
        .map_err(|e| e.to_string())?;
    if !response.ok() {
        return Err(format!("HTTP {}", response.status));
    }

    caches
        .put(cache_name, &response.to_cached(&url))
        .await
        .map_err(|e| e.to_string())
}

async fn prune(caches: CacheStorage, keep: String) -> Vec<String> {
    let names = match caches.keys().await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("failed to enumerate caches: {}", e);
            return Vec::new();
        }
    };

    let mut deleted = Vec::new();
    for name in names.into_iter().filter(|name| *name != keep) {
        match caches.delete(&name).await {
            Ok(_) => {
                tracing::info!("deleted stale cache {}", name);
                deleted.push(name);
            }
            Err(e) => tracing::warn!("failed to delete cache {}: {}", name, e),
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    const ORIGIN: &str = "https://app.test/";

    /// In-memory network: serves registered paths, 404s the rest, and can be
    /// switched offline.
    #[derive(Default)]
    struct StubNetwork {
        routes: Mutex<HashMap<String, (u16, String)>>,
        unreachable: Mutex<Vec<String>>,
        offline: AtomicBool,
        requests: Mutex<Vec<String>>,
    }

    impl StubNetwork {
        fn serve(&self, path: &str, body: &str) {
            self.routes.lock().unwrap().insert(path.to_string(), (200, body.to_string()));
        }

        fn serve_status(&self, path: &str, status: u16) {
            self.routes.lock().unwrap().insert(path.to_string(), (status, String::new()));
        }

        fn unreachable(&self, path: &str) {
            self.unreachable.lock().unwrap().push(path.to_string());
        }

        fn go_offline(&self) {
            self.offline.store(true, Ordering::SeqCst);
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Network for StubNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            let path = request.url.path().to_string();
            self.requests.lock().unwrap().push(path.clone());

            if self.offline.load(Ordering::SeqCst) || self.unreachable.lock().unwrap().contains(&path) {
                return Err(Error::FetchFailed(format!("unreachable: {path}")));
            }
            let (status, body) = self
                .routes
                .lock()
                .unwrap()
                .get(&path)
                .cloned()
                .unwrap_or((404, String::new()));
            let mut response = Response::new(status, body);
            response.url = Some(request.url.clone());
            Ok(response)
        }
    }

    fn origin() -> Url {
        Url::parse(ORIGIN).unwrap()
    }

    fn url(path: &str) -> Url {
        origin().join(path).unwrap()
    }

    fn manifest(paths: &[&str]) -> PrecacheManifest {
        let json = serde_json::to_string(paths).unwrap();
        PrecacheManifest::from_json(&json).unwrap()
    }

    fn serving(paths: &[&str]) -> Arc<StubNetwork> {
        let network = Arc::new(StubNetwork::default());
        for path in paths {
            network.serve(path, &format!("body of {path}"));
        }
        network
    }

    fn worker(tag: &str, manifest: PrecacheManifest, caches: &CacheStorage, network: &Arc<StubNetwork>) -> ServiceWorker {
        let network: Arc<dyn Network> = network.clone();
        ServiceWorker::new(CacheVersion::new(tag), manifest, origin(), caches.clone(), network)
    }

    fn body(response: &Response) -> &str {
        std::str::from_utf8(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_install_precaches_every_url() {
        let paths = ["/", "/offline.html", "/assets/app.js"];
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&paths);
        let sw = worker("v1", manifest(&paths), &caches, &network);

        assert_eq!(sw.state().await, WorkerState::Parsed);
        let report = sw.install().await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.cache_name, "precache-v1");
        assert_eq!(report.cached.len(), 3);
        assert_eq!(sw.state().await, WorkerState::Installed);

        let stored = caches.urls("precache-v1").await.unwrap();
        assert_eq!(
            stored,
            vec![
                "https://app.test/".to_string(),
                "https://app.test/assets/app.js".to_string(),
                "https://app.test/offline.html".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_install_is_best_effort() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/", "/assets/app.js"]);
        network.unreachable("/assets/big.wasm");
        network.serve_status("/robots.txt", 500);
        let sw = worker("v1", manifest(&["/", "/assets/app.js", "/assets/big.wasm", "/robots.txt"]), &caches, &network);

        let report = sw.install().await.unwrap();

        assert_eq!(sw.state().await, WorkerState::Installed);
        assert_eq!(report.cached.len(), 2);
        let failed: Vec<&str> = report.failed.iter().map(|f| f.url.as_str()).collect();
        assert_eq!(failed, vec!["/assets/big.wasm", "/robots.txt"]);
        assert_eq!(report.failed[1].reason, "HTTP 500");
        assert_eq!(caches.urls("precache-v1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_activate_deletes_other_caches() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        caches.open_cache("precache-v1").await.unwrap();
        caches.open_cache("runtime-images").await.unwrap();
        let network = serving(&["/"]);
        let sw = worker("v2", manifest(&["/"]), &caches, &network);

        sw.install().await.unwrap();
        let report = sw.activate().await;

        assert_eq!(report.deleted, vec!["precache-v1".to_string(), "runtime-images".to_string()]);
        assert_eq!(caches.keys().await.unwrap(), vec!["precache-v2".to_string()]);
        assert_eq!(sw.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_version_cutover_replaces_precache() {
        let m1 = ["/", "/offline.html", "/assets/index-aaaa.js"];
        let m2 = ["/", "/offline.html", "/assets/index-bbbb.js", "/assets/vendor-cccc.js"];
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&[&m1[..], &m2[..]].concat());
        let clients = Clients::new();
        clients.register("tab-1").await;

        let v1 = worker("v1", manifest(&m1), &caches, &network).with_clients(clients.clone());
        v1.install().await.unwrap();
        v1.activate().await;
        assert_eq!(clients.controller("tab-1").await, Some(CacheVersion::new("v1")));

        let v2 = worker("v2", manifest(&m2), &caches, &network).with_clients(clients.clone());
        v2.install().await.unwrap();
        // v1 keeps serving while v2 waits.
        assert_eq!(caches.keys().await.unwrap(), vec!["precache-v1".to_string(), "precache-v2".to_string()]);

        let report = v2.activate().await;
        v1.mark_redundant().await;

        assert_eq!(report.deleted, vec!["precache-v1".to_string()]);
        assert_eq!(report.claimed, 1);
        assert_eq!(caches.keys().await.unwrap(), vec!["precache-v2".to_string()]);
        assert_eq!(v1.state().await, WorkerState::Redundant);
        assert_eq!(clients.controller("tab-1").await, Some(CacheVersion::new("v2")));

        let expected: Vec<String> = {
            let mut urls: Vec<String> = m2.iter().map(|p| url(p).to_string()).collect();
            urls.sort();
            urls
        };
        assert_eq!(caches.urls("precache-v2").await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_reinstall_same_version_drops_old_entries() {
        let m1 = ["/", "/assets/index-aaaa.js"];
        let m2 = ["/", "/assets/index-bbbb.js"];
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&[&m1[..], &m2[..]].concat());

        worker("v1", manifest(&m1), &caches, &network).install().await.unwrap();
        let report = worker("v1", manifest(&m2), &caches, &network).install().await.unwrap();

        assert!(report.is_complete());
        assert_eq!(
            caches.urls("precache-v1").await.unwrap(),
            vec!["https://app.test/".to_string(), "https://app.test/assets/index-bbbb.js".to_string()]
        );
    }

    #[tokio::test]
    async fn test_navigation_online_is_not_cached() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/", "/snippets/42"]);
        let sw = worker("v1", manifest(&["/"]), &caches, &network);
        sw.install().await.unwrap();
        sw.activate().await;

        let response = sw.handle_fetch(&Request::navigate(url("/snippets/42"))).await;

        assert_eq!(response.status, 200);
        assert_eq!(body(&response), "body of /snippets/42");
        assert_eq!(caches.urls("precache-v1").await.unwrap(), vec!["https://app.test/".to_string()]);
    }

    #[tokio::test]
    async fn test_navigation_online_error_status_passes_through() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/"]);
        let sw = worker("v1", manifest(&["/"]), &caches, &network);
        sw.install().await.unwrap();

        let response = sw.handle_fetch(&Request::navigate(url("/missing"))).await;
        assert_eq!(response.status, 404);
        assert!(!response.is_network_error());
    }

    #[tokio::test]
    async fn test_navigation_offline_serves_exact_match() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/", "/offline.html"]);
        let sw = worker("v1", manifest(&["/", "/offline.html"]), &caches, &network);
        sw.install().await.unwrap();
        sw.activate().await;
        network.go_offline();

        let response = sw.handle_fetch(&Request::navigate(url("/offline.html"))).await;
        assert_eq!(body(&response), "body of /offline.html");
    }

    #[tokio::test]
    async fn test_navigation_offline_serves_shell() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/", "/offline.html"]);
        let sw = worker("v1", manifest(&["/", "/offline.html"]), &caches, &network);
        sw.install().await.unwrap();
        sw.activate().await;
        network.go_offline();

        let response = sw.handle_fetch(&Request::navigate(url("/snippets/never-visited"))).await;

        assert_eq!(response.status, 200);
        assert_eq!(body(&response), "body of /");
    }

    #[tokio::test]
    async fn test_navigation_offline_falls_back_to_offline_page() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/offline.html"]);
        network.unreachable("/");
        let sw = worker("v1", manifest(&["/", "/offline.html"]), &caches, &network);
        sw.install().await.unwrap();
        network.go_offline();

        let response = sw.handle_fetch(&Request::navigate(url("/snippets/7"))).await;
        assert_eq!(body(&response), "body of /offline.html");
    }

    #[tokio::test]
    async fn test_navigation_offline_without_cache_is_network_error() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&[]);
        network.go_offline();
        let sw = worker("v1", manifest(&["/"]), &caches, &network);

        let report = sw.install().await.unwrap();
        assert!(report.cached.is_empty());

        let response = sw.handle_fetch(&Request::navigate(url("/snippets/7"))).await;
        assert!(response.is_network_error());
        assert_eq!(response.status, 0);
    }

    #[tokio::test]
    async fn test_static_asset_served_from_precache() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/assets/app.js"]);
        let sw = worker("v1", manifest(&["/assets/app.js"]), &caches, &network);
        sw.install().await.unwrap();
        let before = network.request_count();

        let response = sw.handle_fetch(&Request::get(url("/assets/app.js"))).await;

        assert_eq!(body(&response), "body of /assets/app.js");
        assert_eq!(network.request_count(), before);
    }

    #[tokio::test]
    async fn test_static_asset_miss_is_not_written_back() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/assets/lazy-chunk.js"]);
        let sw = worker("v1", manifest(&[]), &caches, &network);
        sw.install().await.unwrap();

        let response = sw.handle_fetch(&Request::get(url("/assets/lazy-chunk.js"))).await;

        assert_eq!(response.status, 200);
        assert!(caches.urls("precache-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_asset_miss_offline_is_network_error() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&[]);
        let sw = worker("v1", manifest(&[]), &caches, &network);
        sw.install().await.unwrap();
        network.go_offline();

        let response = sw.handle_fetch(&Request::get(url("/assets/lazy-chunk.js"))).await;
        assert!(response.is_network_error());
    }

    #[tokio::test]
    async fn test_static_asset_ignores_stale_versions() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/assets/old.js"]);
        let v1 = worker("v1", manifest(&["/assets/old.js"]), &caches, &network);
        v1.install().await.unwrap();

        let v2 = worker("v2", manifest(&[]), &caches, &network);
        v2.install().await.unwrap();
        network.go_offline();

        let response = v2.handle_fetch(&Request::get(url("/assets/old.js"))).await;
        assert!(response.is_network_error());
    }

    #[tokio::test]
    async fn test_api_passthrough_never_cached() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/api/snippets"]);
        let sw = worker("v1", manifest(&[]), &caches, &network);
        sw.install().await.unwrap();

        let response = sw.handle_fetch(&Request::get(url("/api/snippets"))).await;
        assert_eq!(response.status, 200);
        assert!(caches.urls("precache-v1").await.unwrap().is_empty());

        network.go_offline();
        let response = sw.handle_fetch(&Request::get(url("/api/snippets"))).await;
        assert!(response.is_network_error());
    }

    #[tokio::test]
    async fn test_concurrent_fetches() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let network = serving(&["/", "/assets/app.js", "/api/me"]);
        let sw = worker("v1", manifest(&["/", "/assets/app.js"]), &caches, &network);
        sw.install().await.unwrap();
        sw.activate().await;

        let requests = [
            Request::navigate(url("/")),
            Request::get(url("/assets/app.js")),
            Request::get(url("/api/me")),
        ];
        let responses = join_all(requests.iter().map(|r| sw.handle_fetch(r))).await;

        assert!(responses.iter().all(|r| r.status == 200));
    }
}
