//! Worker lifecycle against a live deployment.

use crate::args::{DestinationArg, FetchArgs, ManifestArg, WorkerCommand};
use anyhow::{Context, Result};
use snipshelf_client::fetch::{Destination, FetchConfig, HttpNetwork, Request, parse_origin, resolve};
use snipshelf_client::manifest::PrecacheManifest;
use snipshelf_client::worker::ServiceWorker;
use snipshelf_core::{AppConfig, CacheStorage};
use std::path::Path;
use std::sync::Arc;

pub async fn run(command: WorkerCommand, config: &AppConfig) -> Result<()> {
    let caches = CacheStorage::open(&config.cache_path)
        .await
        .with_context(|| format!("failed to open precache at {}", config.cache_path.display()))?;

    match command {
        WorkerCommand::Install(args) => {
            let worker = load_worker(&args, config, caches).await?;
            let report = worker.install().await?;
            for failure in &report.failed {
                eprintln!("failed: {} ({})", failure.url, failure.reason);
            }
            println!("{}: cached {}, failed {}", report.cache_name, report.cached.len(), report.failed.len());
        }
        WorkerCommand::Activate(args) => {
            let worker = load_worker(&args, config, caches).await?;
            let report = worker.activate().await;
            for name in &report.deleted {
                println!("deleted {name}");
            }
            println!("active: {}", worker.cache_name());
        }
        WorkerCommand::Fetch(args) => fetch(args, config, caches).await?,
        WorkerCommand::Caches => {
            for name in caches.keys().await? {
                println!("{name}\t{}", caches.urls(&name).await?.len());
            }
        }
    }
    Ok(())
}

async fn fetch(args: FetchArgs, config: &AppConfig, caches: CacheStorage) -> Result<()> {
    let worker = load_worker(&args.manifest, config, caches).await?;
    let url = resolve(worker.origin(), &args.path)?;
    let request = if args.navigate {
        Request::navigate(url)
    } else {
        Request::get(url).with_destination(destination(args.destination))
    };

    let response = worker.handle_fetch(&request).await;
    if response.is_network_error() {
        println!("network error");
    } else {
        println!("{} ({} bytes)", response.status, response.body.len());
    }
    if args.body {
        println!("{}", String::from_utf8_lossy(&response.body));
    }
    Ok(())
}

async fn load_worker(args: &ManifestArg, config: &AppConfig, caches: CacheStorage) -> Result<ServiceWorker> {
    let manifest = read_manifest(&args.manifest)?;
    let origin = parse_origin(&config.origin)?;
    let version = config.cache_version(manifest.urls());
    let network = HttpNetwork::new(FetchConfig { user_agent: config.user_agent.clone(), timeout: config.timeout() })?;

    tracing::debug!(version = %version, entries = manifest.len(), "loaded worker");
    Ok(ServiceWorker::new(version, manifest, origin, caches, Arc::new(network)))
}

/// Accepts a JSON array of paths or an emitted worker script.
fn read_manifest(path: &Path) -> Result<PrecacheManifest> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest = match PrecacheManifest::from_json(&source) {
        Ok(manifest) => manifest,
        Err(_) => PrecacheManifest::from_worker_source(&source)?,
    };
    Ok(manifest)
}

fn destination(arg: DestinationArg) -> Destination {
    match arg {
        DestinationArg::Document => Destination::Document,
        DestinationArg::Script => Destination::Script,
        DestinationArg::Style => Destination::Style,
        DestinationArg::Font => Destination::Font,
        DestinationArg::Image => Destination::Image,
        DestinationArg::Manifest => Destination::Manifest,
        DestinationArg::Empty => Destination::Empty,
    }
}
