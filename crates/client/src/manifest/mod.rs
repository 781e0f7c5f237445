//! Precache manifest builder.
//!
//! Runs once per build, after bundling finalizes. Collects the deployed path
//! of every emitted output plus the fixed app-shell list into a deduplicated
//! set, and hands it to [`inject`] to be frozen into the worker source.

pub mod dist;
pub mod inject;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use dist::scan_dist;
pub use inject::{BuildWarning, Injection, PLACEHOLDER, WORKER_FILE_NAME, WorkerArtifact, inject};

/// Shell resources precached on every build, whether or not the bundler
/// emitted them: root document, offline fallback, icons, web app manifest,
/// robots file.
pub const SHELL_URLS: &[&str] = &[
    "/",
    "/offline.html",
    "/icons/icon-192.png",
    "/icons/icon-512.png",
    "/manifest.webmanifest",
    "/robots.txt",
];

/// Root document served when a navigation cannot reach the network.
pub const SHELL_DOCUMENT: &str = "/";

/// Offline fallback page.
pub const OFFLINE_FALLBACK: &str = "/offline.html";

/// Errors raised while assembling a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest literal: {0}")]
    InvalidLiteral(String),
}

/// Kind of bundler output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Compiled code (scripts, stylesheets).
    Chunk,
    /// Everything else the bundler copied or emitted.
    Asset,
}

/// One finalized bundler output, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    pub file_name: String,
    pub kind: OutputKind,
}

impl OutputDescriptor {
    pub fn new(file_name: impl Into<String>, kind: OutputKind) -> Self {
        Self { file_name: file_name.into(), kind }
    }

    /// Path the output is served at under `base`.
    pub fn deployed_path(&self, base: &str) -> String {
        under_base(base, &self.file_name)
    }
}

fn under_base(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Immutable, deduplicated set of URL paths to precache.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecacheManifest {
    urls: BTreeSet<String>,
}

impl PrecacheManifest {
    /// Build the manifest for one set of bundler outputs.
    ///
    /// Shell paths are placed under `base` like the outputs. The worker
    /// script itself is never precached: it is fetched by the host at its
    /// stable URL.
    pub fn build(outputs: &[OutputDescriptor], base: &str) -> Self {
        let mut urls: BTreeSet<String> = SHELL_URLS.iter().map(|shell| under_base(base, shell)).collect();
        for output in outputs {
            if output.file_name.trim_start_matches('/') == WORKER_FILE_NAME {
                continue;
            }
            urls.insert(output.deployed_path(base));
        }

        tracing::debug!(entries = urls.len(), outputs = outputs.len(), "built precache manifest");
        Self { urls }
    }

    /// Parse the string-literal form [`inject`] embeds in the worker, i.e. a
    /// JSON string whose content is a JSON array of paths.
    pub fn from_embedded(literal: &str) -> Result<Self, ManifestError> {
        let json: String =
            serde_json::from_str(literal.trim()).map_err(|e| ManifestError::InvalidLiteral(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Recover the manifest from an emitted worker script by locating the
    /// embedded literal.
    pub fn from_worker_source(source: &str) -> Result<Self, ManifestError> {
        for (start, _) in source.match_indices("\"[") {
            let mut literals = serde_json::Deserializer::from_str(&source[start..]).into_iter::<String>();
            if let Some(Ok(json)) = literals.next()
                && let Ok(manifest) = Self::from_json(&json)
            {
                return Ok(manifest);
            }
        }
        Err(ManifestError::InvalidLiteral("no embedded manifest in worker source".into()))
    }

    /// Parse a plain JSON array of paths.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let urls: Vec<String> = serde_json::from_str(json).map_err(|e| ManifestError::InvalidLiteral(e.to_string()))?;
        Ok(Self { urls: urls.into_iter().collect() })
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// JSON array of paths.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.urls).unwrap_or_else(|_| "[]".to_string())
    }

    /// The JSON array encoded once more as a JSON string literal, ready to
    /// be parsed by the worker at startup.
    pub fn to_embedded_literal(&self) -> String {
        serde_json::to_string(&self.to_json()).unwrap_or_else(|_| "\"[]\"".to_string())
    }
}
