//! Worker source rewriting.

use super::PrecacheManifest;
use std::fmt;

/// Token the worker source carries where the manifest literal belongs.
pub const PLACEHOLDER: &str = "__PRECACHE_MANIFEST__";

/// Stable, non-hashed file name of the emitted worker at the deployment root.
pub const WORKER_FILE_NAME: &str = "sw.js";

/// Non-fatal build diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildWarning {
    pub message: String,
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The additional build output carrying the rewritten worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerArtifact {
    pub file_name: String,
    pub source: String,
}

/// Result of rewriting the worker source.
#[derive(Debug, Clone)]
pub struct Injection {
    pub artifact: WorkerArtifact,
    pub warning: Option<BuildWarning>,
}

/// Substitute the manifest literal for [`PLACEHOLDER`] in `worker_source`.
///
/// A source without the placeholder is emitted unchanged together with a
/// [`BuildWarning`]; the build is never failed here.
pub fn inject(worker_source: &str, manifest: &PrecacheManifest) -> Injection {
    let occurrences = worker_source.matches(PLACEHOLDER).count();

    let (source, warning) = if occurrences == 0 {
        let warning = BuildWarning {
            message: format!("{PLACEHOLDER} not found in worker source; emitting {WORKER_FILE_NAME} without a manifest"),
        };
        tracing::warn!("{warning}");
        (worker_source.to_string(), Some(warning))
    } else {
        if occurrences > 1 {
            tracing::debug!(occurrences, "placeholder appears more than once; replacing all");
        }
        (worker_source.replace(PLACEHOLDER, &manifest.to_embedded_literal()), None)
    };

    tracing::info!(entries = manifest.len(), file = WORKER_FILE_NAME, "emitted worker");

    Injection { artifact: WorkerArtifact { file_name: WORKER_FILE_NAME.to_string(), source }, warning }
}
