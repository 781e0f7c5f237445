//! Cache version tags and versioned cache names.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix shared by every versioned precache name.
pub const PRECACHE_PREFIX: &str = "precache-";

/// Opaque tag identifying one build's asset generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheVersion(String);

impl CacheVersion {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Derive a version from the set of precached URLs.
    ///
    /// Order-insensitive: the URLs are sorted before hashing, so the same
    /// asset set always yields the same tag and any change yields a new one.
    pub fn from_manifest<'a>(urls: impl IntoIterator<Item = &'a str>) -> Self {
        let mut sorted: Vec<&str> = urls.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut hasher = Sha256::new();
        for url in sorted {
            hasher.update(url.as_bytes());
            hasher.update(b"\n");
        }
        let digest = hex::encode(hasher.finalize());
        Self(digest[..12].to_string())
    }

    pub fn tag(&self) -> &str {
        &self.0
    }

    /// Name of the cache store holding this version's precache.
    pub fn cache_name(&self) -> String {
        format!("{PRECACHE_PREFIX}{}", self.0)
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
