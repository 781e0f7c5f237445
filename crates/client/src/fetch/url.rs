//! URL resolution for manifest paths and cache keys.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for snipshelf_core::Error {
    fn from(err: UrlError) -> Self {
        snipshelf_core::Error::InvalidUrl(err.to_string())
    }
}

/// Parse the deployment origin.
///
/// Only http(s) origins are accepted. The path is reset to `/`, and query
/// and fragment are dropped, so relative joins always start at the root.
pub fn parse_origin(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed)
}

/// Resolve a root-relative path (as found in the precache manifest) against
/// the deployment origin, producing the cache key for that resource.
///
/// Fragments never reach the cache key; query strings are kept verbatim.
pub fn resolve(origin: &url::Url, path: &str) -> Result<url::Url, UrlError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    resolved.set_fragment(None);
    Ok(resolved)
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &url::Url, b: &url::Url) -> bool {
    a.origin() == b.origin()
}
