//! Request/response model and the network the worker runtime talks to.
//!
//! ### Requests
//! - Carry the classification inputs a fetch event exposes: method, mode
//!   (navigation or not) and destination (script, style, image, ...).
//!
//! ### Responses
//! - Network responses are passed through unmodified.
//! - [`Response::network_error`] is the synthetic error response every
//!   failing fetch branch resolves to.
//!
//! ### Network
//! - [`Network`] is the seam the runtime fetches through; [`HttpNetwork`] is
//!   the reqwest-backed implementation. Only transport failures are errors:
//!   an HTTP 500 is still a response.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, parse_origin, resolve, same_origin};
pub use ::url::Url;

use snipshelf_core::{CachedResponse, Error};

/// Whether the request loads a top-level document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

/// What the requested resource will be used as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Script,
    Style,
    Font,
    Image,
    Manifest,
    Empty,
    Other,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    /// A plain `GET` with no particular destination (e.g. an API read).
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Cors,
            destination: Destination::Empty,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// A full-page navigation.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, destination: Destination::Document, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Distinguishes real responses from the synthetic network error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Basic,
    Error,
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct Response {
    pub kind: ResponseType,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub url: Option<Url>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { kind: ResponseType::Basic, status, headers: HeaderMap::new(), body: body.into(), url: None }
    }

    /// The synthetic network-error response: status 0, empty body.
    pub fn network_error() -> Self {
        Self { kind: ResponseType::Error, status: 0, headers: HeaderMap::new(), body: Bytes::new(), url: None }
    }

    pub fn is_network_error(&self) -> bool {
        self.kind == ResponseType::Error
    }

    /// Status in the 200-299 range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Rebuild a response from a cache entry. Headers that are no longer
    /// valid are dropped.
    pub fn from_cached(cached: CachedResponse) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &cached.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        Self {
            kind: ResponseType::Basic,
            status: cached.status,
            headers,
            body: Bytes::from(cached.body),
            url: Url::parse(&cached.url).ok(),
        }
    }

    /// Snapshot this response as a cache entry keyed by `url`.
    pub fn to_cached(&self, url: &Url) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        CachedResponse::new(url.as_str(), self.status, headers, self.body.to_vec())
    }
}

/// Something that can perform a network fetch.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request from the network.
    ///
    /// # Errors
    ///
    /// Returns `Error::FetchFailed` on transport failure only.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "snipshelf/0.1")
    pub user_agent: String,

    /// Transport timeout (default: 30s)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "snipshelf/0.1".to_string(), timeout: Duration::from_millis(30_000) }
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("network error: {e}")))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to read response: {e}")))?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { kind: ResponseType::Basic, status, headers, body, url: Some(final_url) })
    }
}
