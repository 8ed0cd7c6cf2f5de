//! Single-request HTTP transport.
//!
//! A `Transport` performs exactly one GET with the headers it is told to use.
//! Retry, user-agent rotation and bot-redirect handling live above it in
//! [`FetchClient`](super::FetchClient), so they can be exercised against a
//! scripted transport without a network.
//!
//! Cookies live in the [`Jar`] carried by each request. Every response that
//! passes through reqwest, intermediate redirect hops included, feeds it, and
//! requests sharing a jar replay whatever it holds for their URL.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, Proxy, header};
use thiserror::Error;
use url::Url;

use prodex_core::config::{AppConfig, ProxyConfig};

/// Browser-like headers sent with every request.
///
/// Accept-Encoding is left to reqwest so it keeps decoding gzip/brotli/deflate bodies.
pub const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    ("accept-language", "en-US,en;q=0.9"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("cache-control", "max-age=0"),
];

/// Errors from a single transport attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("status {0}")]
    Status(u16),

    #[error("{bytes} bytes exceeds {limit}")]
    TooLarge { bytes: u64, limit: usize },

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// One outbound GET.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub user_agent: String,
    /// Cookie store shared by every request of one fetch attempt.
    pub cookies: Arc<Jar>,
    pub timeout: Duration,
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// URL after HTTP redirects.
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

/// Performs a single HTTP GET.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `req`, failing on network errors, timeouts, non-2xx statuses and oversized bodies.
    async fn get(&self, req: &OutboundRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport with optional proxy rotation.
///
/// Each configured proxy route is a set of proxies; each request picks one
/// route at random and gets a client bound to the request's cookie jar.
pub struct ReqwestTransport {
    routes: Vec<Vec<Proxy>>,
    rng: Mutex<fastrand::Rng>,
    max_bytes: usize,
}

impl ReqwestTransport {
    /// Build the transport from application configuration.
    pub fn new(config: &AppConfig) -> Result<Self, TransportError> {
        let routes = proxy_routes(&config.proxy)?;
        let rng = config.user_agent_seed.map(fastrand::Rng::with_seed).unwrap_or_default();
        Ok(Self { routes, rng: Mutex::new(rng), max_bytes: config.max_bytes })
    }

    fn pick_route(&self) -> Option<&[Proxy]> {
        let idx = match self.routes.len() {
            0 => return None,
            1 => 0,
            n => self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner).usize(..n),
        };
        self.routes.get(idx).map(Vec::as_slice)
    }

    fn client_for(&self, jar: Arc<Jar>) -> Result<Client, TransportError> {
        let route = self.pick_route().ok_or_else(|| TransportError::Build("no proxy route".into()))?;
        route
            .iter()
            .cloned()
            .fold(base_builder().cookie_provider(jar), |builder, proxy| builder.proxy(proxy))
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))
    }
}

fn default_header_map() -> header::HeaderMap {
    DEFAULT_HEADERS
        .iter()
        .map(|&(name, value)| (header::HeaderName::from_static(name), header::HeaderValue::from_static(value)))
        .collect()
}

fn base_builder() -> reqwest::ClientBuilder {
    Client::builder()
        .default_headers(default_header_map())
        .redirect(reqwest::redirect::Policy::limited(10))
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true)
}

fn with_auth(proxy: Proxy, config: &ProxyConfig) -> Proxy {
    match (&config.username, &config.password) {
        (Some(user), Some(pass)) => proxy.basic_auth(user, pass),
        (Some(user), None) => proxy.basic_auth(user, ""),
        _ => proxy,
    }
}

fn proxy_routes(config: &ProxyConfig) -> Result<Vec<Vec<Proxy>>, TransportError> {
    let proxy_err = |e: reqwest::Error| TransportError::Build(format!("invalid proxy: {e}"));

    if !config.enabled {
        return Ok(vec![Vec::new()]);
    }

    if !config.proxy_list.is_empty() {
        tracing::info!(proxies = config.proxy_list.len(), "proxy rotation enabled");
        return config
            .proxy_list
            .iter()
            .map(|endpoint| -> Result<Vec<Proxy>, TransportError> {
                Ok(vec![with_auth(Proxy::all(endpoint).map_err(proxy_err)?, config)])
            })
            .collect();
    }

    let mut route = Vec::new();
    if let Some(endpoint) = &config.http_proxy {
        route.push(with_auth(Proxy::http(endpoint).map_err(proxy_err)?, config));
    }
    if let Some(endpoint) = &config.https_proxy {
        route.push(with_auth(Proxy::https(endpoint).map_err(proxy_err)?, config));
    }
    Ok(vec![route])
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, req: &OutboundRequest) -> Result<RawResponse, TransportError> {
        let client = self.client_for(Arc::clone(&req.cookies))?;

        let response = client
            .get(req.url.as_str())
            .header(header::USER_AGENT, &req.user_agent)
            .timeout(req.timeout)
            .send()
            .await
            .map_err(|e| classify(&e, req.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.max_bytes
        {
            return Err(TransportError::TooLarge { bytes: len, limit: self.max_bytes });
        }

        let final_url = response.url().clone();
        let bytes = response.bytes().await.map_err(|e| classify(&e, req.timeout))?;
        if bytes.len() > self.max_bytes {
            return Err(TransportError::TooLarge { bytes: bytes.len() as u64, limit: self.max_bytes });
        }

        Ok(RawResponse { final_url, status: status.as_u16(), body: String::from_utf8_lossy(&bytes).into_owned() })
    }
}

fn classify(err: &reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout.as_millis() as u64)
    } else {
        TransportError::Network(err.to_string())
    }
}
