//! HTTP transports for the Zotero local API.
//!
//! Two transports are used in order for every request: the *direct* client
//! (system and environment proxy settings honoured) and the *no-proxy*
//! client, which talks to the local API without any proxy. A local API call
//! intercepted by a proxy on the direct path is retried on the second one.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde_json::Value;
use tracing::{trace, warn};
use url::Url;

use super::SourceError;

/// Header carrying the opaque Zotero API key.
pub const API_KEY_HEADER: &str = "Zotero-API-Key";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connect/request timeouts for local API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP connect timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// A way of performing local API requests.
///
/// # Object Safety
///
/// Uses `async_trait` so transports can be held as `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the transport's name for logs and aggregated errors.
    fn name(&self) -> &str;

    /// Performs a GET and returns the body of a successful response.
    async fn get(&self, url: &Url, api_key: Option<&str>) -> Result<Vec<u8>, SourceError>;

    /// Performs a JSON POST and returns the body of a successful response.
    async fn post_json(
        &self,
        url: &Url,
        body: &Value,
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, SourceError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    name: String,
    client: Client,
}

impl ReqwestTransport {
    /// Builds the direct transport (default proxy resolution).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Transport`] when client construction fails.
    pub fn direct(timeouts: HttpTimeouts) -> Result<Self, SourceError> {
        Ok(Self {
            name: "direct".to_string(),
            client: build_client("direct", timeouts, false)?,
        })
    }

    /// Builds the fallback transport that never routes through a proxy.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Transport`] when client construction fails.
    pub fn no_proxy(timeouts: HttpTimeouts) -> Result<Self, SourceError> {
        Ok(Self {
            name: "no-proxy".to_string(),
            client: build_client("no-proxy", timeouts, true)?,
        })
    }

    async fn send(&self, url: &Url, request: RequestBuilder) -> Result<Vec<u8>, SourceError> {
        trace!(transport = %self.name, url = %url, "Sending local API request");
        let response = request
            .send()
            .await
            .map_err(|error| SourceError::transport(url.as_str(), error))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| SourceError::transport(url.as_str(), error))?;

        if !status.is_success() {
            return Err(SourceError::http(url.as_str(), status.as_u16(), &bytes));
        }
        Ok(bytes.to_vec())
    }
}

fn with_api_key(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => request.header(API_KEY_HEADER, key),
        None => request,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, url: &Url, api_key: Option<&str>) -> Result<Vec<u8>, SourceError> {
        let request = with_api_key(self.client.get(url.clone()), api_key);
        self.send(url, request).await
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &Value,
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, SourceError> {
        let request = with_api_key(self.client.post(url.clone()).json(body), api_key);
        self.send(url, request).await
    }
}

fn build_client(
    name: &str,
    timeouts: HttpTimeouts,
    bypass_system_proxy: bool,
) -> Result<Client, SourceError> {
    let attempt = catch_unwind(AssertUnwindSafe(|| {
        let builder = base_builder(timeouts);
        if bypass_system_proxy {
            builder.no_proxy().build()
        } else {
            builder.build()
        }
    }));

    match attempt {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(error)) => Err(SourceError::transport(
            name,
            format!("HTTP client construction failed: {error}"),
        )),
        Err(_) if !bypass_system_proxy => {
            // Some sandboxed macOS environments panic while reading system
            // proxy settings; the no-proxy builder skips that lookup.
            warn!(
                transport = name,
                "HTTP client hit system proxy panic; building without proxy support"
            );
            build_client(name, timeouts, true)
        }
        Err(_) => Err(SourceError::transport(
            name,
            "HTTP client construction panicked",
        )),
    }
}

fn base_builder(timeouts: HttpTimeouts) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.request_secs))
        .user_agent(concat!("zotero-export/", env!("CARGO_PKG_VERSION")))
        .gzip(true)
}
