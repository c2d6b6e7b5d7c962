//! HTTP transport to the gateway.
//!
//! One pooled reqwest client per gateway client. Every request carries its
//! own timeout; the client-wide timeout only bounds the connect phase.

use crate::clock::duration_ms;
use crate::error::{GatewayError, GatewayResult};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use std::time::Duration;
use tracing::trace;

/// Header carrying a per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// HTTP client configuration.
///
/// Provides sensible defaults for production use with connection pooling
/// and TLS configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection timeout (default: 5s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("mcp-gateway-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP config with custom connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Create a new HTTP config with custom pool settings.
    #[must_use]
    pub const fn with_pool_config(mut self, idle_timeout: Duration, max_idle: usize) -> Self {
        self.pool_idle_timeout = idle_timeout;
        self.pool_max_idle_per_host = max_idle;
        self
    }
}

/// Build a configured HTTP client.
///
/// Creates a reqwest client with rustls TLS, connection pooling, and
/// the specified configuration.
///
/// # Errors
///
/// Returns an error if the client cannot be built (e.g., TLS initialization fails).
///
/// # Examples
///
/// ```
/// use mcp_gateway_client::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default()
///     .with_connect_timeout(Duration::from_secs(2));
/// let client = build_http_client(&config).expect("Failed to build client");
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
}

/// A successful (2xx) response with its body fully read.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Response status
    pub status: StatusCode,
    /// Response body
    pub body: String,
}

impl TransportResponse {
    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Protocol`] if the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> GatewayResult<T> {
        serde_json::from_str(&self.body).map_err(GatewayError::from)
    }
}

/// Single-attempt HTTP exchange with the gateway.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    base_url: String,
}

impl Transport {
    /// Create a transport for `base_url` over an existing client.
    #[must_use]
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a transport with a freshly built client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &HttpConfig, base_url: impl Into<String>) -> GatewayResult<Self> {
        let http = build_http_client(config)
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::new(http, base_url))
    }

    /// Gateway base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one request.
    ///
    /// Non-2xx responses are returned as [`GatewayError::Http`] with the body
    /// attached. A request exceeding `timeout` yields [`GatewayError::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns a transport, timeout or HTTP error as described above.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> GatewayResult<TransportResponse> {
        if timeout.is_zero() {
            return Err(GatewayError::Timeout(timeout));
        }

        let url = format!("{}{}", self.base_url, path);
        let request_id = uuid::Uuid::new_v4().to_string();
        trace!(%method, %url, %request_id, timeout_ms = duration_ms(timeout), "Sending request");

        let mut request = self
            .http
            .request(method, &url)
            .headers(headers)
            .timeout(timeout);
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            request = request.header(REQUEST_ID_HEADER, value);
        }
        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| classify(e, timeout))?;

        if !status.is_success() {
            return Err(GatewayError::http(status.as_u16(), text));
        }

        Ok(TransportResponse { status, body: text })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(timeout)
    } else {
        GatewayError::transport(err.to_string())
    }
}
