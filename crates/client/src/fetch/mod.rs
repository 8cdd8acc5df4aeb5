//! Network surface used by the worker.
//!
//! ### Contract
//! - `Network::perform` resolves with any HTTP response, whatever its status.
//! - It fails only when no response arrived (DNS, connect, reset, body read).
//! - Deciding whether a status is "ok" is the caller's job.
//!
//! `FetchClient` is the reqwest-backed implementation; tests substitute
//! their own `Network`.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, Url, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, is_cacheable_scheme, resolve};

use bgsw_core::{Error, StoredResponse};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "bg-sw/0.1")
    pub user_agent: String,

    /// Request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 20)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "bg-sw/0.1".to_string(), timeout: Duration::from_secs(30), max_redirects: 20 }
    }
}

impl From<&bgsw_core::AppConfig> for FetchConfig {
    fn from(config: &bgsw_core::AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
}

impl FetchRequest {
    /// A plain GET with no extra headers.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: header::HeaderMap::new() }
    }

    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: header::HeaderMap::new() }
    }
}

/// A response, either fresh from the network or replayed from a store.
///
/// The body is `Bytes`, so cloning a response to hand one copy to the page
/// and another to the cache shares the buffer instead of re-reading a stream.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
}

impl FetchResponse {
    /// Status in the 200-299 range.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Convert into the stored form. Headers with non-UTF-8 values are dropped.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        StoredResponse::new(self.status.as_u16(), headers, self.bytes.to_vec())
    }

    /// Rebuild a response from a stored entry.
    pub fn from_stored(url: Url, stored: StoredResponse) -> Self {
        let mut headers = header::HeaderMap::new();
        for (name, value) in &stored.headers {
            if let (Ok(name), Ok(value)) =
                (header::HeaderName::from_bytes(name.as_bytes()), header::HeaderValue::from_str(value))
            {
                headers.append(name, value);
            }
        }
        let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
        Self { url, status, headers, bytes: Bytes::from(stored.body) }
    }
}

/// Performs a request over the network.
#[async_trait]
pub trait Network: Send + Sync {
    async fn perform(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn perform(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("{} {}: {}", request.method, request.url, e)))?;

        let status = response.status();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to read response from {}: {}", request.url, e)))?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(FetchResponse { url: request.url.clone(), status, headers, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "bg-sw/0.1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 20);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = bgsw_core::AppConfig { user_agent: "blindguide/2".into(), timeout_ms: 1_500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "blindguide/2");
        assert_eq!(config.timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn test_stored_round_trip_keeps_headers() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/css"));
        let response = FetchResponse {
            url: Url::parse("https://fonts.googleapis.com/css2").unwrap(),
            status: StatusCode::OK,
            headers,
            bytes: Bytes::from_static(b"body{}"),
        };

        let stored = response.to_stored();
        assert_eq!(stored.header("content-type"), Some("text/css"));

        let replayed = FetchResponse::from_stored(response.url.clone(), stored);
        assert_eq!(replayed.status, StatusCode::OK);
        assert_eq!(replayed.headers.get(header::CONTENT_TYPE).unwrap(), "text/css");
        assert_eq!(replayed.bytes, response.bytes);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_perform_returns_non_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.js"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/missing.js", server.uri())).unwrap();
        let response = client.perform(&FetchRequest::get(url)).await.unwrap();

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(!response.is_ok());
        assert_eq!(response.bytes, Bytes::from_static(b"nope"));
    }

    #[tokio::test]
    async fn test_perform_forwards_method_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/log"))
            .and(header_eq("x-trace", "abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let mut request = FetchRequest::new(Method::POST, Url::parse(&format!("{}/log", server.uri())).unwrap());
        request
            .headers
            .insert("x-trace", header::HeaderValue::from_static("abc"));

        let response = client.perform(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_perform_connection_refused_is_fetch_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let result = client
            .perform(&FetchRequest::get(Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()))
            .await;

        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }
}
