//! The outbound HTTP seam: one POST, one streamed response.
//!
//! [`Transport`] is the only place the library touches the network. The
//! default [`ReqwestTransport`] is built from [`crate::ClientConfig`]; tests
//! and embedders can supply their own through
//! [`crate::ClientConfigBuilder::transport`] (to count calls, inject
//! failures, or route through custom middleware).

use crate::error::{Html2PdfError, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::debug;

/// A boxed stream of response body chunks, in arrival order.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A fully marshalled outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL, e.g. `http://pdfcrowd.com:80/api/pdf/convert/html/`.
    pub url: String,
    /// Header name/value pairs, sent as given.
    pub headers: Vec<(&'static str, String)>,
    /// Form-encoded body.
    pub body: String,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status line plus streaming body of an upstream response.
pub struct UpstreamResponse {
    pub status: u16,
    pub body: BodyStream,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: BodyStream) -> Self {
        Self { status, body }
    }
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("body", &"<stream>")
            .finish()
    }
}

/// Issues a single HTTP POST and hands back the response as a stream.
///
/// Implementations must not retry; a connection-level failure is returned
/// as `Err(TransportError)` and an HTTP error status as `Ok` with that status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: HttpRequest) -> Result<UpstreamResponse, TransportError>;
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn Transport>")
    }
}

/// The default transport, backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with an optional whole-request timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self, Html2PdfError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| Html2PdfError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest::Client` (connection pool, proxy settings, ...).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<UpstreamResponse, TransportError> {
        let HttpRequest { url, headers, body } = request;
        debug!("POST {} ({} bytes)", url, body.len());

        let mut req = self.client.post(&url);
        for (name, value) in headers {
            req = req.header(name, value);
        }

        let response = req.body(body).send().await.map_err(TransportError::from)?;
        let status = response.status().as_u16();
        debug!("POST {} → HTTP {}", url, status);

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from));
        Ok(UpstreamResponse::new(status, Box::pin(body)))
    }
}
