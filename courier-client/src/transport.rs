//! The transport seam of the request pipeline.
//!
//! The dispatcher hands a fully prepared [`TransportRequest`] to a
//! [`Transport`] and gets back a [`RawResponse`]. Aborting a request is
//! expressed by dropping the future returned from [`Transport::send`].
//!
//! [`HyperTransport`] is the default implementation. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots`
//! - `tls-ring` - Crypto provider
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! # Example
//!
//! ```ignore
//! use courier_client::transport::{HyperTransport, transport_fn, RawResponse};
//! use std::time::Duration;
//!
//! let transport = HyperTransport::builder()
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//!
//! // Or a closure, handy in tests
//! let fake = transport_fn(|request| async move {
//!     Ok(RawResponse::new(200, format!("echo {}", request.url)))
//! });
//! ```

mod body;
mod connector;
mod hyper;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use courier_core::Data;
use http::{HeaderMap, Method, StatusCode};

pub use body::RequestBody;
pub use connector::{build_https_connector, default_tls_config, has_tls_support};
pub use hyper::{HyperTransport, HyperTransportBuilder, PoolSettings};

// Re-export the rustls type needed for custom TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;

use crate::config::{BoxFuture, ProgressFn, ResponseType};

/// The request as handed to a [`Transport`].
#[derive(Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Fully built URL, query included.
    pub url: String,
    pub headers: HeaderMap,
    /// Body after the request transforms.
    pub data: Option<Data>,
    /// `None` when no timeout applies.
    pub timeout: Option<Duration>,
    pub response_type: ResponseType,
    pub with_credentials: bool,
    /// Transports that stream the response body report each chunk here.
    pub on_download_progress: Option<ProgressFn>,
    /// Transports that stream the request body report each chunk here.
    pub on_upload_progress: Option<ProgressFn>,
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("with_credentials", &self.with_credentials)
            .field("on_download_progress", &self.on_download_progress.is_some())
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .finish()
    }
}

/// A response as produced by a [`Transport`], before any transform.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// A response with the given status, its canonical reason, and a body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a response header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }
}

/// Failures a transport reports.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failure, reset, DNS error, or a malformed response.
    #[error("network error: {0}")]
    Network(String),

    /// The transport's own deadline expired.
    #[error("timeout")]
    Timeout,

    /// The request cannot be expressed on the wire.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Sends prepared requests.
///
/// Dropping the returned future must abort the request and deliver nothing.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, Result<RawResponse, TransportError>>;
}

/// A [`Transport`] backed by a closure. See [`transport_fn`].
#[derive(Clone)]
pub struct FnTransport<F> {
    f: F,
}

/// Build a [`Transport`] from an async closure.
pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RawResponse, TransportError>> + Send + 'static,
{
    FnTransport { f }
}

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RawResponse, TransportError>> + Send + 'static,
{
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, Result<RawResponse, TransportError>> {
        Box::pin((self.f)(request))
    }
}

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransport").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_new() {
        let raw = RawResponse::new(404, "missing").with_header("x-id", "1");
        assert_eq!(raw.status_text, "Not Found");
        assert_eq!(raw.headers["x-id"], "1");
        assert_eq!(raw.body, Bytes::from_static(b"missing"));

        assert_eq!(RawResponse::new(599, "").status_text, "");
    }

    #[tokio::test]
    async fn test_transport_fn() {
        let transport = transport_fn(|request: TransportRequest| async move {
            Ok(RawResponse::new(200, request.url))
        });
        let raw = transport
            .send(TransportRequest {
                method: Method::GET,
                url: "/x".into(),
                headers: HeaderMap::new(),
                data: None,
                timeout: None,
                response_type: ResponseType::default(),
                with_credentials: false,
                on_download_progress: None,
                on_upload_progress: None,
            })
            .await
            .unwrap();
        assert_eq!(raw.body, Bytes::from_static(b"/x"));
    }
}
