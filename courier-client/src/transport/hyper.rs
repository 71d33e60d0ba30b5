//! Hyper-based HTTP transport.
//!
//! This module provides [`HyperTransport`], the default [`Transport`] built on
//! hyper_util's legacy client.

use std::time::Duration;

use bytes::BytesMut;
use courier_core::Data;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use http_body::Body;
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rand::Rng;
use rand::distr::Alphanumeric;
use rustls::ClientConfig;

use super::body::RequestBody;
use super::connector::build_https_connector;
use super::{RawResponse, Transport, TransportError, TransportRequest};
use crate::builder::ClientBuildError;
use crate::config::BoxFuture;

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, RequestBody>;

/// HTTP transport using hyper_util's legacy client.
///
/// Cloning is cheap and clones share the connection pool.
///
/// # Example
///
/// ```ignore
/// use courier_client::{Client, transport::HyperTransport};
///
/// let transport = HyperTransport::builder().http2_only(true).build()?;
/// let client = Client::builder().transport(transport).build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a transport with default settings.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::builder().build()
    }

    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }

    async fn execute(client: HyperClient, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let on_download_progress = request.on_download_progress.clone();
        let http_request = into_http_request(request)?;

        let response = client
            .request(http_request)
            .await
            .map_err(|e| TransportError::Network(format!("request failed: {e}")))?;

        let (parts, mut body) = response.into_parts();
        let total = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok()?.parse::<u64>().ok())
            .or_else(|| body.size_hint().exact());

        let mut buf = BytesMut::new();
        while let Some(frame) = body.frame().await {
            let frame =
                frame.map_err(|e| TransportError::Network(format!("failed to read response body: {e}")))?;
            if let Ok(chunk) = frame.into_data() {
                buf.extend_from_slice(&chunk);
                if let Some(progress) = &on_download_progress {
                    progress(buf.len() as u64, total);
                }
            }
        }

        Ok(RawResponse {
            status: parts.status.as_u16(),
            status_text: parts.status.canonical_reason().unwrap_or_default().to_string(),
            headers: parts.headers,
            body: buf.freeze(),
        })
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, Result<RawResponse, TransportError>> {
        let client = self.client.clone();
        Box::pin(async move {
            match request.timeout {
                Some(limit) if !limit.is_zero() => {
                    tokio::time::timeout(limit, Self::execute(client, request))
                        .await
                        .unwrap_or(Err(TransportError::Timeout))
                }
                _ => Self::execute(client, request).await,
            }
        })
    }
}

fn into_http_request(request: TransportRequest) -> Result<http::Request<RequestBody>, TransportError> {
    let TransportRequest {
        method,
        url,
        mut headers,
        data,
        on_upload_progress,
        ..
    } = request;

    let body = match data {
        None => RequestBody::empty(),
        Some(Data::Form(form)) => {
            let boundary = multipart_boundary();
            let content_type = HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            headers.insert(CONTENT_TYPE, content_type);
            RequestBody::full(form.encode(&boundary))
        }
        Some(data) => RequestBody::full(data.to_bytes("")),
    }
    .with_upload_progress(on_upload_progress);

    let mut http_request = http::Request::builder()
        .method(method)
        .uri(url.as_str())
        .body(body)
        .map_err(|e| TransportError::InvalidRequest(format!("{url}: {e}")))?;
    *http_request.headers_mut() = headers;
    Ok(http_request)
}

fn multipart_boundary() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("----courier{suffix}")
}

/// Connection pool settings for [`HyperTransportBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    /// Pooled connections idle for longer than this are closed. `None` keeps
    /// them indefinitely.
    pub idle_timeout: Option<Duration>,
    pub max_idle_per_host: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(90)),
            max_idle_per_host: 32,
        }
    }
}

/// Configures and builds a [`HyperTransport`].
///
/// ```ignore
/// use courier_client::transport::HyperTransport;
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .pool_idle_timeout(Duration::from_secs(30))
///     .pool_max_idle_per_host(8)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct HyperTransportBuilder {
    tls: Option<ClientConfig>,
    pool: PoolSettings,
    http2_only: bool,
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom rustls configuration, for private roots or client certificates.
    pub fn tls_config(self, tls: ClientConfig) -> Self {
        Self {
            tls: Some(tls),
            ..self
        }
    }

    /// Skip ALPN and speak HTTP/2 directly, plain `http://` included.
    pub fn http2_only(self, http2_only: bool) -> Self {
        Self { http2_only, ..self }
    }

    /// Pass `None` to keep idle connections forever.
    pub fn pool_idle_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.pool.idle_timeout = timeout.into();
        self
    }

    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool.max_idle_per_host = max;
        self
    }

    pub fn pool(self, pool: PoolSettings) -> Self {
        Self { pool, ..self }
    }

    /// # Errors
    ///
    /// Fails when no rustls crypto provider is available.
    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let Self {
            tls,
            pool,
            http2_only,
        } = self;

        let mut client = Client::builder(TokioExecutor::new());
        client
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(pool.idle_timeout)
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .http2_only(http2_only);

        Ok(HyperTransport {
            client: client.build(build_https_connector(tls)?),
            http2_only,
        })
    }
}
