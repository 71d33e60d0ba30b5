//! Interceptable HTTP client for Rust.
//!
//! This crate provides a promise-style HTTP client built around a request
//! pipeline: per-call configuration is merged over client defaults, passed
//! through registered request interceptors, dispatched over a pluggable
//! transport, and handed to registered response interceptors.
//!
//! ## Features
//!
//! - Layered configuration with deep-merged header trees
//! - Request and response interceptors that can be added and ejected at runtime
//! - Request/response data transforms (JSON by default)
//! - Query parameter serialization with `base_url` resolution
//! - Cancellation tokens that abort in-flight requests
//! - Timeouts, basic auth and XSRF header injection
//! - Upload and download progress callbacks
//! - A hyper + rustls transport, or any [`Transport`] implementation
//!
//! ## Example
//!
//! ```ignore
//! use courier_client::{Client, RequestConfig};
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let response = client
//!     .get_with_config("/users", RequestConfig::new().param("page", 2))
//!     .await?;
//!
//! println!("{} {:?}", response.status, response.data);
//! ```
//!
//! ## Interceptors
//!
//! Request interceptors run in reverse registration order, response
//! interceptors in registration order. Each one sees the outcome of the stage
//! before it and may recover from a failure with a `rejected` handler.
//!
//! ```ignore
//! use courier_client::{Client, Interceptor};
//!
//! let client = Client::new()?;
//!
//! let id = client.interceptors().request.use_interceptor(Interceptor::sync(|config| {
//!     Ok(config.header("X-Request-Id", "42"))
//! }));
//!
//! client.interceptors().response.use_interceptor(Interceptor::sync(|mut response| {
//!     response.status_text = response.status_text.to_uppercase();
//!     Ok(response)
//! }));
//!
//! // Later
//! client.interceptors().request.eject(id);
//! ```
//!
//! ## Cancellation
//!
//! A [`CancelToken`] attached to a config aborts the request the moment it is
//! cancelled. Cancellation errors are recognizable with [`is_cancel`].
//!
//! ```ignore
//! use courier_client::{CancelToken, RequestConfig, is_cancel};
//!
//! let source = CancelToken::source();
//! let call = client.get_with_config("/slow", RequestConfig::new().cancel_token(source.token.clone()));
//!
//! source.cancel.cancel("user navigated away");
//!
//! let err = call.await.unwrap_err();
//! assert!(is_cancel(&err));
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`ClientError`]. Status failures carry the full
//! [`Response`]; cancellation, network, timeout and transform failures carry
//! the config that produced them.
//!
//! | Variant | `code()` | Cause |
//! |---------|----------|-------|
//! | `Cancelled` | `ERR_CANCELED` | Token cancelled before or during the request |
//! | `Timeout` | `ECONNABORTED` | No response within `timeout` |
//! | `Network` | `ERR_NETWORK` | Connection or protocol failure |
//! | `Status` | none | Response status outside `200..300` |
//! | `Transform` | none | A data transform returned an error |
//! | `InvalidRequest` | none | The request could not be built |
//!
//! ## Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` | |
//! | `tls-ring` | rustls crypto provider | `ring` |
//! | `tls-native-roots` | System root certificates | `rustls-native-certs` |
//! | `tls-webpki-roots` | Bundled Mozilla root certificates | `webpki-roots` |
//! | `tracing` (default) | A span per request, interceptor registry events | `tracing` |
//!
//! When `tracing` is enabled, each request runs inside an `http.request` span
//! with `http.method`, `url.path` and `otel.kind = "client"` fields.
//!
//! ## Testing
//!
//! Any closure returning a future can stand in for the network:
//!
//! ```ignore
//! use courier_client::{Client, transport::{RawResponse, transport_fn}};
//!
//! let client = Client::with_transport(transport_fn(|request| async move {
//!     Ok(RawResponse::new(200, format!("{{\"url\":\"{}\"}}", request.url)))
//! }));
//! ```

mod builder;
mod cancel;
mod client;
pub mod config;
mod dispatch;
mod env;
mod error;
mod helpers;
mod response;
pub mod transport;

pub use builder::{ClientBuildError, ClientBuilder};
pub use cancel::{Cancel, CancelToken, CancelTokenSource, Canceler};
pub use client::{Client, ResponseFuture};
pub use dispatch::Dispatcher;
pub use env::{CookieJar, CrossOrigin, FixedOrigin, MemoryCookieJar, NoCookies, OriginResolver};
pub use error::{CODE_CANCELED, CODE_NETWORK, CODE_TIMEOUT, ClientError};
pub use helpers::{Spread, all, is_cancel, spread};
pub use response::Response;

// Re-export from config module
pub use config::{
    BasicAuth, HeaderInterceptor, Interceptor, InterceptorId, InterceptorManager, Interceptors,
    ProgressFn, RequestConfig, RequestTransform, ResponseTransform, ResponseType, merge_config,
};

// Re-export transport types at the top level for convenience
pub use transport::{HyperTransport, HyperTransportBuilder, PoolSettings, TlsClientConfig, Transport};

// Re-export core types that users need
pub use courier_core::{BoxError, Data, FormData, FormValue, ParamValue, Params, ParamsSerializer};

pub use bytes::Bytes;
