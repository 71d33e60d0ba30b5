//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use serde_json::Value;

use crate::client::Client;
use crate::config::{Interceptors, RequestConfig, merge_config};
use crate::dispatch::Dispatcher;
use crate::env::{CookieJar, FixedOrigin, OriginResolver};
use crate::transport::{HyperTransport, HyperTransportBuilder, Transport};

/// Builder for creating a [`Client`].
///
/// Without an explicit transport, a [`HyperTransport`] is built from the
/// transport settings on this builder.
///
/// # Example
///
/// ```ignore
/// use courier_client::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")
///     .timeout(Duration::from_secs(10))
///     .header("X-Client", "courier")
///     .build()?;
/// ```
pub struct ClientBuilder {
    /// Defaults every request is merged over.
    defaults: RequestConfig,
    /// Pre-built transport; overrides the hyper settings below.
    transport: Option<Arc<dyn Transport>>,
    cookies: Option<Arc<dyn CookieJar>>,
    origin_resolver: Option<Arc<dyn OriginResolver>>,
    /// Parsed into a [`FixedOrigin`] at build time.
    origin: Option<String>,
    /// Settings for the default transport.
    hyper: HyperTransportBuilder,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("defaults", &self.defaults)
            .field("transport", &self.transport.is_some())
            .field("cookies", &self.cookies.is_some())
            .field("origin_resolver", &self.origin_resolver.is_some())
            .field("origin", &self.origin)
            .field("hyper", &self.hyper)
            .finish()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a builder starting from the library defaults.
    pub fn new() -> Self {
        Self {
            defaults: RequestConfig::defaults(),
            transport: None,
            cookies: None,
            origin_resolver: None,
            origin: None,
            hyper: HyperTransport::builder(),
        }
    }

    /// Merge `config` over the current defaults.
    pub fn defaults(mut self, config: RequestConfig) -> Self {
        self.defaults = merge_config(&self.defaults, &config);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.defaults.base_url = Some(base_url.into());
        self
    }

    /// Default timeout for every request. Zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Add a top-level default header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults = self.defaults.header(name, value);
        self
    }

    /// Use a custom transport instead of the hyper-based one.
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Where the XSRF cookie is read from.
    pub fn cookie_jar(mut self, cookies: impl CookieJar) -> Self {
        self.cookies = Some(Arc::new(cookies));
        self
    }

    pub fn origin_resolver(mut self, resolver: impl OriginResolver) -> Self {
        self.origin_resolver = Some(Arc::new(resolver));
        self
    }

    /// Treat URLs on `origin` (and relative URLs) as same-origin.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.hyper = self.hyper.tls_config(config);
        self
    }

    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.hyper = self.hyper.http2_only(enabled);
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.hyper = self.hyper.pool_idle_timeout(timeout);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport cannot be created or the
    /// configured origin does not parse.
    pub fn build(self) -> Result<Client, ClientBuildError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(self.hyper.build()?),
        };

        let mut dispatcher = Dispatcher::from_shared(transport);
        if let Some(cookies) = self.cookies {
            dispatcher = dispatcher.with_cookie_jar(cookies);
        }
        match (self.origin_resolver, self.origin) {
            (Some(resolver), _) => dispatcher = dispatcher.with_origin_resolver(resolver),
            (None, Some(origin)) => {
                let resolver = FixedOrigin::new(&origin)
                    .map_err(|e| ClientBuildError::InvalidOrigin(format!("{origin}: {e}")))?;
                dispatcher = dispatcher.with_origin_resolver(Arc::new(resolver));
            }
            (None, None) => {}
        }

        Ok(Client::from_parts(self.defaults, Interceptors::new(), dispatcher))
    }
}

/// Error type for client building failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// No rustls crypto provider is compiled in or installed.
    #[error(
        "no TLS crypto provider available: enable the `tls-ring` feature or install a process-wide default provider"
    )]
    NoCryptoProvider,

    /// The configured same-origin URL does not parse.
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),
}
