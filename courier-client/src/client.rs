//! The client facade.
//!
//! A [`Client`] holds request defaults and the two interceptor registries.
//! Every call merges its config over the defaults and runs the chain:
//!
//! ```text
//! request interceptors (last registered first)
//!   -> dispatch
//!   -> response interceptors (first registered first)
//! ```
//!
//! Each stage receives the outcome of the previous one. A success goes to the
//! stage's `resolved` handler, a failure to its `rejected` handler when it has
//! one and otherwise straight to the next stage.

use std::sync::Arc;

use courier_core::Data;
use http::Method;

#[cfg(feature = "tracing")]
use tracing::{Instrument, info_span};

use crate::ClientError;
use crate::builder::{ClientBuildError, ClientBuilder};
use crate::config::{BoxFuture, Interceptor, Interceptors, RequestConfig, merge_config};
use crate::dispatch::{Dispatcher, transform_url};
use crate::response::Response;
use crate::transport::Transport;

/// The future returned by every request method. It owns everything it needs,
/// so it can be spawned.
pub type ResponseFuture = BoxFuture<'static, Result<Response, ClientError>>;

/// HTTP client with interceptable request and response stages.
///
/// Clones share the interceptor registries and the transport; defaults are
/// copied.
///
/// # Example
///
/// ```ignore
/// use courier_client::{Client, RequestConfig};
///
/// let client = Client::create(RequestConfig::new().base_url("https://api.example.com"))?;
///
/// let users = client.get("/users").await?;
/// println!("{:?}", users.data);
///
/// let created = client
///     .post("/users", serde_json::json!({ "name": "ada" }))
///     .await?;
/// assert_eq!(created.status, 201);
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    defaults: RequestConfig,
    interceptors: Interceptors,
    dispatcher: Dispatcher,
}

impl Client {
    /// A client with the library defaults and the default transport.
    pub fn new() -> Result<Self, ClientBuildError> {
        ClientBuilder::new().build()
    }

    /// A new, independent client whose defaults are the library defaults
    /// merged with `config`.
    pub fn create(config: RequestConfig) -> Result<Self, ClientBuildError> {
        ClientBuilder::new().defaults(config).build()
    }

    /// A client with the library defaults over a custom transport.
    pub fn with_transport(transport: impl Transport) -> Self {
        Self::from_parts(
            RequestConfig::defaults(),
            Interceptors::new(),
            Dispatcher::new(transport),
        )
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        defaults: RequestConfig,
        interceptors: Interceptors,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            defaults,
            interceptors,
            dispatcher,
        }
    }

    pub fn defaults(&self) -> &RequestConfig {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut RequestConfig {
        &mut self.defaults
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    /// Send a request.
    ///
    /// The config is merged over the defaults and the interceptor chain is
    /// captured when this is called.
    pub fn request(&self, config: RequestConfig) -> ResponseFuture {
        let config = merge_config(&self.defaults, &config);
        let request_chain = self.interceptors.request.snapshot();
        let response_chain = self.interceptors.response.snapshot();
        let dispatcher = self.dispatcher.clone();

        #[cfg(feature = "tracing")]
        let span = info_span!(
            "http.request",
            http.method = %config.method_or_default(),
            url.path = config.url.as_deref().unwrap_or_default(),
            otel.kind = "client",
        );

        let call = run_chain(config, request_chain, dispatcher, response_chain);

        #[cfg(feature = "tracing")]
        let call = call.instrument(span);

        Box::pin(call)
    }

    /// Send a request to `url`.
    pub fn request_url(&self, url: impl Into<String>, config: RequestConfig) -> ResponseFuture {
        self.request(config.url(url))
    }

    /// The URL a config would be sent to, query included.
    pub fn get_uri(&self, config: RequestConfig) -> String {
        transform_url(&merge_config(&self.defaults, &config))
    }

    // ========================================================================
    // Methods without a body
    // ========================================================================

    pub fn get(&self, url: impl Into<String>) -> ResponseFuture {
        self.get_with_config(url, RequestConfig::new())
    }

    pub fn get_with_config(&self, url: impl Into<String>, config: RequestConfig) -> ResponseFuture {
        self.request_without_data(Method::GET, url, config)
    }

    pub fn delete(&self, url: impl Into<String>) -> ResponseFuture {
        self.delete_with_config(url, RequestConfig::new())
    }

    pub fn delete_with_config(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> ResponseFuture {
        self.request_without_data(Method::DELETE, url, config)
    }

    pub fn head(&self, url: impl Into<String>) -> ResponseFuture {
        self.head_with_config(url, RequestConfig::new())
    }

    pub fn head_with_config(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> ResponseFuture {
        self.request_without_data(Method::HEAD, url, config)
    }

    pub fn options(&self, url: impl Into<String>) -> ResponseFuture {
        self.options_with_config(url, RequestConfig::new())
    }

    pub fn options_with_config(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> ResponseFuture {
        self.request_without_data(Method::OPTIONS, url, config)
    }

    // ========================================================================
    // Methods with a body
    // ========================================================================

    pub fn post(&self, url: impl Into<String>, data: impl Into<Data>) -> ResponseFuture {
        self.post_with_config(url, Some(data.into()), RequestConfig::new())
    }

    /// `data` overrides the config's body when it is `Some`.
    pub fn post_with_config(
        &self,
        url: impl Into<String>,
        data: Option<Data>,
        config: RequestConfig,
    ) -> ResponseFuture {
        self.request_with_data(Method::POST, url, data, config)
    }

    pub fn put(&self, url: impl Into<String>, data: impl Into<Data>) -> ResponseFuture {
        self.put_with_config(url, Some(data.into()), RequestConfig::new())
    }

    pub fn put_with_config(
        &self,
        url: impl Into<String>,
        data: Option<Data>,
        config: RequestConfig,
    ) -> ResponseFuture {
        self.request_with_data(Method::PUT, url, data, config)
    }

    pub fn patch(&self, url: impl Into<String>, data: impl Into<Data>) -> ResponseFuture {
        self.patch_with_config(url, Some(data.into()), RequestConfig::new())
    }

    pub fn patch_with_config(
        &self,
        url: impl Into<String>,
        data: Option<Data>,
        config: RequestConfig,
    ) -> ResponseFuture {
        self.request_with_data(Method::PATCH, url, data, config)
    }

    fn request_without_data(
        &self,
        method: Method,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> ResponseFuture {
        self.request(config.method(method).url(url))
    }

    fn request_with_data(
        &self,
        method: Method,
        url: impl Into<String>,
        data: Option<Data>,
        mut config: RequestConfig,
    ) -> ResponseFuture {
        if data.is_some() {
            config.data = data;
        }
        self.request(config.method(method).url(url))
    }
}

async fn run_chain(
    config: RequestConfig,
    request_chain: Vec<Arc<Interceptor<RequestConfig>>>,
    dispatcher: Dispatcher,
    response_chain: Vec<Arc<Interceptor<Response>>>,
) -> Result<Response, ClientError> {
    let mut state = Ok(config);
    for interceptor in request_chain.iter().rev() {
        state = interceptor.apply(state).await;
    }

    let mut state = match state {
        Ok(config) => dispatcher.dispatch(config).await,
        Err(err) => Err(err),
    };
    for interceptor in &response_chain {
        state = interceptor.apply(state).await;
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::Params;
    use serde_json::json;

    use crate::transport::{RawResponse, TransportRequest, transport_fn};

    fn echo_client() -> Client {
        Client::with_transport(transport_fn(|request: TransportRequest| async move {
            let body = json!({
                "method": request.method.as_str(),
                "url": request.url,
            });
            Ok(RawResponse::new(200, body.to_string()))
        }))
    }

    #[tokio::test]
    async fn test_get_uses_defaults() {
        let response = echo_client().get("/users").await.unwrap();
        assert_eq!(response.data, Data::Json(json!({ "method": "GET", "url": "/users" })));
        assert_eq!(response.request.headers["accept"], "application/json, text/plain, */*");
    }

    #[tokio::test]
    async fn test_verbs_set_method() {
        let client = echo_client();
        let cases = [
            (client.delete("/x").await.unwrap(), "DELETE"),
            (client.head("/x").await.unwrap(), "HEAD"),
            (client.options("/x").await.unwrap(), "OPTIONS"),
            (client.post("/x", "a").await.unwrap(), "POST"),
            (client.put("/x", "a").await.unwrap(), "PUT"),
            (client.patch("/x", "a").await.unwrap(), "PATCH"),
        ];
        for (response, method) in cases {
            assert_eq!(response.request.method.as_str(), method);
        }
    }

    #[tokio::test]
    async fn test_with_config_url_and_method_win() {
        let client = echo_client();
        let config = RequestConfig::new().url("/ignored").method(Method::PUT);
        let response = client.get_with_config("/used", config).await.unwrap();
        assert_eq!(response.request.url, "/used");
        assert_eq!(response.request.method, Method::GET);
    }

    #[tokio::test]
    async fn test_post_with_config_keeps_config_data_when_none() {
        let client = echo_client();
        let config = RequestConfig::new().data("from config");
        let response = client.post_with_config("/x", None, config.clone()).await.unwrap();
        assert_eq!(response.request.data, Some(Data::from("from config")));

        let response = client
            .post_with_config("/x", Some(Data::from("explicit")), config)
            .await
            .unwrap();
        assert_eq!(response.request.data, Some(Data::from("explicit")));
    }

    #[tokio::test]
    async fn test_request_url() {
        let response = echo_client()
            .request_url("/a", RequestConfig::new().param("q", "1"))
            .await
            .unwrap();
        assert_eq!(response.request.url, "/a?q=1");
    }

    #[test]
    fn test_get_uri() {
        let mut client = echo_client();
        client.defaults_mut().base_url = Some("https://api.example.com".into());
        let uri = client.get_uri(
            RequestConfig::new()
                .url("/users")
                .params(Params::new().append("page", 1)),
        );
        assert_eq!(uri, "https://api.example.com/users?page=1");
    }

    #[tokio::test]
    async fn test_future_is_spawnable() {
        let client = echo_client();
        let handle = tokio::spawn(client.get("/spawned"));
        assert_eq!(handle.await.unwrap().unwrap().request.url, "/spawned");
    }

    #[tokio::test]
    async fn test_failed_request_interceptor_skips_dispatch() {
        let client = echo_client();
        client.interceptors().request.use_interceptor(Interceptor::sync(|_| {
            Err(ClientError::InvalidRequest {
                message: "blocked".into(),
                config: None,
            })
        }));
        let err = client.get("/x").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest { ref message, .. } if message == "blocked"));
    }

    #[cfg(feature = "tls-ring")]
    #[test]
    fn test_create_is_independent() {
        let a = Client::create(RequestConfig::new().url("/a")).unwrap();
        let b = Client::create(RequestConfig::new()).unwrap();
        a.interceptors().request.use_interceptor(Interceptor::sync(Ok));

        assert_eq!(a.interceptors().request.len(), 1);
        assert!(b.interceptors().request.is_empty());
        assert_eq!(a.defaults().url.as_deref(), Some("/a"));
        assert_eq!(a.defaults().method, Some(Method::GET));
        assert!(b.defaults().url.is_none());
    }
}
