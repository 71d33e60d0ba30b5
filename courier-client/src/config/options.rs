//! Per-request configuration.
//!
//! [`RequestConfig`] describes one request. Every field is optional so that a
//! per-call config can be layered over the client defaults with
//! [`merge_config`](super::merge_config): a field that is `None` falls back to
//! the default, a field that is `Some` overrides it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use courier_core::{Data, ParamValue, Params, ParamsSerializer};
use http::Method;
use serde_json::{Map, Value, json};

use super::transform::{RequestTransform, ResponseTransform};
use crate::cancel::CancelToken;

/// Accept header sent with every request by default.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// Content type sent by default for methods that carry a body.
pub const DEFAULT_FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Default name of the cookie holding the XSRF token.
pub const DEFAULT_XSRF_COOKIE_NAME: &str = "XSRF-TOKEN";

/// Default name of the header the XSRF token is sent under.
pub const DEFAULT_XSRF_HEADER_NAME: &str = "X-XSRF-TOKEN";

/// Progress callback: bytes transferred so far and the total when known.
pub type ProgressFn = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Credentials for HTTP basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// How the raw response body is handed to the response transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Text, decoded as JSON by the default response transform.
    #[default]
    Json,
    /// Text. The default response transform still decodes JSON-looking text.
    Text,
    /// Raw bytes, never decoded.
    Bytes,
}

/// Configuration for a single request.
///
/// # Example
///
/// ```ignore
/// use courier_client::RequestConfig;
/// use std::time::Duration;
///
/// let config = RequestConfig::new()
///     .url("/users")
///     .param("page", 2)
///     .header("X-Request-Id", "abc-123")
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: Option<String>,
    /// Prefixed to `url` unless `url` is absolute.
    pub base_url: Option<String>,
    pub method: Option<Method>,
    /// Header tree: plain fields plus optional `common` and per-method groups.
    pub headers: Option<Value>,
    pub params: Option<Params>,
    pub data: Option<Data>,
    /// Zero means no timeout.
    pub timeout: Option<Duration>,
    pub response_type: Option<ResponseType>,
    pub with_credentials: Option<bool>,
    pub xsrf_cookie_name: Option<String>,
    pub xsrf_header_name: Option<String>,
    pub auth: Option<BasicAuth>,
    pub params_serializer: Option<ParamsSerializer>,
    pub transform_request: Option<Vec<RequestTransform>>,
    pub transform_response: Option<Vec<ResponseTransform>>,
    pub cancel_token: Option<CancelToken>,
    /// Called as response body frames arrive.
    pub on_download_progress: Option<ProgressFn>,
    /// Called as request body frames are written.
    pub on_upload_progress: Option<ProgressFn>,
}

impl RequestConfig {
    /// Create an empty config where every field is undefined.
    pub fn new() -> Self {
        Self::default()
    }

    /// The library defaults every client starts from.
    pub fn defaults() -> Self {
        let body_group = json!({ "Content-Type": DEFAULT_FORM_CONTENT_TYPE });
        Self {
            method: Some(Method::GET),
            timeout: Some(Duration::ZERO),
            xsrf_cookie_name: Some(DEFAULT_XSRF_COOKIE_NAME.to_string()),
            xsrf_header_name: Some(DEFAULT_XSRF_HEADER_NAME.to_string()),
            headers: Some(json!({
                "common": { "Accept": DEFAULT_ACCEPT },
                "delete": {},
                "get": {},
                "head": {},
                "options": {},
                "post": body_group.clone(),
                "put": body_group.clone(),
                "patch": body_group,
            })),
            ..Self::default()
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Replace the whole header tree.
    pub fn headers(mut self, headers: Value) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Set a top-level header field.
    ///
    /// A header tree that is not an object is replaced by a fresh one.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.header_map_mut().insert(name.into(), value.into());
        self
    }

    /// Set a header inside a group (`common`, `get`, `post`, ...).
    pub fn group_header(
        mut self,
        group: &str,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let headers = self.header_map_mut();
        let entry = headers
            .entry(group.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(name.into(), value.into());
        }
        self
    }

    /// Mutable access to the top-level header object, creating it if needed.
    pub fn header_map_mut(&mut self) -> &mut Map<String, Value> {
        if !matches!(self.headers, Some(Value::Object(_))) {
            self.headers = Some(Value::Object(Map::new()));
        }
        match self.headers {
            Some(Value::Object(ref mut map)) => map,
            _ => unreachable!("headers were just set to an object"),
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Append one query parameter.
    ///
    /// Pre-serialized params are replaced by a fresh list.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let params = match self.params.take() {
            Some(params @ Params::Pairs(_)) => params,
            _ => Params::new(),
        };
        self.params = Some(params.append(key, value));
        self
    }

    pub fn data(mut self, data: impl Into<Data>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Serialize `value` as a JSON body.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.data = Some(Data::json(value)?);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = Some(with_credentials);
        self
    }

    pub fn xsrf_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.xsrf_cookie_name = Some(name.into());
        self
    }

    pub fn xsrf_header_name(mut self, name: impl Into<String>) -> Self {
        self.xsrf_header_name = Some(name.into());
        self
    }

    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    /// Use a custom query serializer instead of the built-in one.
    pub fn params_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&Params) -> String + Send + Sync + 'static,
    {
        self.params_serializer = Some(Arc::new(serializer));
        self
    }

    /// Replace the request transforms. An empty list sends the body as is.
    pub fn transform_request(mut self, transforms: Vec<RequestTransform>) -> Self {
        self.transform_request = Some(transforms);
        self
    }

    /// Replace the response transforms. An empty list keeps the raw body.
    pub fn transform_response(mut self, transforms: Vec<ResponseTransform>) -> Self {
        self.transform_response = Some(transforms);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn on_download_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, Option<u64>) + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_upload_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, Option<u64>) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(callback));
        self
    }

    /// The request method, `GET` when undefined.
    pub fn method_or_default(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("with_credentials", &self.with_credentials)
            .field("xsrf_cookie_name", &self.xsrf_cookie_name)
            .field("xsrf_header_name", &self.xsrf_header_name)
            .field("auth", &self.auth.as_ref().map(|a| &a.username))
            .field("params_serializer", &self.params_serializer.is_some())
            .field(
                "transform_request",
                &self.transform_request.as_ref().map(Vec::len),
            )
            .field(
                "transform_response",
                &self.transform_response.as_ref().map(Vec::len),
            )
            .field("cancel_token", &self.cancel_token)
            .field("on_download_progress", &self.on_download_progress.is_some())
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .finish()
    }
}

/// Field-wise equality. Function fields and cancel tokens compare by identity.
impl PartialEq for RequestConfig {
    fn eq(&self, other: &Self) -> bool {
        fn same_fns<T: ?Sized>(a: &Option<Vec<Arc<T>>>, b: &Option<Vec<Arc<T>>>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => {
                    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
                }
                _ => false,
            }
        }

        fn same_fn<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
        }

        let same_token = match (&self.cancel_token, &other.cancel_token) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_token(b),
            _ => false,
        };

        self.url == other.url
            && self.base_url == other.base_url
            && self.method == other.method
            && self.headers == other.headers
            && self.params == other.params
            && self.data == other.data
            && self.timeout == other.timeout
            && self.response_type == other.response_type
            && self.with_credentials == other.with_credentials
            && self.xsrf_cookie_name == other.xsrf_cookie_name
            && self.xsrf_header_name == other.xsrf_header_name
            && self.auth == other.auth
            && same_fn(&self.params_serializer, &other.params_serializer)
            && same_fns(&self.transform_request, &other.transform_request)
            && same_fns(&self.transform_response, &other.transform_response)
            && same_token
            && same_fn(&self.on_download_progress, &other.on_download_progress)
            && same_fn(&self.on_upload_progress, &other.on_upload_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = RequestConfig::defaults();
        assert_eq!(defaults.method, Some(Method::GET));
        assert_eq!(defaults.timeout, Some(Duration::ZERO));
        assert_eq!(defaults.xsrf_cookie_name.as_deref(), Some("XSRF-TOKEN"));
        assert_eq!(defaults.xsrf_header_name.as_deref(), Some("X-XSRF-TOKEN"));

        let headers = defaults.headers.unwrap();
        assert_eq!(headers["common"]["Accept"], DEFAULT_ACCEPT);
        assert_eq!(headers["post"]["Content-Type"], DEFAULT_FORM_CONTENT_TYPE);
        assert_eq!(headers["patch"]["Content-Type"], DEFAULT_FORM_CONTENT_TYPE);
        assert_eq!(headers["get"], json!({}));
    }

    #[test]
    fn test_new_is_undefined() {
        let config = RequestConfig::new();
        assert!(config.url.is_none());
        assert!(config.method.is_none());
        assert_eq!(config.method_or_default(), Method::GET);
    }

    #[test]
    fn test_header_builder() {
        let config = RequestConfig::new()
            .header("X-A", "1")
            .group_header("common", "X-B", "2")
            .header("X-C", 3);
        assert_eq!(
            config.headers.unwrap(),
            json!({ "X-A": "1", "common": { "X-B": "2" }, "X-C": 3 })
        );
    }

    #[test]
    fn test_header_replaces_non_object_tree() {
        let config = RequestConfig::new().headers(Value::Null).header("X", "1");
        assert_eq!(config.headers.unwrap(), json!({ "X": "1" }));
    }

    #[test]
    fn test_param_builder() {
        let config = RequestConfig::new().param("a", 1).param("b", "two");
        assert_eq!(config.params.unwrap().to_query_string(), "a=1&b=two");
    }

    #[test]
    fn test_equality_compares_functions_by_identity() {
        let a = RequestConfig::new().params_serializer(|_| String::new());
        let b = a.clone();
        assert_eq!(a, b);

        let c = RequestConfig::new().params_serializer(|_| String::new());
        assert_ne!(a, c);

        let d = RequestConfig::new().on_download_progress(|_, _| {});
        assert_eq!(d, d.clone());
        assert_ne!(d, RequestConfig::new().on_download_progress(|_, _| {}));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = RequestConfig::new().auth("user", "secret");
        let debug = format!("{config:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("secret"));
    }
}
