//! The dispatch stage of the request pipeline.
//!
//! [`Dispatcher::dispatch`] turns an effective [`RequestConfig`] into a
//! [`Response`], strictly in this order:
//!
//! 1. Fail if the cancel token already fired
//! 2. Build the URL (base URL, query parameters)
//! 3. Normalize and flatten the header tree for the method
//! 4. Run the request transforms
//! 5. Finish the wire headers (form bodies, XSRF, basic auth, empty bodies)
//! 6. Send through the [`Transport`], racing the cancel token and the timeout
//! 7. Run the response transforms
//! 8. Reject statuses outside `200..300`

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_core::{
    AUTHORIZATION, CONTENT_TYPE, Data, basic_authorization, build_url, combine_url,
    flatten_headers, header_value_string, is_absolute_url, normalize_header_name,
    process_headers, remove_header,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{Map, Value};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::ClientError;
use crate::config::{RequestConfig, ResponseType, transform};
use crate::env::{CookieJar, CrossOrigin, NoCookies, OriginResolver};
use crate::response::Response;
use crate::transport::{RawResponse, Transport, TransportError, TransportRequest};

/// Sends one effective config through a [`Transport`].
///
/// Cloning is cheap; clones share the transport and collaborators.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    cookies: Arc<dyn CookieJar>,
    origin: Arc<dyn OriginResolver>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher that reads no cookies and treats every URL as
    /// cross-origin.
    pub fn new(transport: impl Transport) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cookies: Arc::new(NoCookies),
            origin: Arc::new(CrossOrigin),
        }
    }

    pub fn with_cookie_jar(mut self, cookies: Arc<dyn CookieJar>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_origin_resolver(mut self, origin: Arc<dyn OriginResolver>) -> Self {
        self.origin = origin;
        self
    }

    /// Dispatch an effective config.
    pub async fn dispatch(&self, mut config: RequestConfig) -> Result<Response, ClientError> {
        if let Some(reason) = config.cancel_token.as_ref().and_then(|token| token.reason()) {
            #[cfg(feature = "tracing")]
            debug!(reason = %reason, "request cancelled before dispatch");
            return Err(ClientError::cancelled(reason, &Arc::new(config)));
        }

        let method = config.method_or_default();
        let url = transform_url(&config);
        config.url = Some(url.clone());

        let mut headers = flat_headers(&config, &method);
        let data = transform::apply_request(
            config.transform_request.as_deref(),
            config.data.clone(),
            &mut headers,
        )
        .map_err(|e| ClientError::Transform {
            message: e.to_string(),
            config: Arc::new(config.clone()),
        })?;
        config.data = data;

        self.finish_headers(&config, &url, &mut headers);
        let wire_headers = to_header_map(&headers);
        config.headers = Some(Value::Object(headers));
        let config = Arc::new(config);

        let request = Arc::new(TransportRequest {
            method,
            url,
            headers: wire_headers.map_err(|message| ClientError::InvalidRequest {
                message,
                config: Some(Arc::clone(&config)),
            })?,
            data: config.data.clone(),
            timeout: config.timeout.filter(|t| !t.is_zero()),
            response_type: config.response_type.unwrap_or_default(),
            with_credentials: config.with_credentials.unwrap_or(false),
            on_download_progress: config.on_download_progress.clone(),
            on_upload_progress: config.on_upload_progress.clone(),
        });

        let raw = self.send(&config, TransportRequest::clone(&request)).await?;
        settle(raw, config, request)
    }

    fn finish_headers(&self, config: &RequestConfig, url: &str, headers: &mut Map<String, Value>) {
        if config.data.as_ref().is_some_and(Data::is_form) {
            remove_header(headers, CONTENT_TYPE);
        }

        if config.with_credentials.unwrap_or(false) || self.origin.is_same_origin(url) {
            if let (Some(cookie), Some(header)) = (
                config.xsrf_cookie_name.as_deref(),
                config.xsrf_header_name.as_deref(),
            ) {
                if let Some(token) = self.cookies.read(cookie).filter(|token| !token.is_empty()) {
                    headers.insert(header.to_string(), Value::String(token));
                }
            }
        }

        if let Some(auth) = &config.auth {
            remove_header(headers, AUTHORIZATION);
            headers.insert(
                AUTHORIZATION.to_string(),
                Value::String(basic_authorization(&auth.username, &auth.password)),
            );
        }

        if config.data.is_none() {
            remove_header(headers, CONTENT_TYPE);
        }
    }

    async fn send(
        &self,
        config: &Arc<RequestConfig>,
        request: TransportRequest,
    ) -> Result<RawResponse, ClientError> {
        let timeout = request.timeout;
        let transport = self.transport.send(request);
        let outcome = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, transport)
                    .await
                    .unwrap_or(Err(TransportError::Timeout)),
                None => transport.await,
            }
        };

        let result = match &config.cancel_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    reason = token.cancelled() => {
                        #[cfg(feature = "tracing")]
                        debug!(reason = %reason, "request cancelled in flight");
                        return Err(ClientError::cancelled(reason, config));
                    }
                    result = outcome => result,
                }
            }
            None => outcome.await,
        };

        result.map_err(|err| {
            #[cfg(feature = "tracing")]
            debug!(error = %err, "transport failed");
            match err {
                TransportError::Network(message) => ClientError::Network {
                    message,
                    config: Arc::clone(config),
                },
                TransportError::Timeout => ClientError::Timeout {
                    timeout: timeout.unwrap_or(Duration::ZERO),
                    config: Arc::clone(config),
                },
                TransportError::InvalidRequest(message) => ClientError::InvalidRequest {
                    message,
                    config: Some(Arc::clone(config)),
                },
            }
        })
    }
}

/// The full request URL: base URL applied, query appended.
pub(crate) fn transform_url(config: &RequestConfig) -> String {
    let url = config.url.as_deref().unwrap_or_default();
    let url = match config.base_url.as_deref() {
        Some(base) if !is_absolute_url(url) => combine_url(base, url),
        _ => url.to_string(),
    };
    build_url(&url, config.params.as_ref(), config.params_serializer.as_ref())
}

fn flat_headers(config: &RequestConfig, method: &Method) -> Map<String, Value> {
    let mut tree = config
        .headers
        .clone()
        .unwrap_or_else(|| Value::Object(Map::new()));
    if let Value::Object(top) = &mut tree {
        process_headers(top, config.data.as_ref());
    }

    let mut flat = flatten_headers(&tree, method.as_str());
    normalize_header_name(&mut flat, CONTENT_TYPE);
    flat
}

fn to_header_map(headers: &Map<String, Value>) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let Some(value) = header_value_string(value) else {
            #[cfg(feature = "tracing")]
            debug!(header = %name, "skipping header without a scalar value");
            continue;
        };
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| format!("invalid header name: {name}"))?;
        let header_value = HeaderValue::from_str(&value)
            .map_err(|_| format!("invalid value for header {name}"))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn settle(
    raw: RawResponse,
    config: Arc<RequestConfig>,
    request: Arc<TransportRequest>,
) -> Result<Response, ClientError> {
    let data = match request.response_type {
        ResponseType::Bytes => Data::Bytes(raw.body),
        ResponseType::Json | ResponseType::Text => body_text(raw.body),
    };

    let data = transform::apply_response(config.transform_response.as_deref(), data, &raw.headers)
        .map_err(|e| ClientError::Transform {
            message: e.to_string(),
            config: Arc::clone(&config),
        })?;

    let response = Response {
        data,
        status: raw.status,
        status_text: raw.status_text,
        headers: raw.headers,
        config,
        request,
    };

    if response.is_success() {
        Ok(response)
    } else {
        Err(ClientError::Status {
            response: Box::new(response),
        })
    }
}

fn body_text(body: Bytes) -> Data {
    match String::from_utf8(body.to_vec()) {
        Ok(text) => Data::Text(text),
        Err(_) => Data::Bytes(body),
    }
}
