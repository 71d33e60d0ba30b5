//! The response type handed to response interceptors and callers.

use std::sync::Arc;

use courier_core::Data;
use http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::config::RequestConfig;
use crate::transport::TransportRequest;

/// A response after the response transforms have run.
#[derive(Clone, Debug)]
pub struct Response {
    pub data: Data,
    pub status: u16,
    pub status_text: String,
    /// Response headers; names are lower-case.
    pub headers: HeaderMap,
    /// The effective config that produced this response.
    pub config: Arc<RequestConfig>,
    /// The request as it was handed to the transport.
    pub request: Arc<TransportRequest>,
}

impl Response {
    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        self.data.deserialize()
    }

    /// Consume the response, returning the body.
    pub fn into_data(self) -> Data {
        self.data
    }

    /// Returns true for a `2xx` status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a response header as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
