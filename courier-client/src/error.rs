//! Client-side error types.
//!
//! This module provides [`ClientError`], the error every stage of the request
//! pipeline rejects with. Each variant that originates in the pipeline keeps
//! the effective [`RequestConfig`] that produced it so that interceptors can
//! inspect or replay the request.

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::Cancel;
use crate::config::RequestConfig;
use crate::response::Response;

/// Error code reported for timeouts.
pub const CODE_TIMEOUT: &str = "ECONNABORTED";

/// Error code reported for cancellations.
pub const CODE_CANCELED: &str = "ERR_CANCELED";

/// Error code reported for network failures.
pub const CODE_NETWORK: &str = "ERR_NETWORK";

/// Request pipeline error variants.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// The request was cancelled through its [`CancelToken`](crate::CancelToken),
    /// either before dispatch or while the transport was in flight.
    #[error("{reason}")]
    Cancelled {
        reason: Cancel,
        /// `None` only when the error was raised outside a dispatch.
        config: Option<Arc<RequestConfig>>,
    },

    /// The transport failed without producing a response.
    #[error("Network Error")]
    Network {
        message: String,
        config: Arc<RequestConfig>,
    },

    /// The transport did not complete within the configured timeout.
    #[error("Timeout of {} ms exceeded", .timeout.as_millis())]
    Timeout {
        timeout: Duration,
        config: Arc<RequestConfig>,
    },

    /// The server answered with a status outside `200..300`.
    #[error("Request failed with status code {}", .response.status)]
    Status { response: Box<Response> },

    /// A request transform failed.
    #[error("transform error: {message}")]
    Transform {
        message: String,
        config: Arc<RequestConfig>,
    },

    /// A header or URL that cannot be put on the wire.
    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        config: Option<Arc<RequestConfig>>,
    },
}

impl ClientError {
    /// The effective config of the failed request, when known.
    pub fn config(&self) -> Option<&RequestConfig> {
        match self {
            ClientError::Cancelled { config, .. } => config.as_deref(),
            ClientError::Network { config, .. }
            | ClientError::Timeout { config, .. }
            | ClientError::Transform { config, .. } => Some(config),
            ClientError::Status { response } => Some(&response.config),
            ClientError::InvalidRequest { config, .. } => config.as_deref(),
        }
    }

    /// The response, for status errors.
    pub fn response(&self) -> Option<&Response> {
        match self {
            ClientError::Status { response } => Some(response),
            _ => None,
        }
    }

    /// Convert a status error back into its response.
    ///
    /// Useful in a `rejected` handler that wants to recover from a status
    /// error by resolving with the response anyway.
    pub fn into_response(self) -> Result<Response, ClientError> {
        match self {
            ClientError::Status { response } => Ok(*response),
            other => Err(other),
        }
    }

    /// Short machine-readable code, when the variant has one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ClientError::Cancelled { .. } => Some(CODE_CANCELED),
            ClientError::Network { .. } => Some(CODE_NETWORK),
            ClientError::Timeout { .. } => Some(CODE_TIMEOUT),
            ClientError::Status { .. }
            | ClientError::Transform { .. }
            | ClientError::InvalidRequest { .. } => None,
        }
    }

    /// HTTP status of the response, for status errors.
    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    /// Returns true if this error is a cancellation.
    pub fn is_cancel(&self) -> bool {
        matches!(self, ClientError::Cancelled { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }

    /// The cancellation reason, for cancellations.
    pub fn cancel_reason(&self) -> Option<&Cancel> {
        match self {
            ClientError::Cancelled { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub(crate) fn cancelled(reason: Cancel, config: &Arc<RequestConfig>) -> Self {
        ClientError::Cancelled {
            reason,
            config: Some(Arc::clone(config)),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        ClientError::InvalidRequest {
            message: message.into(),
            config: None,
        }
    }
}

impl From<Cancel> for ClientError {
    fn from(reason: Cancel) -> Self {
        ClientError::Cancelled {
            reason,
            config: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Arc<RequestConfig> {
        Arc::new(RequestConfig::new().url("/users"))
    }

    #[test]
    fn test_timeout_message_and_code() {
        let err = ClientError::Timeout {
            timeout: Duration::from_millis(250),
            config: config(),
        };
        assert_eq!(err.to_string(), "Timeout of 250 ms exceeded");
        assert_eq!(err.code(), Some("ECONNABORTED"));
        assert!(err.is_timeout());
        assert_eq!(err.config().and_then(|c| c.url.as_deref()), Some("/users"));
    }

    #[test]
    fn test_network_message() {
        let err = ClientError::Network {
            message: "connection refused".into(),
            config: config(),
        };
        assert_eq!(err.to_string(), "Network Error");
        assert_eq!(err.code(), Some(CODE_NETWORK));
        assert!(err.response().is_none());
    }

    #[test]
    fn test_cancel_is_cancel() {
        let err = ClientError::from(Cancel::new(Some("stop".into())));
        assert!(err.is_cancel());
        assert_eq!(err.to_string(), "stop");
        assert!(err.config().is_none());
        assert_eq!(err.cancel_reason().and_then(|r| r.message.as_deref()), Some("stop"));
    }

    #[test]
    fn test_cancel_keeps_config() {
        let err = ClientError::cancelled(Cancel::default(), &config());
        assert_eq!(err.to_string(), "canceled");
        assert_eq!(err.config().and_then(|c| c.url.as_deref()), Some("/users"));
    }

    #[test]
    fn test_into_response_non_status() {
        let err = ClientError::invalid_request("bad header");
        assert!(err.into_response().is_err());
    }
}
