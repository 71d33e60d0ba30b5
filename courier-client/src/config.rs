//! Request configuration and the interceptor registry.
//!
//! This module contains:
//! - [`RequestConfig`]: Everything that describes one request
//! - [`merge_config`]: Layering a per-call config over defaults
//! - [`transform`]: Request and response data transforms
//! - [`Interceptor`] / [`InterceptorManager`]: Request/response interception

mod interceptor;
mod merge;
mod options;
pub mod transform;

pub use interceptor::{
    BoxFuture, HeaderInterceptor, Interceptor, InterceptorId, InterceptorManager, Interceptors,
};
pub use merge::merge_config;
pub use options::{
    BasicAuth, DEFAULT_ACCEPT, DEFAULT_FORM_CONTENT_TYPE, DEFAULT_XSRF_COOKIE_NAME,
    DEFAULT_XSRF_HEADER_NAME, ProgressFn, RequestConfig, ResponseType,
};
pub use transform::{RequestTransform, ResponseTransform};
