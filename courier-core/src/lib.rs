//! Core request/response helpers for courier.
//!
//! This crate holds the I/O-free parts of the request pipeline that the
//! client crate (`courier-client`) builds on. Nothing here touches the
//! network or a runtime, so every function is deterministic and cheap to test.
//!
//! ## Modules
//!
//! - `data`: Request/response payloads and the default data transforms
//! - `url`: Query-string serialization and URL combination
//! - `headers`: Header tree normalization, flattening, and basic auth
//! - `merge`: Structural deep merge of JSON-like trees
//! - `cookie`: Reading values out of a `Cookie`-style string

mod cookie;
mod data;
mod headers;
mod merge;
mod url;

pub use cookie::*;
pub use data::*;
pub use headers::*;
pub use merge::*;
pub use url::*;

/// Boxed error type returned by user-supplied transform and serializer functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
