//! Header tree helpers.
//!
//! Request headers are held as a JSON object tree so that defaults can carry
//! per-method groups (`get`, `post`, ...) and a `common` group next to plain
//! header fields:
//!
//! ```text
//! {
//!   "common": { "Accept": "application/json, text/plain, */*" },
//!   "post":   { "Content-Type": "application/x-www-form-urlencoded" },
//!   "X-Request-Id": "abc"
//! }
//! ```
//!
//! [`flatten_headers`] collapses such a tree into the flat set that goes on
//! the wire for a given method.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use crate::data::Data;
use crate::merge::deep_merge;

/// Canonical spelling of the content type header.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Canonical spelling of the authorization header.
pub const AUTHORIZATION: &str = "Authorization";

/// Content type set for JSON object bodies when none is given.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Group keys removed from a header tree once it has been flattened.
pub const HEADER_GROUPS: [&str; 8] = [
    "delete", "get", "head", "options", "post", "put", "patch", "common",
];

/// Fold every case variant of `normalized` into a single `normalized` entry.
///
/// When several variants are present the one iterated last wins.
pub fn normalize_header_name(headers: &mut Map<String, Value>, normalized: &str) {
    let variants: Vec<String> = headers
        .keys()
        .filter(|name| name.as_str() != normalized && name.eq_ignore_ascii_case(normalized))
        .cloned()
        .collect();

    for name in variants {
        if let Some(value) = headers.shift_remove(&name) {
            headers.insert(normalized.to_string(), value);
        }
    }
}

/// Normalize `Content-Type` and default it to JSON for JSON object bodies.
pub fn process_headers(headers: &mut Map<String, Value>, data: Option<&Data>) {
    normalize_header_name(headers, CONTENT_TYPE);

    if data.is_some_and(Data::is_json_object) && !has_value(headers.get(CONTENT_TYPE)) {
        headers.insert(
            CONTENT_TYPE.to_string(),
            Value::String(JSON_CONTENT_TYPE.to_string()),
        );
    }
}

fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Collapse a header tree into the flat header set for `method`.
///
/// The result is `common`, then the group named after the lower-cased
/// method, then the top-level fields, merged in that order. Group keys are
/// removed afterwards, so a real header literally named `common` or `get`
/// does not survive flattening.
pub fn flatten_headers(headers: &Value, method: &str) -> Map<String, Value> {
    if !headers.is_object() {
        return Map::new();
    }

    let method = method.to_ascii_lowercase();
    let mut flat = deep_merge([&headers["common"], &headers[method.as_str()], headers]);

    for group in HEADER_GROUPS {
        flat.shift_remove(group);
    }

    flat
}

/// Remove every case variant of `name`.
pub fn remove_header(headers: &mut Map<String, Value>, name: &str) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
}

/// Render a flat header value for the wire.
///
/// Strings, numbers, and booleans render; null, arrays, and objects do not.
pub fn header_value_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Build the value of a basic `Authorization` header.
pub fn basic_authorization(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}
