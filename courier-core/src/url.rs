//! Query-string serialization and URL helpers.
//!
//! This module provides:
//! - [`Params`] / [`ParamValue`]: Ordered query parameters
//! - [`build_url`]: Append serialized parameters to a URL
//! - [`combine_url`] / [`is_absolute_url`]: Resolve a request URL against a base URL

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

/// Characters left untouched by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-escapes reverted to their literal characters after encoding.
const READABLE: [(&str, &str); 7] = [
    ("%40", "@"),
    ("%3A", ":"),
    ("%24", "$"),
    ("%2C", ","),
    ("%20", "+"),
    ("%5B", "["),
    ("%5D", "]"),
];

/// Custom query serializer. Receives the raw parameters and returns the query
/// string to append (without the leading `?`).
pub type ParamsSerializer = Arc<dyn Fn(&Params) -> String + Send + Sync>;

/// A single query parameter value.
///
/// `Null` values are dropped at the top level, `List` values expand to
/// repeated `key[]=value` pairs, `Date` values render as ISO-8601 and `Json`
/// values render as their JSON encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Date(DateTime<Utc>),
    List(Vec<ParamValue>),
    Json(Value),
}

impl ParamValue {
    fn render(&self) -> String {
        match self {
            ParamValue::Null => "null".to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => n.to_string(),
            ParamValue::String(s) => s.clone(),
            ParamValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            ParamValue::List(items) => items
                .iter()
                .map(ParamValue::render)
                .collect::<Vec<_>>()
                .join(","),
            ParamValue::Json(v) => v.to_string(),
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => ParamValue::Number(n),
            Value::String(s) => ParamValue::String(s),
            Value::Array(items) => ParamValue::List(items.into_iter().map(Into::into).collect()),
            obj @ Value::Object(_) => ParamValue::Json(obj),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(value: $t) -> Self {
                    ParamValue::Number(value.into())
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(ParamValue::Number)
            .unwrap_or(ParamValue::Null)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Date(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(value: Vec<T>) -> Self {
        ParamValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>, const N: usize> From<[T; N]> for ParamValue {
    fn from(value: [T; N]) -> Self {
        ParamValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// Query parameters for a request.
///
/// Either an ordered list of key/value pairs, serialized by [`build_url`], or
/// a query string that was already serialized by the caller and is appended
/// verbatim.
///
/// # Example
///
/// ```
/// use courier_core::{Params, build_url};
///
/// let params = Params::new().append("page", 2).append("tags", ["a", "b"]);
/// assert_eq!(build_url("/items", Some(&params), None), "/items?page=2&tags[]=a&tags[]=b");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Pairs(Vec<(String, ParamValue)>),
    Serialized(String),
}

impl Default for Params {
    fn default() -> Self {
        Params::Pairs(Vec::new())
    }
}

impl Params {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a query string that is already serialized.
    pub fn serialized(query: impl Into<String>) -> Self {
        Params::Serialized(query.into())
    }

    /// Append a key/value pair.
    ///
    /// Appending to a pre-serialized query converts nothing: the pair is
    /// encoded and joined onto the existing string.
    pub fn append(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        match &mut self {
            Params::Pairs(pairs) => pairs.push((key.into(), value.into())),
            Params::Serialized(query) => {
                let extra = serialize_pairs(&[(key.into(), value.into())]);
                if !extra.is_empty() {
                    if !query.is_empty() {
                        query.push('&');
                    }
                    query.push_str(&extra);
                }
            }
        }
        self
    }

    /// Returns true if there is nothing to serialize.
    pub fn is_empty(&self) -> bool {
        match self {
            Params::Pairs(pairs) => pairs.is_empty(),
            Params::Serialized(query) => query.is_empty(),
        }
    }

    /// Serialize to a query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        match self {
            Params::Pairs(pairs) => serialize_pairs(pairs),
            Params::Serialized(query) => query.clone(),
        }
    }
}

impl From<Value> for Params {
    /// Build pairs from a JSON object. Any other JSON value yields no params.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Params::Pairs(
                map.into_iter()
                    .map(|(key, value)| (key, ParamValue::from(value)))
                    .collect(),
            ),
            _ => Params::default(),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params::Pairs(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Percent-encode a query component the way `encodeURIComponent` does, then
/// restore `@ : $ , [ ]` and render spaces as `+`.
pub fn encode_component(value: &str) -> String {
    let mut encoded = utf8_percent_encode(value, COMPONENT).to_string();
    for (escape, literal) in READABLE {
        if encoded.contains(escape) {
            encoded = encoded.replace(escape, literal);
        }
    }
    encoded
}

fn serialize_pairs(pairs: &[(String, ParamValue)]) -> String {
    let mut parts = Vec::new();

    for (key, value) in pairs {
        match value {
            ParamValue::Null => continue,
            ParamValue::List(items) => {
                let key = encode_component(&format!("{key}[]"));
                for item in items {
                    parts.push(format!("{key}={}", encode_component(&item.render())));
                }
            }
            other => {
                parts.push(format!(
                    "{}={}",
                    encode_component(key),
                    encode_component(&other.render())
                ));
            }
        }
    }

    parts.join("&")
}

/// Append serialized `params` to `url`.
///
/// A custom `serializer` takes precedence over the built-in one. When the
/// resulting query is non-empty, any `#fragment` is removed from `url` and
/// the query is joined with `?` or `&` depending on whether `url` already
/// has one.
pub fn build_url(url: &str, params: Option<&Params>, serializer: Option<&ParamsSerializer>) -> String {
    let Some(params) = params else {
        return url.to_string();
    };

    let serialized = match serializer {
        Some(serializer) => serializer(params),
        None => params.to_query_string(),
    };

    if serialized.is_empty() {
        return url.to_string();
    }

    let base = match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    };
    let separator = if base.contains('?') { '&' } else { '?' };

    format!("{base}{separator}{serialized}")
}

/// Returns true if `url` has a scheme (`http://`) or is protocol-relative (`//host`).
pub fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some((scheme, rest)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid_scheme && rest.starts_with("//")
}

/// Join `base` and `relative` with exactly one `/` between them.
///
/// An empty `relative` returns `base` unchanged.
pub fn combine_url(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}
