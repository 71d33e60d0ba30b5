//! Request and response data transforms.
//!
//! A config's `transform_request` / `transform_response` lists replace the
//! built-in transforms when defined. The built-ins are exposed here so a
//! custom list can extend them instead of replacing them:
//!
//! ```ignore
//! use courier_client::RequestConfig;
//! use courier_client::config::transform;
//!
//! let config = RequestConfig::new().transform_response(vec![
//!     transform::json_response(),
//!     transform::response(|data, _headers| Ok(data)),
//! ]);
//! ```

use std::sync::Arc;

use courier_core::{BoxError, Data, transform_request_data, transform_response_data};
use http::HeaderMap;
use serde_json::{Map, Value};

/// Transform applied to the request body before dispatch.
///
/// Receives the body and the flattened header map, which it may edit.
pub type RequestTransform =
    Arc<dyn Fn(Option<Data>, &mut Map<String, Value>) -> Result<Option<Data>, BoxError> + Send + Sync>;

/// Transform applied to the response body before status classification.
pub type ResponseTransform = Arc<dyn Fn(Data, &HeaderMap) -> Result<Data, BoxError> + Send + Sync>;

/// Wrap a closure as a [`RequestTransform`].
pub fn request<F>(f: F) -> RequestTransform
where
    F: Fn(Option<Data>, &mut Map<String, Value>) -> Result<Option<Data>, BoxError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`ResponseTransform`].
pub fn response<F>(f: F) -> ResponseTransform
where
    F: Fn(Data, &HeaderMap) -> Result<Data, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The built-in request transform: JSON bodies are encoded to text.
pub fn json_request() -> RequestTransform {
    request(|data, _headers| Ok(transform_request_data(data)))
}

/// The built-in response transform: JSON text is decoded, anything else
/// passes through.
pub fn json_response() -> ResponseTransform {
    response(|data, _headers| Ok(transform_response_data(data)))
}

pub(crate) fn apply_request(
    transforms: Option<&[RequestTransform]>,
    mut data: Option<Data>,
    headers: &mut Map<String, Value>,
) -> Result<Option<Data>, BoxError> {
    match transforms {
        None => Ok(transform_request_data(data)),
        Some(transforms) => {
            for transform in transforms {
                data = transform(data, headers)?;
            }
            Ok(data)
        }
    }
}

pub(crate) fn apply_response(
    transforms: Option<&[ResponseTransform]>,
    mut data: Data,
    headers: &HeaderMap,
) -> Result<Data, BoxError> {
    match transforms {
        None => Ok(transform_response_data(data)),
        Some(transforms) => {
            for transform in transforms {
                data = transform(data, headers)?;
            }
            Ok(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_request_transform() {
        let mut headers = Map::new();
        let data = apply_request(None, Some(Data::Json(json!({ "a": 1 }))), &mut headers).unwrap();
        assert_eq!(data, Some(Data::from(r#"{"a":1}"#)));
    }

    #[test]
    fn test_request_transforms_run_in_order() {
        let transforms = vec![
            request(|data, headers| {
                headers.insert("X-Step".into(), json!("1"));
                Ok(data.map(|d| Data::Text(format!("{}-a", d.as_text().unwrap_or_default()))))
            }),
            request(|data, _| Ok(data.map(|d| Data::Text(format!("{}-b", d.as_text().unwrap_or_default()))))),
        ];
        let mut headers = Map::new();
        let data = apply_request(Some(&transforms), Some(Data::from("x")), &mut headers).unwrap();
        assert_eq!(data, Some(Data::from("x-a-b")));
        assert_eq!(headers["X-Step"], "1");
    }

    #[test]
    fn test_empty_list_leaves_json_unencoded() {
        let mut headers = Map::new();
        let body = Data::Json(json!([1]));
        let data = apply_request(Some(&[]), Some(body.clone()), &mut headers).unwrap();
        assert_eq!(data, Some(body));
    }

    #[test]
    fn test_request_transform_error() {
        let transforms = vec![request(|_, _| Err("boom".into()))];
        let mut headers = Map::new();
        let err = apply_request(Some(&transforms), None, &mut headers).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_default_response_transform() {
        let data = apply_response(None, Data::from("[1,2]"), &HeaderMap::new()).unwrap();
        assert_eq!(data, Data::Json(json!([1, 2])));

        let raw = apply_response(Some(&[]), Data::from("[1,2]"), &HeaderMap::new()).unwrap();
        assert_eq!(raw, Data::from("[1,2]"));
    }
}
