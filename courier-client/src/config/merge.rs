//! Layering a per-call config over defaults.

use courier_core::deep_merge;
use serde_json::Value;

use super::options::RequestConfig;

/// Combine `base` with `over` into a new effective config.
///
/// Per field:
/// - `headers` is deep-merged: an object override is merged recursively into
///   the base object with override keys winning; any other defined override
///   (including JSON `null`) replaces the base.
/// - every other field, including `url`, `params`, `data`, and `auth`, takes
///   the override when it is defined and the base otherwise.
///
/// Neither input is modified and the result shares no mutable structure with
/// them; function fields are shared immutable handles.
pub fn merge_config(base: &RequestConfig, over: &RequestConfig) -> RequestConfig {
    RequestConfig {
        url: pick(&base.url, &over.url),
        base_url: pick(&base.base_url, &over.base_url),
        method: pick(&base.method, &over.method),
        headers: merge_headers(base.headers.as_ref(), over.headers.as_ref()),
        params: pick(&base.params, &over.params),
        data: pick(&base.data, &over.data),
        timeout: pick(&base.timeout, &over.timeout),
        response_type: pick(&base.response_type, &over.response_type),
        with_credentials: pick(&base.with_credentials, &over.with_credentials),
        xsrf_cookie_name: pick(&base.xsrf_cookie_name, &over.xsrf_cookie_name),
        xsrf_header_name: pick(&base.xsrf_header_name, &over.xsrf_header_name),
        auth: pick(&base.auth, &over.auth),
        params_serializer: pick(&base.params_serializer, &over.params_serializer),
        transform_request: pick(&base.transform_request, &over.transform_request),
        transform_response: pick(&base.transform_response, &over.transform_response),
        cancel_token: pick(&base.cancel_token, &over.cancel_token),
        on_download_progress: pick(&base.on_download_progress, &over.on_download_progress),
        on_upload_progress: pick(&base.on_upload_progress, &over.on_upload_progress),
    }
}

fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    over.as_ref().or(base.as_ref()).cloned()
}

fn merge_headers(base: Option<&Value>, over: Option<&Value>) -> Option<Value> {
    match (base, over) {
        (base, Some(over @ Value::Object(_))) => {
            let base = base.unwrap_or(&Value::Null);
            Some(Value::Object(deep_merge([base, over])))
        }
        (_, Some(over)) => Some(over.clone()),
        (Some(base @ Value::Object(_)), None) => Some(Value::Object(deep_merge([base]))),
        (base, None) => base.cloned(),
    }
}
