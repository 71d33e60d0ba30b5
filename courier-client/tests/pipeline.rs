//! End-to-end pipeline behavior against an in-memory transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use courier_client::transport::{RawResponse, TransportRequest, transport_fn};
use courier_client::{
    CancelToken, Client, ClientBuilder, ClientError, Data, Interceptor, MemoryCookieJar,
    RequestConfig, is_cancel,
};
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

fn logging_client(log: &Log, status: u16) -> Client {
    let log = Arc::clone(log);
    Client::with_transport(transport_fn(move |request: TransportRequest| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(format!("dispatch {}", request.url));
            Ok(RawResponse::new(status, r#"{"ok":true}"#))
        }
    }))
}

fn tag_request(log: &Log, name: &'static str) -> Interceptor<RequestConfig> {
    let log = Arc::clone(log);
    Interceptor::sync(move |config| {
        log.lock().unwrap().push(name.to_string());
        Ok(config)
    })
}

fn tag_response(log: &Log, name: &'static str) -> Interceptor<courier_client::Response> {
    let log = Arc::clone(log);
    Interceptor::sync(move |response| {
        log.lock().unwrap().push(name.to_string());
        Ok(response)
    })
}

#[tokio::test]
async fn test_interceptor_order() {
    let log = Log::default();
    let client = logging_client(&log, 200);
    client.interceptors().request.use_interceptor(tag_request(&log, "R1"));
    client.interceptors().request.use_interceptor(tag_request(&log, "R2"));
    client.interceptors().response.use_interceptor(tag_response(&log, "S1"));
    client.interceptors().response.use_interceptor(tag_response(&log, "S2"));

    client.get("/order").await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["R2", "R1", "dispatch /order", "S1", "S2"]
    );
}

#[tokio::test]
async fn test_ejected_interceptor_is_skipped() {
    let log = Log::default();
    let client = logging_client(&log, 200);
    let first = client.interceptors().request.use_interceptor(tag_request(&log, "R1"));
    client.interceptors().request.use_interceptor(tag_request(&log, "R2"));
    client.interceptors().request.eject(first);
    client.interceptors().request.eject(first);

    client.get("/eject").await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["R2", "dispatch /eject"]);
}

#[tokio::test]
async fn test_request_interceptor_changes_config() {
    let log = Log::default();
    let client = logging_client(&log, 200);
    client
        .interceptors()
        .request
        .use_interceptor(Interceptor::new(|config: RequestConfig| async move {
            Ok(config.param("token", "abc"))
        }));

    let response = client.get("/users").await.unwrap();

    assert_eq!(response.request.url, "/users?token=abc");
}

#[tokio::test]
async fn test_rejected_handler_recovers_status_error() {
    let log = Log::default();
    let client = logging_client(&log, 503);
    client.interceptors().response.use_interceptor(
        Interceptor::sync(Ok).with_rejected(|err: ClientError| async move {
            err.into_response().map(|mut response| {
                response.data = Data::from("fallback");
                response
            })
        }),
    );

    let response = client.get("/flaky").await.unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(response.data, Data::from("fallback"));
}

#[tokio::test]
async fn test_failure_skips_resolved_handlers() {
    let log = Log::default();
    let client = logging_client(&log, 500);
    client.interceptors().response.use_interceptor(tag_response(&log, "S1"));

    let err = client.get("/broken").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Request failed with status code 500");
    assert_eq!(*log.lock().unwrap(), vec!["dispatch /broken"]);
}

#[tokio::test]
async fn test_status_boundaries() {
    for (status, ok) in [(199, false), (200, true), (299, true), (300, false), (404, false)] {
        let client = logging_client(&Log::default(), status);
        let result = client.get("/status").await;
        assert_eq!(result.is_ok(), ok, "status {status}");
    }
}

#[tokio::test]
async fn test_cancel_before_send_skips_transport() {
    let log = Log::default();
    let client = logging_client(&log, 200);
    let source = CancelToken::source();
    source.cancel.cancel("too late");

    let err = client
        .get_with_config("/never", RequestConfig::new().cancel_token(source.token.clone()))
        .await
        .unwrap_err();

    assert!(is_cancel(&err));
    assert_eq!(err.to_string(), "too late");
    assert_eq!(err.config().and_then(|c| c.url.as_deref()), Some("/never"));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_after_success_is_ignored() {
    let log = Log::default();
    let client = logging_client(&log, 200);
    let source = CancelToken::source();

    let response = client
        .get_with_config("/done", RequestConfig::new().cancel_token(source.token.clone()))
        .await
        .unwrap();
    assert!(source.cancel.cancel("after the fact"));

    assert_eq!(response.status, 200);
    assert_eq!(response.data, Data::Json(json!({ "ok": true })));
    assert!(response.config.cancel_token.as_ref().is_some_and(|t| t.is_cancelled()));
    assert_eq!(*log.lock().unwrap(), vec!["dispatch /done"]);
}

#[tokio::test]
async fn test_cancel_in_flight() {
    let client = Client::with_transport(transport_fn(|_request: TransportRequest| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(RawResponse::new(200, "late"))
    }));
    let source = CancelToken::source();
    let call = client.get_with_config("/slow", RequestConfig::new().cancel_token(source.token.clone()));

    let canceler = source.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceler.cancel("user aborted");
    });

    let err = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("cancellation should settle the request")
        .unwrap_err();
    assert!(err.is_cancel());
    assert_eq!(err.code(), Some("ERR_CANCELED"));
    assert_eq!(err.to_string(), "user aborted");
    assert_eq!(err.config().and_then(|c| c.url.as_deref()), Some("/slow"));
}

#[tokio::test]
async fn test_timeout() {
    let client = Client::with_transport(transport_fn(|_request: TransportRequest| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(RawResponse::new(200, "late"))
    }));

    let err = client
        .get_with_config("/slow", RequestConfig::new().timeout(Duration::from_millis(25)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "Timeout of 25 ms exceeded");
    assert_eq!(err.config().and_then(|c| c.url.as_deref()), Some("/slow"));
}

#[tokio::test]
async fn test_json_round_trip_and_headers() {
    let seen: Arc<Mutex<Option<TransportRequest>>> = Arc::default();
    let record = Arc::clone(&seen);
    let client = ClientBuilder::new()
        .base_url("https://api.example.com/v1")
        .header("X-Client", "pipeline")
        .transport(transport_fn(move |request: TransportRequest| {
            let record = Arc::clone(&record);
            async move {
                *record.lock().unwrap() = Some(request);
                Ok(RawResponse::new(201, r#"{"id":7}"#).with_header("content-type", "application/json"))
            }
        }))
        .build()
        .unwrap();

    let response = client.post("/users", json!({ "name": "ada" })).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.data, Data::Json(json!({ "id": 7 })));

    let request = seen.lock().unwrap().take().unwrap();
    assert_eq!(request.url, "https://api.example.com/v1/users");
    assert_eq!(request.headers["content-type"], "application/json;charset=utf-8");
    assert_eq!(request.headers["x-client"], "pipeline");
    assert_eq!(request.data, Some(Data::from(r#"{"name":"ada"}"#)));
}

#[tokio::test]
async fn test_xsrf_header_for_same_origin() {
    let seen: Arc<Mutex<Option<TransportRequest>>> = Arc::default();
    let record = Arc::clone(&seen);
    let client = ClientBuilder::new()
        .origin("https://app.example.com")
        .cookie_jar(MemoryCookieJar::new("theme=dark; XSRF-TOKEN=s3cr3t"))
        .transport(transport_fn(move |request: TransportRequest| {
            let record = Arc::clone(&record);
            async move {
                *record.lock().unwrap() = Some(request);
                Ok(RawResponse::new(200, ""))
            }
        }))
        .build()
        .unwrap();

    client.get("/profile").await.unwrap();
    let request = seen.lock().unwrap().take().unwrap();
    assert_eq!(request.headers["x-xsrf-token"], "s3cr3t");

    client.get("https://other.example.com/profile").await.unwrap();
    let request = seen.lock().unwrap().take().unwrap();
    assert!(!request.headers.contains_key("x-xsrf-token"));
}
