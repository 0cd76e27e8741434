use std::time::Duration;

use axum::{Router, http::HeaderMap, routing::get};
use bytes::Bytes;
use glimpse_net::{Headers, HttpClient, Net, NetError, NetExt, NetOptions};
use glimpse_test_utils::{Reply, Script, TestHttpServer};
use rstest::rstest;

fn client() -> HttpClient {
    HttpClient::new(NetOptions::default()).unwrap()
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn get_bytes_returns_body() {
    let server = TestHttpServer::scripted(Script::new().route("/photo.jpg", [Reply::ok("jpeg")])).await;
    let body = client().get_bytes(server.url("/photo.jpg"), None).await.unwrap();
    assert_eq!(body, Bytes::from_static(b"jpeg"));
}

#[rstest]
#[case::not_found("/missing.jpg", 404, false)]
#[case::server_error("/broken.jpg", 503, true)]
#[case::throttled("/busy.jpg", 429, true)]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn non_success_status_is_an_error(#[case] path: &str, #[case] status: u16, #[case] retryable: bool) {
    let script = Script::new()
        .route("/broken.jpg", [Reply::status(503)])
        .route("/busy.jpg", [Reply::status(429)]);
    let server = TestHttpServer::scripted(script).await;

    let err = client().get_bytes(server.url(path), None).await.unwrap_err();
    assert_eq!(err.status_code(), Some(status));
    assert_eq!(err.is_retryable(), retryable);
    assert!(matches!(err, NetError::HttpStatus { .. }));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn custom_headers_are_sent() {
    let router = Router::new().route(
        "/private.jpg",
        get(|headers: HeaderMap| async move {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        }),
    );
    let server = TestHttpServer::new(router).await;

    let mut headers = Headers::new();
    headers.insert("Authorization", "Bearer token");
    let body = client()
        .get_bytes(server.url("/private.jpg"), Some(headers))
        .await
        .unwrap();
    assert_eq!(body, Bytes::from_static(b"Bearer token"));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn request_timeout_option_applies() {
    let script = Script::new().route("/slow.jpg", [Reply::ok("late").with_delay(Duration::from_secs(2))]);
    let server = TestHttpServer::scripted(script).await;
    let client = HttpClient::new(NetOptions::default().with_request_timeout(Duration::from_millis(100))).unwrap();

    let err = client.get_bytes(server.url("/slow.jpg"), None).await.unwrap_err();
    assert!(err.is_timeout());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn timeout_decorator_bounds_slow_server() {
    let script = Script::new().route("/slow.jpg", [Reply::ok("late").with_delay(Duration::from_secs(2))]);
    let server = TestHttpServer::scripted(script).await;
    let net = client().with_timeout(Duration::from_millis(100));

    let err = net.get_bytes(server.url("/slow.jpg"), None).await.unwrap_err();
    assert_eq!(err, NetError::Timeout);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Bind and drop to get a port nobody listens on.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let url = url::Url::parse(&format!("http://{addr}/photo.jpg")).unwrap();

    let err = client().get_bytes(url, None).await.unwrap_err();
    assert!(matches!(err, NetError::Http(_)));
    assert!(err.is_retryable());
}
