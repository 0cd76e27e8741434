use std::time::Duration;

use glimpse::{LoadConfig, LoadError, LoadState, Loader};
use glimpse_core::{DensityTiers, ResourceDescriptor, RetryPolicy};
use glimpse_net::{HttpClient, NetError, NetOptions};
use glimpse_test_utils::{Reply, Script, TestHttpServer};
use rstest::rstest;

use crate::common::CountingDecode;

fn loader(supported: bool) -> Loader {
    let decode = if supported {
        CountingDecode::supported()
    } else {
        CountingDecode::unsupported()
    };
    Loader::new(HttpClient::new(NetOptions::default()).unwrap()).with_prober(decode.prober())
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn loads_alternate_encoding_over_http() {
    let script = Script::new().route("/img/photo.webp", [Reply::ok("webp")]);
    let server = TestHttpServer::scripted(script.clone()).await;

    let session = loader(true)
        .mount(
            ResourceDescriptor::new("img/photo.jpg").with_density_tiers(DensityTiers::new([400]).unwrap()),
            LoadConfig::new()
                .with_origin(server.base_url().clone())
                .with_priority(true),
        )
        .unwrap();

    let snap = session.settled().await;
    assert_eq!(snap.state, LoadState::Loaded);
    assert_eq!(snap.active_uri, Some(server.url("/img/photo.webp")));
    assert!(snap.load_duration.is_some());
    assert_eq!(script.requested_paths(), vec!["/img/photo.webp".to_string()]);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn recovers_after_server_error() {
    let script = Script::new().route("/photo.jpg", [Reply::status(503), Reply::ok("jpeg")]);
    let server = TestHttpServer::scripted(script.clone()).await;

    let session = loader(false)
        .mount(
            ResourceDescriptor::new(server.url("/photo.jpg").to_string()),
            LoadConfig::new()
                .with_priority(true)
                .with_retry(RetryPolicy::new(2)),
        )
        .unwrap();

    let failed = session.settled().await;
    assert_eq!(failed.state, LoadState::Errored);
    assert!(matches!(
        failed.last_error,
        Some(LoadError::FetchFailed(NetError::HttpStatus { status: 503, .. }))
    ));
    assert_eq!(failed.attempts_remaining, 1);

    assert!(session.retry());
    let snap = session
        .wait_for(|s| s.attempt_count == 2 && s.state.is_settled())
        .await;
    assert_eq!(snap.state, LoadState::Loaded);
    assert_eq!(snap.attempts_remaining, 0);
    assert_eq!(script.hits("/photo.jpg"), 2);
}
