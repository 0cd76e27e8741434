use std::time::Duration;

use glimpse::{BatchProgress, LoadConfig, LoadError, LoadState, Rect, ViewportObserver};
use glimpse_core::{CoreError, ResourceDescriptor};
use glimpse_test_utils::{Reply, Script, ScriptedNet};
use rstest::rstest;

use crate::common::{CallCounter, loader, origin};

fn net() -> ScriptedNet {
    ScriptedNet::new(
        Script::new()
            .route("/a.jpg", [Reply::ok("jpeg")])
            .route("/b.jpg", [Reply::status(500), Reply::ok("jpeg")])
            .route("/c.jpg", [Reply::ok("jpeg")]),
    )
}

fn descriptors() -> Vec<ResourceDescriptor> {
    ["a.jpg", "b.jpg", "c.jpg"]
        .into_iter()
        .map(ResourceDescriptor::new)
        .collect()
}

fn config() -> LoadConfig {
    LoadConfig::new().with_origin(origin()).with_priority(true)
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn batch_tracks_members_and_retries_failures() {
    let net = net();
    let loads = CallCounter::default();
    let batch = loader(&net, false)
        .mount_batch(descriptors(), config().on_load(loads.callback()))
        .unwrap();
    assert_eq!(batch.len(), 3);

    let progress = batch.settled().await;
    assert_eq!(
        progress,
        BatchProgress {
            total: 3,
            loaded: 2,
            failed: 1,
        }
    );
    assert!(progress.is_settled());
    assert!(!progress.is_all_loaded());
    assert_eq!(batch.indices_in(LoadState::Errored), [1]);
    assert_eq!(batch.indices_in(LoadState::Loaded), [0, 2]);

    assert_eq!(batch.retry_failed(), 1);
    batch
        .get(1)
        .unwrap()
        .wait_for(|s| s.state == LoadState::Loaded)
        .await;
    let progress = batch.progress();
    assert!(progress.is_all_loaded());
    assert_eq!(progress.pending(), 0);
    assert_eq!(net.hits("/b.jpg"), 2);

    // Nothing left to retry.
    assert_eq!(batch.retry_failed(), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(loads.get(), 3);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn invalid_member_mounts_nothing() {
    let net = net();
    let mut members = descriptors();
    members.insert(1, ResourceDescriptor::new(" "));

    let err = loader(&net, false).mount_batch(members, config()).unwrap_err();
    assert_eq!(err, LoadError::DescriptorInvalid(CoreError::EmptyBaseUri));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(net.total_hits(), 0);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn members_share_one_visibility_region() {
    let net = net();
    let observer = ViewportObserver::new();
    observer.set_viewport(Rect::new(0.0, 0.0, 1000.0, 800.0));
    let batch = loader(&net, false)
        .with_monitor(observer.clone())
        .mount_batch(descriptors(), LoadConfig::new().with_origin(origin()))
        .unwrap();

    let region = batch.get(0).unwrap().region();
    assert!(batch.sessions().iter().all(|s| s.region() == region));
    assert_eq!(observer.pending_count(), 3);
    assert_eq!(batch.progress().pending(), 3);

    observer.update_region(region, Rect::new(0.0, 100.0, 300.0, 300.0));
    let progress = batch.settled().await;
    assert_eq!(progress.loaded + progress.failed, 3);
    assert_eq!(observer.pending_count(), 0);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn unmounting_batch_stops_every_member() {
    let net = net().gated();
    let batch = loader(&net, false).mount_batch(descriptors(), config()).unwrap();

    batch.unmount();
    net.release(3);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(batch.sessions().iter().all(|s| !s.is_mounted()));
    assert_eq!(batch.progress().pending(), 3);
}

#[test]
fn empty_batch_is_never_all_loaded() {
    assert!(!BatchProgress::default().is_all_loaded());
    assert!(BatchProgress::default().is_settled());
}
