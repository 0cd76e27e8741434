use std::time::Duration;

use glimpse::{LoadConfig, LoadState, PROGRESS_CAP, PROGRESS_TICK};
use glimpse_core::ResourceDescriptor;
use glimpse_test_utils::{Reply, ScriptedNet};

use crate::common::{loader, origin};

fn config(show_progress: bool) -> LoadConfig {
    LoadConfig::new()
        .with_origin(origin())
        .with_priority(true)
        .with_alternate_encoding(false)
        .with_progress(show_progress)
}

#[tokio::test(start_paused = true)]
async fn estimate_climbs_but_stays_capped_until_loaded() {
    let net = ScriptedNet::always("/photo.jpg", Reply::ok("jpeg")).gated();
    let session = loader(&net, false)
        .mount(ResourceDescriptor::new("photo.jpg"), config(true))
        .unwrap();
    assert_eq!(session.snapshot().progress_estimate, 0);

    let moving = session.wait_for(|s| s.progress_estimate > 0).await;
    assert_eq!(moving.state, LoadState::Loading);

    let mut last = moving.progress_estimate;
    for _ in 0..50 {
        tokio::time::sleep(PROGRESS_TICK).await;
        let snap = session.snapshot();
        assert_eq!(snap.state, LoadState::Loading);
        assert!(snap.progress_estimate >= last);
        assert!(snap.progress_estimate <= PROGRESS_CAP);
        last = snap.progress_estimate;
    }

    net.release(1);
    let done = session.settled().await;
    assert_eq!(done.state, LoadState::Loaded);
    assert_eq!(done.progress_estimate, 100);
}

#[tokio::test(start_paused = true)]
async fn estimate_stays_zero_when_disabled() {
    let net = ScriptedNet::always("/photo.jpg", Reply::ok("jpeg")).gated();
    let session = loader(&net, false)
        .mount(ResourceDescriptor::new("photo.jpg"), config(false))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snap = session.snapshot();
    assert_eq!(snap.state, LoadState::Loading);
    assert_eq!(snap.progress_estimate, 0);

    net.release(1);
    assert_eq!(session.settled().await.progress_estimate, 100);
}

#[tokio::test(start_paused = true)]
async fn failure_resets_estimate() {
    let net = ScriptedNet::always("/photo.jpg", Reply::status(502)).gated();
    let session = loader(&net, false)
        .mount(ResourceDescriptor::new("photo.jpg"), config(true))
        .unwrap();
    session.wait_for(|s| s.progress_estimate > 0).await;

    net.release(1);
    let snap = session.settled().await;
    assert_eq!(snap.state, LoadState::Errored);
    assert_eq!(snap.progress_estimate, 0);
}
