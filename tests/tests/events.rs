use std::time::Duration;

use glimpse::{LoadConfig, LoadState};
use glimpse_core::ResourceDescriptor;
use glimpse_events::{Event, EventBus, LoadEvent, ProbeEvent};
use glimpse_test_utils::{Reply, Script, ScriptedNet};
use rstest::rstest;
use tokio::sync::broadcast;

use crate::common::{loader, origin};

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn failed_then_retried_load_emits_full_sequence() {
    let net = ScriptedNet::new(Script::new().route("/photo.jpg", [Reply::status(500), Reply::ok("jpeg")]));
    let bus = EventBus::new(32);
    let mut rx = bus.subscribe();

    let session = loader(&net, false)
        .mount(
            ResourceDescriptor::new("photo.jpg"),
            LoadConfig::new()
                .with_origin(origin())
                .with_priority(true)
                .with_alternate_encoding(false)
                .with_events(bus),
        )
        .unwrap();
    let id = session.id().get();

    session.settled().await;
    assert!(session.retry());
    let snap = session
        .wait_for(|s| s.attempt_count == 2 && s.state == LoadState::Loaded)
        .await;
    assert!(snap.load_duration.is_some());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 6, "{events:?}");
    assert_eq!(
        events[0],
        Event::Load(LoadEvent::Started {
            session: id,
            attempt: 1,
        })
    );
    assert_eq!(
        events[1],
        Event::Load(LoadEvent::Requested {
            session: id,
            attempt: 1,
            uri: "http://images.test/photo.jpg".into(),
            preview: false,
        })
    );
    assert!(matches!(
        &events[2],
        Event::Load(LoadEvent::Errored { session, attempt: 1, attempts_remaining: 2, error })
            if *session == id && error.contains("500")
    ));
    assert!(matches!(
        &events[3],
        Event::Load(LoadEvent::Started { attempt: 2, .. })
    ));
    assert!(matches!(
        &events[4],
        Event::Load(LoadEvent::Requested { attempt: 2, preview: false, .. })
    ));
    assert!(matches!(
        &events[5],
        Event::Load(LoadEvent::Loaded { session, uri, .. })
            if *session == id && uri == "http://images.test/photo.jpg"
    ));
    assert!(events.iter().all(|e| matches!(e, Event::Load(l) if l.session() == id)));
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn probe_resolution_is_published_on_shared_bus() {
    let net = ScriptedNet::always("/photo.webp", Reply::ok("webp"));
    let bus = EventBus::new(32);
    let mut rx = bus.subscribe();
    let prober = std::sync::Arc::new(glimpse::CapabilityProber::new(
        std::sync::Arc::new(crate::common::CountingDecode::supported()),
        glimpse::ProbeOptions::default().with_events(bus.clone()),
    ));

    let session = glimpse::Loader::new(net)
        .with_prober(prober)
        .mount(
            ResourceDescriptor::new("photo.jpg"),
            LoadConfig::new()
                .with_origin(origin())
                .with_priority(true)
                .with_events(bus),
        )
        .unwrap();
    assert_eq!(session.settled().await.state, LoadState::Loaded);

    let events = drain(&mut rx);
    let probes: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::Probe(_)))
        .collect();
    assert_eq!(probes, [&Event::Probe(ProbeEvent::Resolved { supported: true })]);

    // The request names the negotiated source, not the descriptor's base.
    let requested: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Load(LoadEvent::Requested { uri, .. }) => Some(uri.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(requested, ["http://images.test/photo.webp"]);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn sessions_without_bus_stay_silent() {
    let net = ScriptedNet::always("/photo.jpg", Reply::ok("jpeg"));
    let bus = EventBus::new(8);
    let mut rx = bus.subscribe();

    let session = loader(&net, false)
        .mount(
            ResourceDescriptor::new("photo.jpg"),
            LoadConfig::new().with_origin(origin()).with_priority(true),
        )
        .unwrap();
    session.settled().await;
    drop(session);

    assert!(drain(&mut rx).is_empty());
}
