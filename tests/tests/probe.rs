use std::{sync::Arc, time::Duration};

use glimpse::{CapabilityProber, ImageDecodeAttempt, ProbeOptions};
use rstest::rstest;

use crate::common::CountingDecode;

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn global_prober_decodes_reference_asset() {
    let prober = CapabilityProber::global();
    assert!(prober.probe().await);
    assert_eq!(CapabilityProber::global().cached(), Some(true));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_decode() {
    let decode = CountingDecode::supported().with_delay(Duration::from_millis(100));
    let prober = decode.prober();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let prober = Arc::clone(&prober);
            tokio::spawn(async move { prober.probe().await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert_eq!(decode.calls(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn abandoned_probe_is_resumed_not_restarted() {
    let decode = CountingDecode::supported().with_delay(Duration::from_millis(100));
    let prober = decode.prober();

    let early = tokio::time::timeout(Duration::from_millis(10), prober.probe()).await;
    assert!(early.is_err());
    assert_eq!(prober.cached(), None);

    assert!(prober.probe().await);
    assert_eq!(decode.calls(), 1);
}

#[rstest]
#[case::unsupported(CountingDecode::unsupported(), false)]
#[case::supported(CountingDecode::supported(), true)]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn outcome_is_sticky(#[case] decode: CountingDecode, #[case] expected: bool) {
    let prober = decode.prober();
    for _ in 0..3 {
        assert_eq!(prober.probe().await, expected);
    }
    assert_eq!(prober.cached(), Some(expected));
    assert_eq!(decode.calls(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn slow_decode_falls_back_to_unsupported() {
    let decode = CountingDecode::supported().with_delay(Duration::from_millis(300));
    let prober = CapabilityProber::new(
        Arc::new(decode.clone()),
        ProbeOptions::default().with_timeout(Duration::from_millis(20)),
    );
    assert!(!prober.probe().await);
    assert!(!prober.probe().await);
    assert_eq!(decode.calls(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn private_probers_do_not_share_outcomes() {
    let a = CapabilityProber::new(Arc::new(ImageDecodeAttempt), ProbeOptions::default());
    let b = CountingDecode::unsupported().prober();
    assert!(a.probe().await);
    assert!(!b.probe().await);
}
