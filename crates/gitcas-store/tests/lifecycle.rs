//! Activation, background flushing, and deactivation of the store.

mod common;

use std::time::Duration;

use common::{eventually, settle, Harness};
use gitcas_core::ContentDigest;
use gitcas_store::{BatchStage, StoreError};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_loop_settles_uploads() {
    let h = Harness::new(1024);
    h.store.activate(h.gateway.clone()).expect("activate");
    assert!(h.store.is_active());

    let url = tokio::time::timeout(
        Duration::from_secs(5),
        h.store.upload_bytes(b"looped".to_vec(), Some("l.txt")),
    )
    .await
    .expect("settled in time")
    .expect("upload");
    assert!(url.ends_with("-l.txt"));
    assert_eq!(h.gateway.commits(), 1);

    h.store.deactivate().await;
    assert!(!h.store.is_active());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uploads_before_activation_wait_for_the_loop() {
    let h = Harness::new(1024);
    let hash = ContentDigest::of(b"early");
    let up = h.spawn_upload(b"early".to_vec(), "e.txt");
    eventually(|| h.store.queue().contains(&hash)).await;

    h.store.activate(h.gateway.clone()).expect("activate");
    assert!(settle(up).await.is_ok());
    h.store.deactivate().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_activation_is_rejected() {
    let h = Harness::new(1024);
    h.store.activate(h.gateway.clone()).expect("activate");
    assert!(matches!(
        h.store.activate(h.gateway.clone()),
        Err(StoreError::AlreadyActive)
    ));
    h.store.deactivate().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deactivation_rejects_pending_and_blocks_reuse() {
    // A long interval keeps the loop from flushing during the test.
    let h = Harness::with_config(|cfg| cfg.flush_interval = Duration::from_secs(3600));
    h.store.activate(h.gateway.clone()).expect("activate");

    let hash = ContentDigest::of(b"pending");
    let up = h.spawn_upload(b"pending".to_vec(), "p.txt");
    eventually(|| h.store.queue().contains(&hash)).await;

    h.store.deactivate().await;
    match settle(up).await {
        Err(StoreError::Batch(f)) => assert_eq!(f.stage, BatchStage::Shutdown),
        other => panic!("expected shutdown failure, got {other:?}"),
    }
    assert!(h.store.queue().is_empty());
    assert_eq!(h.gateway.commits(), 0);

    assert!(matches!(
        h.store.upload_bytes(b"late".to_vec(), Some("l.txt")).await,
        Err(StoreError::Inactive)
    ));
    assert!(matches!(
        h.store.activate(h.gateway.clone()),
        Err(StoreError::Inactive)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loop_survives_failed_batches() {
    let h = Harness::new(1024);
    h.gateway.fail_pushes(true);
    h.store.activate(h.gateway.clone()).expect("activate");

    let first = h.store.upload_bytes(b"one".to_vec(), Some("1.txt")).await;
    assert!(matches!(first, Err(StoreError::Batch(_))));

    h.gateway.fail_pushes(false);
    let second = tokio::time::timeout(
        Duration::from_secs(5),
        h.store.upload_bytes(b"two".to_vec(), Some("2.txt")),
    )
    .await
    .expect("settled in time");
    assert!(second.is_ok());
    h.store.deactivate().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backlog_drains_without_waiting_between_batches() {
    let interval = Duration::from_millis(1500);
    let h = Harness::with_config(|cfg| {
        cfg.branch_capacity = 5;
        cfg.flush_interval = interval;
    });
    let first = h.spawn_upload(b"aaaa".to_vec(), "a.txt");
    let second = h.spawn_upload(b"bbbb".to_vec(), "b.txt");
    eventually(|| h.store.queue().len() == 2).await;

    let started = tokio::time::Instant::now();
    h.store.activate(h.gateway.clone()).expect("activate");
    let first = settle(first).await.expect("first upload");
    let second = settle(second).await.expect("second upload");
    let elapsed = started.elapsed();

    // One interval before the first batch, none before the second.
    assert!(
        elapsed < interval + interval / 2,
        "backlog took {elapsed:?} with a {interval:?} interval"
    );
    assert_eq!(h.gateway.commits(), 2);
    // Enqueue order between the two spawned uploads is not fixed.
    let mut on_first = [first.contains("@00000001/"), second.contains("@00000001/")];
    on_first.sort();
    assert_eq!(on_first, [false, true]);
    assert!(first.contains("@00000002/") || second.contains("@00000002/"));
    h.store.deactivate().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unnamed_unknown_content_is_rejected_locally() {
    let h = Harness::new(1024);
    let err = h
        .store
        .upload_bytes(b"plain text".to_vec(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(h.store.queue().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stats_reflect_committed_records() {
    let h = Harness::new(1024);
    h.seed("a", 3, 1).await;
    h.seed("b", 4, 1).await;
    let stats = h.store.stats().await.expect("stats");
    assert_eq!(stats.asset_count, 2);
    assert_eq!(stats.asset_size, 7);
}
