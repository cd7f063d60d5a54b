//! End-to-end tests: simulated traffic through the full pipeline.
//!
//! A pool generates join/leave traffic on the loopback broker; a monitor
//! watches the presence companion channel, normalizes every envelope, and
//! folds it into a reconciler. These tests cover the whole
//! stream -> normalize -> apply path plus the bootstrap-before-live flow.

use futures::StreamExt;

use presence_client::{LoopbackBroker, SnapshotService, Transport};
use presence_core::{HistoryLog, MembershipReconciler, normalize};
use presence_sim::SimulatedClientPool;
use presence_types::PresenceAction;

/// Drain `n` envelopes from the stream into the reconciler.
async fn apply_n(
    stream: &mut presence_client::EventStream,
    reconciler: &mut MembershipReconciler,
    n: usize,
) {
    for _ in 0..n {
        let Some(envelope) = stream.next().await else {
            return;
        };
        if let Some(event) = normalize(&envelope) {
            reconciler.apply(&event);
        }
    }
}

#[tokio::test]
async fn pool_join_reaches_the_reconciler() {
    let broker = LoopbackBroker::new();
    let monitor = broker.handle("monitor");
    let mut stream = monitor
        .subscribe("room-1-pnpres")
        .await
        .unwrap_or_else(|_| Box::pin(futures::stream::empty()));

    let mut pool = SimulatedClientPool::new(broker.clone());
    let id = pool.create().await.unwrap_or_default();
    let name = pool
        .identity(id)
        .map(|i| i.display_name.clone())
        .unwrap_or_default();
    assert!(pool.connect(id, "room-1").await.is_ok());

    let envelope = stream.next().await.unwrap_or_default();
    let event = normalize(&envelope);
    assert!(event.is_some(), "pool traffic must normalize");
    let event = event.unwrap_or_else(|| presence_types::PresenceEvent::bare("", ""));
    assert_eq!(event.base_channel, "room-1");
    assert_eq!(event.action, Some(PresenceAction::Join));
    assert_eq!(event.uuid.as_deref(), Some(name.as_str()));

    let mut reconciler = MembershipReconciler::new();
    reconciler.apply(&event);
    assert_eq!(reconciler.members("room-1"), vec![name]);
    assert_eq!(reconciler.occupancy("room-1"), 1);
}

#[tokio::test]
async fn leave_traffic_removes_membership() {
    let broker = LoopbackBroker::new();
    let monitor = broker.handle("monitor");
    let mut stream = monitor
        .subscribe("room-1-pnpres")
        .await
        .unwrap_or_else(|_| Box::pin(futures::stream::empty()));

    let mut pool = SimulatedClientPool::new(broker.clone());
    let id = pool.create().await.unwrap_or_default();
    assert!(pool.connect(id, "room-1").await.is_ok());
    assert!(pool.disconnect(id).await.is_ok());

    let mut reconciler = MembershipReconciler::new();
    apply_n(&mut stream, &mut reconciler, 2).await;
    assert!(reconciler.members("room-1").is_empty());
    // The leave envelope carried occupancy zero, which also reset the
    // channel authoritatively.
    assert_eq!(reconciler.occupancy("room-1"), 0);
}

#[tokio::test]
async fn bootstrap_then_live_traffic() {
    let broker = LoopbackBroker::new();

    // Two identities are already on the channel before the monitor looks.
    let mut pool = SimulatedClientPool::new(broker.clone());
    let first = pool.create().await.unwrap_or_default();
    let second = pool.create().await.unwrap_or_default();
    assert!(pool.connect(first, "room-1").await.is_ok());
    assert!(pool.connect(second, "room-1").await.is_ok());

    let monitor = broker.handle("monitor");
    let service = SnapshotService::new(&monitor);
    let mut history = HistoryLog::new();
    let mut reconciler = MembershipReconciler::new();

    // Bootstrap from the snapshot, then attach the live stream.
    let snapshot = service.here_now("room-1", &mut history).await.ok();
    assert!(snapshot.is_some());
    if let Some(snapshot) = snapshot {
        reconciler.bootstrap("room-1", snapshot.uuids, snapshot.occupancy);
    }
    assert_eq!(reconciler.occupancy("room-1"), 2);

    let mut stream = monitor
        .subscribe("room-1-pnpres")
        .await
        .unwrap_or_else(|_| Box::pin(futures::stream::empty()));

    // One identity leaves after the bootstrap.
    let gone = pool
        .identity(first)
        .map(|i| i.display_name.clone())
        .unwrap_or_default();
    assert!(pool.disconnect(first).await.is_ok());
    apply_n(&mut stream, &mut reconciler, 1).await;

    let members = reconciler.members("room-1");
    assert_eq!(members.len(), 1);
    assert!(!members.contains(&gone));
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn rename_produces_leave_then_join() {
    let broker = LoopbackBroker::new();
    let monitor = broker.handle("monitor");
    let mut stream = monitor
        .subscribe("room-1-pnpres")
        .await
        .unwrap_or_else(|_| Box::pin(futures::stream::empty()));

    let mut pool = SimulatedClientPool::new(broker.clone());
    let id = pool.create().await.unwrap_or_default();
    assert!(pool.connect(id, "room-1").await.is_ok());

    let mut reconciler = MembershipReconciler::new();
    apply_n(&mut stream, &mut reconciler, 1).await;

    assert!(pool.rename(id, "sim-renamed-0001").await.is_ok());
    apply_n(&mut stream, &mut reconciler, 2).await;

    // The old identity left, the new one joined.
    assert_eq!(reconciler.members("room-1"), vec!["sim-renamed-0001"]);
}

#[tokio::test]
async fn bulk_removal_then_fresh_bootstrap_sees_empty_channel() {
    let broker = LoopbackBroker::new();
    let mut pool = SimulatedClientPool::new(broker.clone());
    for _ in 0..4 {
        let id = pool.create().await.unwrap_or_default();
        let _ = pool.connect(id, "room-1").await;
    }
    assert_eq!(pool.remove_all().await, 4);

    let monitor = broker.handle("monitor");
    let service = SnapshotService::new(&monitor);
    let mut history = HistoryLog::new();
    let snapshot = service.here_now("room-1", &mut history).await.ok();

    let mut reconciler = MembershipReconciler::new();
    if let Some(snapshot) = snapshot {
        reconciler.bootstrap("room-1", snapshot.uuids, snapshot.occupancy);
    }
    assert!(reconciler.members("room-1").is_empty());
    assert_eq!(reconciler.occupancy("room-1"), 0);
}

#[tokio::test]
async fn where_now_tracks_pool_connections() {
    let broker = LoopbackBroker::new();
    let mut pool = SimulatedClientPool::new(broker.clone());
    let id = pool.create().await.unwrap_or_default();
    let name = pool
        .identity(id)
        .map(|i| i.display_name.clone())
        .unwrap_or_default();
    assert!(pool.connect(id, "room-7").await.is_ok());

    let monitor = broker.handle("monitor");
    let service = SnapshotService::new(&monitor);
    let mut history = HistoryLog::new();
    let response = service.where_now(&name, &mut history).await.ok();
    assert_eq!(response.map(|r| r.channels), Some(vec![String::from("room-7")]));
}
