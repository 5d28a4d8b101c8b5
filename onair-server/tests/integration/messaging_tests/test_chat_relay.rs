use onair_core::{ConnectionId, Role, SignalMessage};
use onair_server::{RoomError, ServerConfig};
use serde_json::json;

use crate::integration::{
    TestCoordinator, create_test_coordinator, create_test_coordinator_with_ledger, init_tracing,
};
use crate::utils::{RecordingLedger, room};

#[tokio::test]
async fn test_chat_reaches_others_and_ledger() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let streamer = ConnectionId::new();
    let watcher = ConnectionId::new();
    let r = room("r1");
    t.coordinator.join(&r, streamer, Role::Streamer).await.unwrap();
    t.coordinator.join(&r, watcher, Role::Watcher).await.unwrap();
    t.signaling.clear();

    t.coordinator
        .relay_chat(&r, &watcher, json!({ "text": "hello" }))
        .unwrap();

    assert_eq!(
        t.signaling.received_by(&streamer),
        vec![SignalMessage::Chat {
            room: r.clone(),
            from: Some(watcher),
            payload: json!({ "text": "hello" }),
        }]
    );
    assert!(t.signaling.received_by(&watcher).is_empty());

    assert!(t.ledger.wait_for_entries(1, 5000).await);
    let entries = t.ledger.entries();
    assert_eq!(entries[0].room, r);
    assert_eq!(entries[0].from, watcher);
    assert_eq!(entries[0].payload, json!({ "text": "hello" }));
}

#[tokio::test]
async fn test_failing_ledger_does_not_fail_chat() {
    init_tracing();

    let t = create_test_coordinator_with_ledger(ServerConfig::default(), RecordingLedger::failing());
    let a = ConnectionId::new();
    let b = ConnectionId::new();
    let r = room("r1");
    t.coordinator.join(&r, a, Role::Watcher).await.unwrap();
    t.coordinator.join(&r, b, Role::Watcher).await.unwrap();
    t.signaling.clear();

    for i in 0..3 {
        t.coordinator
            .relay_chat(&r, &a, json!(i))
            .expect("chat relay must not depend on the ledger");
    }

    assert_eq!(t.signaling.received_by(&b).len(), 3);
    assert!(t.ledger.wait_for_entries(3, 5000).await);
}

#[tokio::test]
async fn test_chat_from_outsider_is_rejected() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let member = ConnectionId::new();
    let r = room("r1");
    t.coordinator.join(&r, member, Role::Watcher).await.unwrap();
    t.signaling.clear();

    let err = t
        .coordinator
        .relay_chat(&r, &ConnectionId::new(), json!("spam"))
        .unwrap_err();

    assert!(matches!(err, RoomError::NotFound(_)));
    assert_eq!(t.signaling.total(), 0);
    assert!(t.ledger.entries().is_empty());
}

#[tokio::test]
async fn test_ledger_drains_once_coordinator_is_dropped() {
    init_tracing();

    let TestCoordinator {
        coordinator,
        ledger,
        ledger_task,
        ..
    } = create_test_coordinator(ServerConfig::default());
    let a = ConnectionId::new();
    let b = ConnectionId::new();
    let r = room("r1");
    coordinator.join(&r, a, Role::Watcher).await.unwrap();
    coordinator.join(&r, b, Role::Watcher).await.unwrap();

    coordinator.relay_chat(&r, &a, json!("one")).unwrap();
    coordinator.relay_chat(&r, &b, json!("two")).unwrap();
    drop(coordinator);

    ledger_task.await.unwrap();

    let payloads: Vec<_> = ledger.entries().into_iter().map(|e| e.payload).collect();
    assert_eq!(payloads, vec![json!("one"), json!("two")]);
}
