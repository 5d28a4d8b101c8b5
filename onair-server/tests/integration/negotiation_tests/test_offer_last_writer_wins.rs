use onair_core::{ConnectionId, Role};
use onair_server::{RoomError, ServerConfig};

use crate::integration::{create_test_coordinator, init_tracing};
use crate::utils::{negotiation_only, offer, room, sdp};

#[tokio::test]
async fn test_late_watcher_sees_only_latest_offer() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let streamer = ConnectionId::new();
    let early = ConnectionId::new();
    let r = room("r1");

    t.coordinator.join(&r, streamer, Role::Streamer).await.unwrap();
    t.coordinator.join(&r, early, Role::Watcher).await.unwrap();
    t.coordinator.submit_offer(&r, &streamer, sdp("A")).await.unwrap();
    t.coordinator.submit_offer(&r, &streamer, sdp("B")).await.unwrap();

    let late = ConnectionId::new();
    t.coordinator.join(&r, late, Role::Watcher).await.unwrap();

    assert_eq!(
        negotiation_only(t.signaling.received_by(&early)),
        vec![offer("r1", sdp("A")), offer("r1", sdp("B"))],
        "Present watchers see every offer as it updates"
    );
    assert_eq!(t.signaling.received_by(&late), vec![offer("r1", sdp("B"))]);
}

#[tokio::test]
async fn test_only_streamers_may_offer() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let watcher = ConnectionId::new();
    let r = room("r1");
    t.coordinator.join(&r, watcher, Role::Watcher).await.unwrap();

    let err = t
        .coordinator
        .submit_offer(&r, &watcher, sdp("sneaky"))
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::Forbidden(_)));

    let err = t
        .coordinator
        .submit_offer(&room("missing"), &watcher, sdp("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));

    assert!(!t.coordinator.room_snapshot(&r).unwrap().has_offer);
}

#[tokio::test]
async fn test_answer_is_relayed_not_retained() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let streamer = ConnectionId::new();
    let watcher = ConnectionId::new();
    let r = room("r1");
    t.coordinator.join(&r, streamer, Role::Streamer).await.unwrap();
    t.coordinator.join(&r, watcher, Role::Watcher).await.unwrap();
    t.signaling.clear();

    let answer = serde_json::json!({ "type": "answer", "sdp": "A1" });
    t.coordinator
        .submit_answer(&r, &watcher, answer.clone())
        .unwrap();

    assert_eq!(
        t.signaling.received_by(&streamer),
        vec![onair_core::SignalMessage::Answer {
            room: r.clone(),
            payload: answer,
        }]
    );

    let late = ConnectionId::new();
    t.coordinator.join(&r, late, Role::Watcher).await.unwrap();
    assert!(t.signaling.received_by(&late).is_empty());
}
