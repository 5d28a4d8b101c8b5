use onair_core::{ConnectionId, Role};
use onair_server::ServerConfig;

use crate::integration::{create_test_coordinator, init_tracing};
use crate::utils::{left, room, sdp};

#[tokio::test]
async fn test_room_removed_when_last_participant_disconnects() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let a = ConnectionId::new();
    let b = ConnectionId::new();

    t.coordinator.join(&room("r2"), a, Role::Watcher).await.unwrap();
    t.coordinator.join(&room("r2"), b, Role::Watcher).await.unwrap();
    t.signaling.clear();

    t.coordinator.disconnect(&a).await;
    assert!(t.coordinator.registry().contains(&room("r2")));
    assert_eq!(t.signaling.received_by(&b), vec![left("r2", a)]);

    t.coordinator.disconnect(&b).await;
    assert!(!t.coordinator.registry().contains(&room("r2")));
}

#[tokio::test]
async fn test_disconnect_leaves_every_room() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let conn = ConnectionId::new();

    t.coordinator.join(&room("x"), conn, Role::Watcher).await.unwrap();
    t.coordinator.join(&room("y"), conn, Role::Streamer).await.unwrap();

    t.coordinator.disconnect(&conn).await;

    assert!(t.coordinator.list_rooms().is_empty());
}

#[tokio::test]
async fn test_leave_unknown_connection_is_no_op() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let member = ConnectionId::new();
    t.coordinator.join(&room("r2"), member, Role::Watcher).await.unwrap();
    t.signaling.clear();

    t.coordinator.leave(&room("r2"), &ConnectionId::new()).await;
    t.coordinator.leave(&room("nowhere"), &member).await;
    t.coordinator.disconnect(&ConnectionId::new()).await;

    assert_eq!(t.signaling.total(), 0);
    assert!(t.coordinator.registry().contains(&room("r2")));
}

#[tokio::test]
async fn test_disconnect_twice_is_idempotent() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let a = ConnectionId::new();
    let b = ConnectionId::new();
    t.coordinator.join(&room("r2"), a, Role::Watcher).await.unwrap();
    t.coordinator.join(&room("r2"), b, Role::Watcher).await.unwrap();
    t.signaling.clear();

    t.coordinator.disconnect(&a).await;
    t.coordinator.disconnect(&a).await;

    assert_eq!(t.signaling.received_by(&b), vec![left("r2", a)]);
}

#[tokio::test]
async fn test_last_streamer_disconnect_takes_stream_offline() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let streamer = ConnectionId::new();
    let watcher = ConnectionId::new();

    t.coordinator.join(&room("r1"), streamer, Role::Streamer).await.unwrap();
    t.coordinator.join(&room("r1"), watcher, Role::Watcher).await.unwrap();
    t.coordinator
        .submit_offer(&room("r1"), &streamer, sdp("O1"))
        .await
        .unwrap();
    assert_eq!(t.streams.is_live(&room("r1")), Some(true));

    t.coordinator.disconnect(&streamer).await;

    let snapshot = t.coordinator.room_snapshot(&room("r1")).unwrap();
    assert!(snapshot.streamers.is_empty());
    assert!(!snapshot.has_offer);
    assert_eq!(t.streams.is_live(&room("r1")), Some(false));
}
