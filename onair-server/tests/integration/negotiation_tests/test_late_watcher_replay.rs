use onair_core::{ConnectionId, Role};
use onair_server::ServerConfig;

use crate::integration::{create_test_coordinator, init_tracing};
use crate::utils::{candidate, ice, negotiation_only, offer, room, sdp};

#[tokio::test]
async fn test_late_watcher_gets_offer_then_candidates_in_order() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let streamer = ConnectionId::new();
    let r = room("r1");

    t.coordinator.join(&r, streamer, Role::Streamer).await.unwrap();
    t.coordinator.submit_offer(&r, &streamer, sdp("O1")).await.unwrap();
    for tag in ["C1", "C2", "C3", "C4"] {
        t.coordinator.submit_candidate(&r, &streamer, ice(tag)).unwrap();
    }

    let late = ConnectionId::new();
    t.coordinator.join(&r, late, Role::Watcher).await.unwrap();

    assert_eq!(
        t.signaling.received_by(&late),
        vec![
            offer("r1", sdp("O1")),
            candidate("r1", ice("C1")),
            candidate("r1", ice("C2")),
            candidate("r1", ice("C3")),
            candidate("r1", ice("C4")),
        ]
    );
}

#[tokio::test]
async fn test_streamer_join_gets_no_replay() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig::default());
    let first = ConnectionId::new();
    let second = ConnectionId::new();
    let r = room("r1");

    t.coordinator.join(&r, first, Role::Streamer).await.unwrap();
    t.coordinator.submit_offer(&r, &first, sdp("O1")).await.unwrap();
    t.coordinator.submit_candidate(&r, &first, ice("C1")).unwrap();

    t.coordinator.join(&r, second, Role::Streamer).await.unwrap();

    assert!(negotiation_only(t.signaling.received_by(&second)).is_empty());
}

#[tokio::test]
async fn test_capped_buffer_replays_only_kept_candidates() {
    init_tracing();

    let t = create_test_coordinator(ServerConfig {
        max_pending_candidates: Some(2),
        ..ServerConfig::default()
    });
    let streamer = ConnectionId::new();
    let early = ConnectionId::new();
    let r = room("r1");

    t.coordinator.join(&r, streamer, Role::Streamer).await.unwrap();
    t.coordinator.join(&r, early, Role::Watcher).await.unwrap();
    t.coordinator.submit_offer(&r, &streamer, sdp("O1")).await.unwrap();
    for tag in ["C1", "C2", "C3"] {
        t.coordinator.submit_candidate(&r, &streamer, ice(tag)).unwrap();
    }

    let late = ConnectionId::new();
    t.coordinator.join(&r, late, Role::Watcher).await.unwrap();

    assert_eq!(
        negotiation_only(t.signaling.received_by(&early)).len(),
        4,
        "Live relay is not affected by the cap"
    );
    assert_eq!(
        t.signaling.received_by(&late),
        vec![
            offer("r1", sdp("O1")),
            candidate("r1", ice("C1")),
            candidate("r1", ice("C2")),
        ]
    );
}
