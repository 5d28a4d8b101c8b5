use onair_core::{ConnectionId, Role, RoomId, SignalMessage};
use serde_json::{Value, json};

pub fn room(id: &str) -> RoomId {
    RoomId::from(id)
}

pub fn sdp(tag: &str) -> Value {
    json!({ "type": "offer", "sdp": tag })
}

pub fn ice(tag: &str) -> Value {
    json!({ "candidate": tag, "sdpMid": "0", "sdpMLineIndex": 0 })
}

pub fn offer(room_id: &str, payload: Value) -> SignalMessage {
    SignalMessage::Offer {
        room: room(room_id),
        payload,
    }
}

pub fn candidate(room_id: &str, payload: Value) -> SignalMessage {
    SignalMessage::Candidate {
        room: room(room_id),
        payload,
    }
}

pub fn joined(room_id: &str, conn: ConnectionId, role: Role) -> SignalMessage {
    SignalMessage::Joined {
        room: room(room_id),
        connection_id: conn,
        role,
    }
}

pub fn left(room_id: &str, conn: ConnectionId) -> SignalMessage {
    SignalMessage::Left {
        room: room(room_id),
        connection_id: conn,
    }
}

pub fn stream_stopped(room_id: &str) -> SignalMessage {
    SignalMessage::StreamStopped {
        room: room(room_id),
    }
}

/// Keeps only negotiation frames (offers and candidates).
pub fn negotiation_only(frames: Vec<SignalMessage>) -> Vec<SignalMessage> {
    frames
        .into_iter()
        .filter(|m| matches!(m, SignalMessage::Offer { .. } | SignalMessage::Candidate { .. }))
        .collect()
}
