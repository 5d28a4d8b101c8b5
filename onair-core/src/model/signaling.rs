use crate::model::connection::ConnectionId;
use crate::model::role::Role;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

/// Frames exchanged over the real-time channel.
///
/// `offer`, `answer`, `candidate`, `chat` and `stop_stream` travel in both
/// directions; the rest are server to client only. Payloads are relayed
/// without being inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum SignalMessage {
    Welcome {
        connection_id: ConnectionId,
        ice_servers: Vec<IceServerConfig>,
    },
    Join {
        room: RoomId,
        role: Role,
    },
    Joined {
        room: RoomId,
        connection_id: ConnectionId,
        role: Role,
    },
    Offer {
        room: RoomId,
        payload: Value,
    },
    Answer {
        room: RoomId,
        payload: Value,
    },
    Candidate {
        room: RoomId,
        payload: Value,
    },
    Chat {
        room: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ConnectionId>,
        payload: Value,
    },
    StopStream {
        room: RoomId,
    },
    StreamStopped {
        room: RoomId,
    },
    Left {
        room: RoomId,
        connection_id: ConnectionId,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}
