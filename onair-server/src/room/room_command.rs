use onair_core::{Role, RoomId, SignalMessage};
use serde_json::Value;

/// Commands a connection can issue against the rooms. Each one maps to
/// exactly one coordinator operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    Join { room: RoomId, role: Role },
    Offer { room: RoomId, payload: Value },
    Answer { room: RoomId, payload: Value },
    Candidate { room: RoomId, payload: Value },
    Chat { room: RoomId, payload: Value },
    StopStream { room: RoomId },
    /// The connection is gone. Never parsed from the wire.
    Disconnect,
}

impl TryFrom<SignalMessage> for RoomCommand {
    /// Server-to-client frames are handed back unchanged.
    type Error = SignalMessage;

    fn try_from(msg: SignalMessage) -> Result<Self, Self::Error> {
        match msg {
            SignalMessage::Join { room, role } => Ok(Self::Join { room, role }),
            SignalMessage::Offer { room, payload } => Ok(Self::Offer { room, payload }),
            SignalMessage::Answer { room, payload } => Ok(Self::Answer { room, payload }),
            SignalMessage::Candidate { room, payload } => Ok(Self::Candidate { room, payload }),
            SignalMessage::Chat { room, payload, .. } => Ok(Self::Chat { room, payload }),
            SignalMessage::StopStream { room } => Ok(Self::StopStream { room }),
            other @ (SignalMessage::Welcome { .. }
            | SignalMessage::Joined { .. }
            | SignalMessage::StreamStopped { .. }
            | SignalMessage::Left { .. }
            | SignalMessage::Error { .. }) => Err(other),
        }
    }
}
