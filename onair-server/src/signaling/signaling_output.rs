use onair_core::{ConnectionId, SignalMessage};

/// Outbound side of the real-time channel, as seen by the rooms.
///
/// Rooms call this while holding their own lock so that every connection
/// observes events in the order the room processed them. Implementations must
/// therefore never block: queue the frame and return.
pub trait SignalingOutput: Send + Sync {
    /// Deliver one frame to a single connection.
    fn send(&self, to: &ConnectionId, message: SignalMessage);
}
