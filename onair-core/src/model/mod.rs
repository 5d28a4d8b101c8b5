mod connection;
mod role;
mod room;
mod signaling;
mod user;

pub use connection::ConnectionId;
pub use role::Role;
pub use room::RoomId;
pub use signaling::{ErrorCode, IceServerConfig, SignalMessage};
pub use user::UserId;
