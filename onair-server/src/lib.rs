pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod ledger;
pub mod room;
pub mod signaling;
pub mod store;

pub use auth::{AuthUser, Claims, TokenVerifier};
pub use config::ServerConfig;
pub use coordinator::Coordinator;
pub use error::{Result, RoomError};
pub use http::{AppState, router};
pub use ledger::*;
pub use room::*;
pub use signaling::*;
pub use store::*;
