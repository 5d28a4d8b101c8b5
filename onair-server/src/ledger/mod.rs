mod chat_ledger;
mod forwarder;

pub use chat_ledger::*;
pub use forwarder::*;
