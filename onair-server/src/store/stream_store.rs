use async_trait::async_trait;
use onair_core::{RoomId, UserId};
use serde::{Deserialize, Serialize};

/// A stream as persisted by the rest of the platform. Its topic id doubles
/// as the id of the room carrying the broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub topic_id: RoomId,
    pub owner: UserId,
    #[serde(default)]
    pub is_live: bool,
}

impl StreamRecord {
    pub fn new(topic_id: impl Into<RoomId>, owner: impl Into<UserId>) -> Self {
        Self {
            topic_id: topic_id.into(),
            owner: owner.into(),
            is_live: false,
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }
}

/// Storage of stream records. Calls may block on I/O, so the coordinator
/// never invokes them while a room lock is held.
#[async_trait]
pub trait StreamStore: Send + Sync {
    async fn find_stream(&self, topic_id: &RoomId) -> anyhow::Result<Option<StreamRecord>>;

    /// Flip the persisted "is live" flag of a stream.
    async fn set_live(&self, topic_id: &RoomId, live: bool) -> anyhow::Result<()>;
}
