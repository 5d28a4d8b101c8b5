use crate::store::{StreamRecord, StreamStore};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use dashmap::DashMap;
use onair_core::RoomId;
use std::path::Path;
use tracing::{debug, info};

/// Process-local stream table. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryStreamStore {
    streams: DashMap<RoomId, StreamRecord>,
}

impl InMemoryStreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_streams(records: impl IntoIterator<Item = StreamRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Seeds the store from a JSON array of stream records.
    pub async fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read streams file {}", path.display()))?;
        let records: Vec<StreamRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse streams file {}", path.display()))?;

        info!("Loaded {} stream records from {}", records.len(), path.display());
        Ok(Self::with_streams(records))
    }

    pub fn insert(&self, record: StreamRecord) {
        self.streams.insert(record.topic_id.clone(), record);
    }

    pub fn is_live(&self, topic_id: &RoomId) -> Option<bool> {
        self.streams.get(topic_id).map(|record| record.is_live)
    }
}

#[async_trait]
impl StreamStore for InMemoryStreamStore {
    async fn find_stream(&self, topic_id: &RoomId) -> anyhow::Result<Option<StreamRecord>> {
        Ok(self.streams.get(topic_id).map(|record| record.clone()))
    }

    async fn set_live(&self, topic_id: &RoomId, live: bool) -> anyhow::Result<()> {
        let mut record = self
            .streams
            .get_mut(topic_id)
            .ok_or_else(|| anyhow!("no stream with topic id '{}'", topic_id))?;
        record.is_live = live;
        debug!("Stream '{}' live = {}", topic_id, live);
        Ok(())
    }
}
