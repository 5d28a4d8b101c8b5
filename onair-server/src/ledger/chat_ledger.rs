use anyhow::Context;
use async_trait::async_trait;
use onair_core::{ConnectionId, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// One chat message as recorded in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub room: RoomId,
    pub from: ConnectionId,
    pub payload: Value,
    /// Milliseconds since the Unix epoch.
    pub sent_at: u64,
}

impl LedgerEntry {
    pub fn new(room: RoomId, from: ConnectionId, payload: Value) -> Self {
        let sent_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            room,
            from,
            payload,
            sent_at,
        }
    }
}

/// External append-only log that chat messages are copied to.
#[async_trait]
pub trait ChatLedger: Send + Sync {
    async fn append(&self, entry: &LedgerEntry) -> anyhow::Result<()>;
}

/// Writes each entry as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLedger;

#[async_trait]
impl ChatLedger for TracingLedger {
    async fn append(&self, entry: &LedgerEntry) -> anyhow::Result<()> {
        info!(
            room = %entry.room,
            from = %entry.from,
            sent_at = entry.sent_at,
            payload = %entry.payload,
            "chat ledger entry"
        );
        Ok(())
    }
}

/// POSTs each entry as JSON to a remote ledger service.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
    url: String,
}

impl HttpLedger {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ChatLedger for HttpLedger {
    async fn append(&self, entry: &LedgerEntry) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(entry)
            .send()
            .await
            .with_context(|| format!("Failed to reach ledger at {}", self.url))?
            .error_for_status()
            .context("Ledger rejected entry")?;
        Ok(())
    }
}
