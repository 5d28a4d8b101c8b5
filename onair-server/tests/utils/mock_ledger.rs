use async_trait::async_trait;
use onair_server::{ChatLedger, LedgerEntry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Ledger that keeps every appended entry, optionally failing each call
/// after recording it.
#[derive(Clone, Default)]
pub struct RecordingLedger {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
    fail: bool,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().clone()
    }

    /// Wait until at least `count` entries were appended.
    pub async fn wait_for_entries(&self, count: usize, timeout_ms: u64) -> bool {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            if self.entries.lock().len() >= count {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl ChatLedger for RecordingLedger {
    async fn append(&self, entry: &LedgerEntry) -> anyhow::Result<()> {
        self.entries.lock().push(entry.clone());
        if self.fail {
            anyhow::bail!("ledger unavailable");
        }
        Ok(())
    }
}
