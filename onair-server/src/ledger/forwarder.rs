use crate::ledger::{ChatLedger, LedgerEntry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Cheap, cloneable entry point into the ledger queue. Submitting never
/// waits; the chat relay must not depend on the ledger being healthy.
#[derive(Clone)]
pub struct LedgerHandle {
    tx: mpsc::Sender<LedgerEntry>,
}

impl LedgerHandle {
    pub fn submit(&self, entry: LedgerEntry) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                warn!("Ledger queue full, dropping chat entry for room '{}'", entry.room);
            }
            Err(TrySendError::Closed(entry)) => {
                warn!("Ledger worker gone, dropping chat entry for room '{}'", entry.room);
            }
        }
    }
}

/// Background task draining the ledger queue one entry at a time.
pub struct LedgerForwarder {
    ledger: Arc<dyn ChatLedger>,
    rx: mpsc::Receiver<LedgerEntry>,
}

impl LedgerForwarder {
    pub fn new(ledger: Arc<dyn ChatLedger>, capacity: usize) -> (Self, LedgerHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { ledger, rx }, LedgerHandle { tx })
    }

    /// Spawns the forwarder on the current runtime. The task ends once every
    /// handle has been dropped and the queue is drained.
    pub fn spawn(ledger: Arc<dyn ChatLedger>, capacity: usize) -> (LedgerHandle, JoinHandle<()>) {
        let (forwarder, handle) = Self::new(ledger, capacity);
        (handle, tokio::spawn(forwarder.run()))
    }

    pub async fn run(mut self) {
        info!("Ledger forwarder started");

        while let Some(entry) = self.rx.recv().await {
            if let Err(e) = self.ledger.append(&entry).await {
                error!("Failed to append chat entry for room '{}': {:#}", entry.room, e);
            }
        }

        info!("Ledger forwarder finished");
    }
}
