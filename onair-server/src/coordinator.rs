use crate::error::{Result, RoomError};
use crate::ledger::{LedgerEntry, LedgerHandle};
use crate::room::{LiveUpdate, RoomCommand, RoomRegistry, RoomSnapshot};
use crate::store::{StreamRecord, StreamStore};
use dashmap::DashMap;
use onair_core::{ConnectionId, Role, RoomId, UserId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Entry point for both the control plane and the real-time channel.
///
/// Ownership checks and live-flag writes go through the stream store, which
/// may block on I/O; they always happen before or after the registry call,
/// never while a room is locked.
#[derive(Clone)]
pub struct Coordinator {
    registry: RoomRegistry,
    streams: Arc<dyn StreamStore>,
    ledger: LedgerHandle,
    /// Generation of the last live-flag write applied, per room.
    live_writes: Arc<DashMap<RoomId, Arc<Mutex<u64>>>>,
}

impl Coordinator {
    pub fn new(registry: RoomRegistry, streams: Arc<dyn StreamStore>, ledger: LedgerHandle) -> Self {
        Self {
            registry,
            streams,
            ledger,
            live_writes: Arc::new(DashMap::new()),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Registers an empty room for a stream the requester owns.
    pub async fn create_room(&self, room_id: RoomId, requester: &UserId) -> Result<RoomId> {
        match self.streams.find_stream(&room_id).await? {
            Some(stream) if stream.is_owned_by(requester) => {}
            _ => {
                return Err(RoomError::not_found(format!(
                    "no stream '{}' owned by {}",
                    room_id, requester
                )));
            }
        }

        self.registry.create(room_id.clone())?;
        info!("User {} created room '{}'", requester, room_id);
        Ok(room_id)
    }

    pub fn list_rooms(&self) -> Vec<RoomId> {
        self.registry.room_ids()
    }

    pub fn room_snapshot(&self, room_id: &RoomId) -> Result<RoomSnapshot> {
        self.registry
            .snapshot(room_id)
            .ok_or_else(|| RoomError::not_found(format!("room '{}' does not exist", room_id)))
    }

    /// Control-plane join. Only checks that the caller may take the role;
    /// membership itself is established over the real-time channel.
    pub async fn authorize_join(&self, room_id: &RoomId, user: &UserId, role: Role) -> Result<()> {
        let stream = self.stream(room_id).await?;

        if role == Role::Streamer && !stream.is_owned_by(user) {
            return Err(RoomError::forbidden(format!(
                "only the owner of '{}' may stream to it",
                room_id
            )));
        }
        Ok(())
    }

    /// Control-plane stop. Clears negotiation state for every participant and
    /// marks the stream offline, whether or not a room is registered.
    pub async fn stop_as_owner(&self, room_id: &RoomId, user: &UserId) -> Result<()> {
        let stream = self.stream(room_id).await?;
        if !stream.is_owned_by(user) {
            return Err(RoomError::forbidden(format!(
                "only the owner of '{}' may stop it",
                room_id
            )));
        }

        let update = self.registry.stop_all(room_id);
        self.publish(room_id, Some(update)).await;
        Ok(())
    }

    pub async fn join(&self, room_id: &RoomId, conn: ConnectionId, role: Role) -> Result<()> {
        let update = self.registry.join(room_id, conn, role)?;
        self.publish(room_id, update).await;
        Ok(())
    }

    /// An offer after an owner stop puts the stream back on air.
    pub async fn submit_offer(
        &self,
        room_id: &RoomId,
        conn: &ConnectionId,
        offer: Value,
    ) -> Result<()> {
        let update = self.registry.submit_offer(room_id, conn, offer)?;
        self.publish(room_id, update).await;
        Ok(())
    }

    pub fn submit_answer(&self, room_id: &RoomId, conn: &ConnectionId, answer: Value) -> Result<()> {
        self.registry.submit_answer(room_id, conn, answer)
    }

    pub fn submit_candidate(
        &self,
        room_id: &RoomId,
        conn: &ConnectionId,
        candidate: Value,
    ) -> Result<()> {
        self.registry.submit_candidate(room_id, conn, candidate)
    }

    /// Broadcasts the message, then hands a copy to the ledger without
    /// waiting for it.
    pub fn relay_chat(&self, room_id: &RoomId, conn: &ConnectionId, message: Value) -> Result<()> {
        self.registry.relay_chat(room_id, conn, message.clone())?;
        self.ledger
            .submit(LedgerEntry::new(room_id.clone(), *conn, message));
        Ok(())
    }

    pub async fn stop(&self, room_id: &RoomId, conn: &ConnectionId) -> Result<()> {
        let update = self.registry.stop(room_id, conn)?;
        self.publish(room_id, update).await;
        Ok(())
    }

    /// Removes the connection from one room. Unknown rooms and connections
    /// are ignored.
    pub async fn leave(&self, room_id: &RoomId, conn: &ConnectionId) {
        let update = self.registry.leave(room_id, conn);
        self.publish(room_id, update).await;
    }

    /// The connection is gone: leave every room it was part of.
    pub async fn disconnect(&self, conn: &ConnectionId) {
        for room_id in self.registry.rooms_of(conn) {
            self.leave(&room_id, conn).await;
        }
    }

    pub async fn dispatch(&self, conn: ConnectionId, command: RoomCommand) -> Result<()> {
        match command {
            RoomCommand::Join { room, role } => self.join(&room, conn, role).await,
            RoomCommand::Offer { room, payload } => self.submit_offer(&room, &conn, payload).await,
            RoomCommand::Answer { room, payload } => self.submit_answer(&room, &conn, payload),
            RoomCommand::Candidate { room, payload } => {
                self.submit_candidate(&room, &conn, payload)
            }
            RoomCommand::Chat { room, payload } => self.relay_chat(&room, &conn, payload),
            RoomCommand::StopStream { room } => self.stop(&room, &conn).await,
            RoomCommand::Disconnect => {
                self.disconnect(&conn).await;
                Ok(())
            }
        }
    }


    async fn stream(&self, room_id: &RoomId) -> Result<StreamRecord> {
        self.streams
            .find_stream(room_id)
            .await?
            .ok_or_else(|| RoomError::not_found(format!("stream '{}' does not exist", room_id)))
    }

    /// Writes the live flag unless a newer update for the room got there
    /// first. Failures are logged and never fail the signaling operation that
    /// caused them.
    async fn publish(&self, room_id: &RoomId, update: Option<LiveUpdate>) {
        let Some(update) = update else {
            return;
        };

        let gate = self
            .live_writes
            .entry(room_id.clone())
            .or_default()
            .value()
            .clone();
        let mut applied = gate.lock().await;

        if update.generation <= *applied {
            debug!(
                "Skipping stale live = {} for '{}' (generation {} <= {})",
                update.live, room_id, update.generation, *applied
            );
            return;
        }

        if let Err(e) = self.streams.set_live(room_id, update.live).await {
            warn!("Failed to set live = {} for '{}': {:#}", update.live, room_id, e);
        }
        *applied = update.generation;
    }
}
