use crate::config::ServerConfig;
use crate::error::{Result, RoomError};
use crate::room::{Room, RoomSnapshot};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use onair_core::{ConnectionId, Role, RoomId};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

type SharedRoom = Arc<Mutex<Room>>;

/// A live-flag value to write to the stream store.
///
/// Generations are taken under the room lock, so for one room they follow
/// the order in which its state actually changed. A writer must drop any
/// update older than the last one it applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveUpdate {
    pub live: bool,
    pub generation: u64,
}

/// Process-wide table of live rooms.
///
/// Each room sits behind its own mutex, so unrelated rooms never contend.
/// A map guard is never held while a room lock is taken: the room handle is
/// cloned out of the map first. Empty rooms are closed under their lock and
/// only then unlinked, which lets a concurrent `join` notice the closure and
/// retry against a fresh room.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomId, SharedRoom>>,
    memberships: Arc<DashMap<ConnectionId, HashSet<RoomId>>>,
    signaling: Arc<dyn SignalingOutput>,
    allow_lazy_rooms: bool,
    max_pending_candidates: Option<usize>,
    live_generation: Arc<AtomicU64>,
}

impl RoomRegistry {
    pub fn new(signaling: Arc<dyn SignalingOutput>, config: &ServerConfig) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            memberships: Arc::new(DashMap::new()),
            signaling,
            allow_lazy_rooms: config.allow_lazy_rooms,
            max_pending_candidates: config.max_pending_candidates,
            live_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn create(&self, room_id: RoomId) -> Result<()> {
        match self.rooms.entry(room_id) {
            Entry::Occupied(entry) => Err(RoomError::conflict(format!(
                "room '{}' already exists",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                info!("Creating new room: {}", entry.key());
                let room = Room::new(entry.key().clone());
                entry.insert(Arc::new(Mutex::new(room)));
                Ok(())
            }
        }
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<_> = self.rooms.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn snapshot(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
        let room = self.room(room_id).ok()?;
        let guard = room.lock();
        Some(guard.snapshot())
    }

    /// Rooms the connection currently participates in.
    pub fn rooms_of(&self, conn: &ConnectionId) -> Vec<RoomId> {
        self.memberships
            .get(conn)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn join(
        &self,
        room_id: &RoomId,
        conn: ConnectionId,
        role: Role,
    ) -> Result<Option<LiveUpdate>> {
        loop {
            let room = self.room_for_join(room_id)?;
            let mut guard = room.lock();

            if guard.is_closed() {
                drop(guard);
                self.unlink(room_id, &room);
                continue;
            }

            let outcome = guard.join(conn, role, self.signaling.as_ref());
            self.memberships
                .entry(conn)
                .or_default()
                .insert(room_id.clone());

            return Ok(self.stamp(outcome.live_change()));
        }
    }

    pub fn submit_offer(
        &self,
        room_id: &RoomId,
        conn: &ConnectionId,
        payload: Value,
    ) -> Result<Option<LiveUpdate>> {
        self.with_room(room_id, |room, out| {
            let went_live = room.submit_offer(conn, payload, out)?;
            Ok(self.stamp(went_live.then_some(true)))
        })
    }

    pub fn submit_answer(&self, room_id: &RoomId, conn: &ConnectionId, payload: Value) -> Result<()> {
        self.with_room(room_id, |room, out| room.submit_answer(conn, payload, out))
    }

    pub fn submit_candidate(
        &self,
        room_id: &RoomId,
        conn: &ConnectionId,
        payload: Value,
    ) -> Result<()> {
        let limit = self.max_pending_candidates;
        self.with_room(room_id, |room, out| {
            room.submit_candidate(conn, payload, limit, out)
        })
    }

    pub fn relay_chat(&self, room_id: &RoomId, conn: &ConnectionId, payload: Value) -> Result<()> {
        self.with_room(room_id, |room, out| room.relay_chat(conn, payload, out))
    }

    pub fn stop(&self, room_id: &RoomId, conn: &ConnectionId) -> Result<Option<LiveUpdate>> {
        let room = self.room(room_id)?;
        let (outcome, update) = {
            let mut guard = room.lock();
            if guard.is_closed() {
                return Err(Self::missing(room_id));
            }
            let outcome = guard.stop(conn, self.signaling.as_ref())?;
            (outcome, self.stamp(outcome.live_change()))
        };

        self.untrack(conn, room_id);
        if outcome.closed {
            self.unlink(room_id, &room);
        }
        Ok(update)
    }

    /// Clears negotiation state and tells every participant the stream ended.
    /// Always yields an offline update, registered room or not.
    pub fn stop_all(&self, room_id: &RoomId) -> LiveUpdate {
        if let Ok(room) = self.room(room_id) {
            let mut guard = room.lock();
            if !guard.is_closed() {
                guard.stop_all(self.signaling.as_ref());
                return self.next_update(false);
            }
        }

        debug!("Stop for '{}' without a registered room", room_id);
        self.next_update(false)
    }

    /// Returns the live-flag change the departure caused, if any. Unknown
    /// rooms and connections are ignored.
    pub fn leave(&self, room_id: &RoomId, conn: &ConnectionId) -> Option<LiveUpdate> {
        let room = self.room(room_id).ok()?;
        let (outcome, update) = {
            let mut guard = room.lock();
            if guard.is_closed() {
                return None;
            }
            let outcome = guard.leave(conn, self.signaling.as_ref());
            let update = outcome.and_then(|o| self.stamp(o.live_change()));
            (outcome, update)
        };

        self.untrack(conn, room_id);
        if outcome.is_some_and(|o| o.closed) {
            self.unlink(room_id, &room);
        }
        update
    }

    /// Must be called while the room that changed is still locked.
    fn stamp(&self, live: Option<bool>) -> Option<LiveUpdate> {
        live.map(|live| self.next_update(live))
    }

    fn next_update(&self, live: bool) -> LiveUpdate {
        LiveUpdate {
            live,
            generation: self.live_generation.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    fn room(&self, room_id: &RoomId) -> Result<SharedRoom> {
        self.rooms
            .get(room_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Self::missing(room_id))
    }

    fn room_for_join(&self, room_id: &RoomId) -> Result<SharedRoom> {
        if !self.allow_lazy_rooms {
            return self.room(room_id);
        }

        let entry = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room on first join: {}", room_id);
            Arc::new(Mutex::new(Room::new(room_id.clone())))
        });
        Ok(entry.value().clone())
    }

    fn with_room<T>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&mut Room, &dyn SignalingOutput) -> Result<T>,
    ) -> Result<T> {
        let room = self.room(room_id)?;
        let mut guard = room.lock();
        if guard.is_closed() {
            return Err(Self::missing(room_id));
        }
        f(&mut guard, self.signaling.as_ref())
    }

    fn unlink(&self, room_id: &RoomId, room: &SharedRoom) {
        if self
            .rooms
            .remove_if(room_id, |_, current| Arc::ptr_eq(current, room))
            .is_some()
        {
            info!("Room '{}' is empty, removing it", room_id);
        }
    }

    fn untrack(&self, conn: &ConnectionId, room_id: &RoomId) {
        if let Some(mut rooms) = self.memberships.get_mut(conn) {
            rooms.remove(room_id);
        }
        self.memberships.remove_if(conn, |_, rooms| rooms.is_empty());
    }

    fn missing(room_id: &RoomId) -> RoomError {
        RoomError::not_found(format!("room '{}' does not exist", room_id))
    }
}
