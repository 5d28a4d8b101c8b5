use crate::error::{Result, RoomError};
use crate::signaling::SignalingOutput;
use onair_core::{ConnectionId, Role, RoomId, SignalMessage};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Negotiation state of one broadcast.
///
/// Every method expects to be called under the room's lock and performs its
/// outbound sends before returning, so a connection never sees a half-applied
/// state.
pub struct Room {
    id: RoomId,
    streamers: HashSet<ConnectionId>,
    watchers: HashSet<ConnectionId>,
    current_offer: Option<Value>,
    pending_candidates: Vec<Value>,
    /// Whether the stream is on air. Follows the streamer set, except that an
    /// owner stop turns it off until a streamer offers or joins again.
    live: bool,
    closed: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// A streamer joined a room that was off air.
    pub went_live: bool,
    /// The only streamer rejoined as a watcher.
    pub went_offline: bool,
}

impl JoinOutcome {
    pub fn live_change(&self) -> Option<bool> {
        if self.went_live {
            Some(true)
        } else if self.went_offline {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DepartureOutcome {
    /// The last streamer is gone.
    pub went_offline: bool,
    /// Both participant sets are empty; the room has been closed.
    pub closed: bool,
}

impl DepartureOutcome {
    pub fn live_change(&self) -> Option<bool> {
        self.went_offline.then_some(false)
    }
}

/// Read-only view of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub streamers: Vec<ConnectionId>,
    pub watchers: Vec<ConnectionId>,
    pub live: bool,
    pub has_offer: bool,
    pub pending_candidates: usize,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            streamers: HashSet::new(),
            watchers: HashSet::new(),
            current_offer: None,
            pending_candidates: Vec::new(),
            live: false,
            closed: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.streamers.is_empty() && self.watchers.is_empty()
    }

    /// A closed room has been unlinked (or is about to be) from the registry
    /// and must not accept new participants.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn role_of(&self, conn: &ConnectionId) -> Option<Role> {
        if self.streamers.contains(conn) {
            Some(Role::Streamer)
        } else if self.watchers.contains(conn) {
            Some(Role::Watcher)
        } else {
            None
        }
    }

    pub fn current_offer(&self) -> Option<&Value> {
        self.current_offer.as_ref()
    }

    pub fn pending_candidates(&self) -> &[Value] {
        &self.pending_candidates
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let mut streamers: Vec<_> = self.streamers.iter().copied().collect();
        let mut watchers: Vec<_> = self.watchers.iter().copied().collect();
        streamers.sort();
        watchers.sort();

        RoomSnapshot {
            room_id: self.id.clone(),
            streamers,
            watchers,
            live: self.live,
            has_offer: self.current_offer.is_some(),
            pending_candidates: self.pending_candidates.len(),
        }
    }

    pub fn join(
        &mut self,
        conn: ConnectionId,
        role: Role,
        out: &dyn SignalingOutput,
    ) -> JoinOutcome {
        let had_streamers = !self.streamers.is_empty();
        let was_live = self.live;

        // Switching roles moves the connection instead of duplicating it.
        self.streamers.remove(&conn);
        self.watchers.remove(&conn);

        match role {
            Role::Streamer => {
                self.streamers.insert(conn);
                self.live = true;
            }
            Role::Watcher => {
                if had_streamers && self.streamers.is_empty() {
                    self.reset_negotiation();
                }
                self.settle_live();
                self.watchers.insert(conn);
                self.replay_negotiation(&conn, out);
            }
        }

        info!("Connection {} joined room '{}' as {}", conn, self.id, role);

        self.broadcast(
            &conn,
            SignalMessage::Joined {
                room: self.id.clone(),
                connection_id: conn,
                role,
            },
            out,
        );

        JoinOutcome {
            went_live: !was_live && self.live,
            went_offline: was_live && !self.live,
        }
    }

    /// Brings a late watcher up to date: the offer first, then every
    /// buffered candidate in submission order.
    fn replay_negotiation(&self, conn: &ConnectionId, out: &dyn SignalingOutput) {
        if let Some(offer) = &self.current_offer {
            out.send(
                conn,
                SignalMessage::Offer {
                    room: self.id.clone(),
                    payload: offer.clone(),
                },
            );
        }

        for candidate in &self.pending_candidates {
            out.send(
                conn,
                SignalMessage::Candidate {
                    room: self.id.clone(),
                    payload: candidate.clone(),
                },
            );
        }
    }

    pub fn submit_offer(
        &mut self,
        conn: &ConnectionId,
        payload: Value,
        out: &dyn SignalingOutput,
    ) -> Result<bool> {
        self.require_streamer(conn, "submit an offer")?;

        debug!("Offer from {} in room '{}'", conn, self.id);
        let went_live = !self.live;
        self.live = true;
        self.current_offer = Some(payload.clone());
        self.broadcast(
            conn,
            SignalMessage::Offer {
                room: self.id.clone(),
                payload,
            },
            out,
        );
        Ok(went_live)
    }

    pub fn submit_answer(
        &self,
        conn: &ConnectionId,
        payload: Value,
        out: &dyn SignalingOutput,
    ) -> Result<()> {
        self.require_member(conn)?;

        debug!("Answer from {} in room '{}'", conn, self.id);
        self.broadcast(
            conn,
            SignalMessage::Answer {
                room: self.id.clone(),
                payload,
            },
            out,
        );
        Ok(())
    }

    pub fn submit_candidate(
        &mut self,
        conn: &ConnectionId,
        payload: Value,
        limit: Option<usize>,
        out: &dyn SignalingOutput,
    ) -> Result<()> {
        self.require_member(conn)?;

        match limit {
            Some(max) if self.pending_candidates.len() >= max => {
                warn!(
                    "Room '{}' candidate buffer full ({}), relaying without buffering",
                    self.id, max
                );
            }
            _ => self.pending_candidates.push(payload.clone()),
        }

        self.broadcast(
            conn,
            SignalMessage::Candidate {
                room: self.id.clone(),
                payload,
            },
            out,
        );
        Ok(())
    }

    pub fn relay_chat(
        &self,
        conn: &ConnectionId,
        payload: Value,
        out: &dyn SignalingOutput,
    ) -> Result<()> {
        self.require_member(conn)?;

        self.broadcast(
            conn,
            SignalMessage::Chat {
                room: self.id.clone(),
                from: Some(*conn),
                payload,
            },
            out,
        );
        Ok(())
    }

    /// A streamer ends its broadcast. It leaves the streamer set but stays
    /// connected to the channel.
    pub fn stop(&mut self, conn: &ConnectionId, out: &dyn SignalingOutput) -> Result<DepartureOutcome> {
        self.require_streamer(conn, "stop the stream")?;

        self.streamers.remove(conn);
        self.reset_negotiation();
        let went_offline = self.settle_live();
        info!("Connection {} stopped the stream in room '{}'", conn, self.id);

        self.broadcast(conn, SignalMessage::StreamStopped { room: self.id.clone() }, out);

        Ok(self.departure(went_offline))
    }

    /// The stream owner stops the broadcast from outside the room. Every
    /// participant is notified; membership is left alone, and the room stays
    /// off air until a streamer offers or joins again.
    pub fn stop_all(&mut self, out: &dyn SignalingOutput) {
        self.reset_negotiation();
        self.live = false;
        info!("Room '{}' stopped by its owner", self.id);

        let msg = SignalMessage::StreamStopped { room: self.id.clone() };
        for conn in self.streamers.iter().chain(self.watchers.iter()) {
            out.send(conn, msg.clone());
        }
    }

    /// Removes the connection from whichever set holds it. Returns `None` when
    /// the connection was not a participant.
    pub fn leave(&mut self, conn: &ConnectionId, out: &dyn SignalingOutput) -> Option<DepartureOutcome> {
        let role = self.role_of(conn)?;

        match role {
            Role::Streamer => {
                self.streamers.remove(conn);
                if self.streamers.is_empty() {
                    self.reset_negotiation();
                }
            }
            Role::Watcher => {
                self.watchers.remove(conn);
            }
        }

        info!("Connection {} left room '{}'", conn, self.id);

        self.broadcast(
            conn,
            SignalMessage::Left {
                room: self.id.clone(),
                connection_id: *conn,
            },
            out,
        );

        let went_offline = self.settle_live();
        Some(self.departure(went_offline))
    }

    fn departure(&mut self, went_offline: bool) -> DepartureOutcome {
        if self.is_empty() {
            self.closed = true;
        }

        DepartureOutcome {
            went_offline,
            closed: self.closed,
        }
    }

    /// Takes the room off air once no streamer is left. Returns whether that
    /// changed anything.
    fn settle_live(&mut self) -> bool {
        let went_offline = self.live && self.streamers.is_empty();
        if went_offline {
            self.live = false;
        }
        went_offline
    }

    fn reset_negotiation(&mut self) {
        self.current_offer = None;
        self.pending_candidates.clear();
    }

    fn require_member(&self, conn: &ConnectionId) -> Result<Role> {
        self.role_of(conn).ok_or_else(|| {
            RoomError::not_found(format!("connection {} is not in room '{}'", conn, self.id))
        })
    }

    fn require_streamer(&self, conn: &ConnectionId, action: &str) -> Result<()> {
        match self.require_member(conn)? {
            Role::Streamer => Ok(()),
            Role::Watcher => Err(RoomError::forbidden(format!(
                "only a streamer may {} in room '{}'",
                action, self.id
            ))),
        }
    }

    fn broadcast(&self, except: &ConnectionId, msg: SignalMessage, out: &dyn SignalingOutput) {
        for conn in self.streamers.iter().chain(self.watchers.iter()) {
            if conn != except {
                out.send(conn, msg.clone());
            }
        }
    }
}
