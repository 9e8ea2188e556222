//! Participant session management.
//!
//! The registry owns connection bookkeeping: stable id allocation, team
//! assignment, the per-participant pending-input slot, and deferred
//! removals. It is mutated only by the main server loop, which keeps the
//! simulation single-writer: connection events and inputs land in slots
//! here and are consumed at the next tick boundary.

use log::info;
use shared::{DirectionSet, Team};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// How long a participant may stay silent before being swept.
const SESSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection-side state for one participant.
#[derive(Debug)]
pub struct Session {
    pub id: u32,
    pub addr: SocketAddr,
    pub team: Team,
    /// Last time any packet arrived from this participant.
    pub last_seen: Instant,
    /// Latest input intent, replaced wholesale on every input message.
    pub pending_input: DirectionSet,
}

impl Session {
    fn new(id: u32, addr: SocketAddr, team: Team) -> Self {
        Self {
            id,
            addr,
            team,
            last_seen: Instant::now(),
            pending_input: DirectionSet::default(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Tracks all connected participants.
///
/// Ids start at 1 and increase monotonically; an id is never reused while
/// its participant is connected. Removal is two-phase: [`mark_disconnect`]
/// queues the id at any time, and [`take_removals`] commits the removals at
/// a tick boundary so an in-flight tick never iterates a half-removed
/// entry.
///
/// [`mark_disconnect`]: SessionRegistry::mark_disconnect
/// [`take_removals`]: SessionRegistry::take_removals
pub struct SessionRegistry {
    sessions: HashMap<u32, Session>,
    pending_removals: Vec<u32>,
    next_id: u32,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            pending_removals: Vec::new(),
            next_id: 1,
            max_sessions,
        }
    }

    /// Registers a new participant, assigning the next id and a team by
    /// parity of the current connected count. Returns `None` at capacity.
    pub fn connect(&mut self, addr: SocketAddr) -> Option<(u32, Team)> {
        if self.sessions.len() >= self.max_sessions {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        let team = Team::from_count(self.sessions.len());

        info!("Participant {} connected from {} as {:?}", id, addr, team);
        self.sessions.insert(id, Session::new(id, addr, team));

        Some((id, team))
    }

    /// Replaces the participant's pending input wholesale and refreshes
    /// their liveness timestamp. Unknown ids are a no-op, covering input
    /// that arrives after a disconnect.
    pub fn set_input(&mut self, id: u32, directions: DirectionSet) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.pending_input = directions;
            session.last_seen = Instant::now();
        }
    }

    /// Queues a participant for removal at the next tick boundary.
    /// Idempotent and safe to call at any time, including while a tick is
    /// executing elsewhere in the loop iteration.
    pub fn mark_disconnect(&mut self, id: u32) {
        if self.sessions.contains_key(&id) && !self.pending_removals.contains(&id) {
            self.pending_removals.push(id);
        }
    }

    /// Removes a session immediately, bypassing the deferred queue, and
    /// purges any removal already pending for it. Used when a reconnect
    /// supersedes an existing session: the slot must free up before the
    /// new connect is admitted, and the address must map to one session.
    pub fn disconnect_now(&mut self, id: u32) -> bool {
        self.pending_removals.retain(|pending| *pending != id);
        if self.sessions.remove(&id).is_some() {
            info!("Participant {} removed", id);
            true
        } else {
            false
        }
    }

    /// Marks every session that has been silent past the timeout.
    pub fn sweep_timeouts(&mut self) {
        let timed_out: Vec<u32> = self
            .sessions
            .values()
            .filter(|s| s.is_timed_out(SESSION_TIMEOUT))
            .map(|s| s.id)
            .collect();

        for id in timed_out {
            info!("Participant {} timed out", id);
            self.mark_disconnect(id);
        }
    }

    /// Commits all queued removals, dropping their sessions, and returns
    /// the removed ids so the simulation can drop the matching players.
    pub fn take_removals(&mut self) -> Vec<u32> {
        let removals = std::mem::take(&mut self.pending_removals);
        for id in &removals {
            if self.sessions.remove(id).is_some() {
                info!("Participant {} disconnected", id);
            }
        }
        removals
    }

    /// Current input intent of every connected participant, consumed by the
    /// tick in one atomic pass.
    pub fn pending_inputs(&self) -> HashMap<u32, DirectionSet> {
        self.sessions
            .iter()
            .map(|(id, session)| (*id, session.pending_input))
            .collect()
    }

    /// Resolves which participant a datagram came from.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.sessions
            .values()
            .find(|session| session.addr == addr)
            .map(|session| session.id)
    }

    /// Id and address of every participant, for snapshot fan-out.
    pub fn addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.sessions
            .values()
            .map(|session| (session.id, session.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
