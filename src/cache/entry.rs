//! Cache entries and their per-state payload.

use super::pending::PendingQueue;
use crate::protocol::MacAddr;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Instant;

/// Reachability state of an entry, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Resolution in progress, no link address yet
    Incomplete,
    /// Recently confirmed
    Reachable,
    /// Confirmation aged out; revalidated lazily on next use
    Stale,
    /// Used while stale; waiting for a passive confirmation before probing
    Delay,
    /// Actively reconfirming with unicast probes
    Probe,
    /// Resolution gave up; answers DROPPED until the grace period ends
    Failed,
}

impl State {
    /// States whose entries hold a link address.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            State::Reachable | State::Stale | State::Delay | State::Probe
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Incomplete => "INCOMPLETE",
            State::Reachable => "REACHABLE",
            State::Stale => "STALE",
            State::Delay => "DELAY",
            State::Probe => "PROBE",
            State::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Learned or resolved; subject to aging and eviction
    Dynamic,
    /// Installed by configuration; never ages or gets evicted
    Static,
}

/// State together with the fields that are only valid in that state.
#[derive(Debug)]
pub(crate) enum EntryState {
    Incomplete { probes: u32, queue: PendingQueue },
    Reachable { mac: MacAddr },
    Stale { mac: MacAddr },
    Delay { mac: MacAddr },
    Probe { mac: MacAddr, probes: u32 },
    Failed,
}

impl EntryState {
    pub(crate) fn state(&self) -> State {
        match self {
            EntryState::Incomplete { .. } => State::Incomplete,
            EntryState::Reachable { .. } => State::Reachable,
            EntryState::Stale { .. } => State::Stale,
            EntryState::Delay { .. } => State::Delay,
            EntryState::Probe { .. } => State::Probe,
            EntryState::Failed => State::Failed,
        }
    }
}

/// One address-resolution record.
///
/// Owned exclusively by the entry store; collaborators only ever see
/// copies of the link address.
#[derive(Debug)]
pub struct CacheEntry {
    address: Ipv4Addr,
    kind: EntryKind,
    generation: u64,
    created_at: Instant,
    pub(crate) last_confirmed_at: Instant,
    pub(crate) last_used_at: Instant,
    /// Next time-driven event for this entry; `None` never fires.
    pub(crate) expires_at: Option<Instant>,
    pub(crate) state: EntryState,
}

impl CacheEntry {
    pub(crate) fn new(
        address: Ipv4Addr,
        generation: u64,
        queue_capacity: usize,
        now: Instant,
    ) -> Self {
        Self {
            address,
            kind: EntryKind::Dynamic,
            generation,
            created_at: now,
            last_confirmed_at: now,
            last_used_at: now,
            expires_at: None,
            state: EntryState::Incomplete {
                probes: 0,
                queue: PendingQueue::new(queue_capacity),
            },
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: EntryKind) {
        self.kind = kind;
    }

    pub fn is_static(&self) -> bool {
        self.kind == EntryKind::Static
    }

    /// Identity of this incarnation; a re-created entry gets a new one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_confirmed_at(&self) -> Instant {
        self.last_confirmed_at
    }

    /// Last time a packet was sent through this entry.
    pub fn last_used_at(&self) -> Instant {
        self.last_used_at
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn state(&self) -> State {
        self.state.state()
    }

    /// Link address, present only in REACHABLE, STALE, DELAY and PROBE.
    pub fn link_address(&self) -> Option<MacAddr> {
        match self.state {
            EntryState::Reachable { mac }
            | EntryState::Stale { mac }
            | EntryState::Delay { mac }
            | EntryState::Probe { mac, .. } => Some(mac),
            EntryState::Incomplete { .. } | EntryState::Failed => None,
        }
    }

    /// Probes sent in the current resolution attempt.
    pub fn retry_count(&self) -> u32 {
        match self.state {
            EntryState::Incomplete { probes, .. } | EntryState::Probe { probes, .. } => probes,
            _ => 0,
        }
    }

    pub fn pending_len(&self) -> usize {
        match &self.state {
            EntryState::Incomplete { queue, .. } => queue.len(),
            _ => 0,
        }
    }

    pub(crate) fn pending_mut(&mut self) -> Option<&mut PendingQueue> {
        match &mut self.state {
            EntryState::Incomplete { queue, .. } => Some(queue),
            _ => None,
        }
    }

    /// Replace the state, returning any packets still queued under the old one.
    pub(crate) fn transition(&mut self, next: EntryState) -> Vec<super::Packet> {
        let prev = std::mem::replace(&mut self.state, next);
        match prev {
            EntryState::Incomplete { mut queue, .. } => queue.drain(),
            _ => Vec::new(),
        }
    }
}
