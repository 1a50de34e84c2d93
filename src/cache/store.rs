//! Entry store: bounded map from IPv4 address to cache entry.

use super::entry::{CacheEntry, EntryState};
use crate::config::TieBreak;
use crate::error::{DropReason, Evicted};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Instant;
use tracing::debug;

/// Result of [`EntryStore::insert_or_get`]
#[derive(Debug)]
pub struct Inserted<'a> {
    pub entry: &'a mut CacheEntry,
    /// False when the address was already present
    pub created: bool,
    /// Entry removed to make room, if any
    pub evicted: Option<Evicted>,
}

#[derive(Debug)]
pub struct EntryStore {
    entries: HashMap<Ipv4Addr, CacheEntry>,
    capacity: usize,
    queue_capacity: usize,
    tie_break: TieBreak,
    next_generation: u64,
}

impl EntryStore {
    pub fn new(capacity: usize, queue_capacity: usize, tie_break: TieBreak) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            queue_capacity,
            tie_break,
            next_generation: 1,
        }
    }

    pub fn get(&self, address: &Ipv4Addr) -> Option<&CacheEntry> {
        self.entries.get(address)
    }

    pub fn get_mut(&mut self, address: &Ipv4Addr) -> Option<&mut CacheEntry> {
        self.entries.get_mut(address)
    }

    /// Look up an entry, creating an INCOMPLETE one if absent.
    ///
    /// A full store evicts one entry first; if nothing is evictable the
    /// insertion fails with [`DropReason::NoSpace`].
    pub fn insert_or_get(
        &mut self,
        address: Ipv4Addr,
        now: Instant,
    ) -> Result<Inserted<'_>, DropReason> {
        if self.entries.contains_key(&address) {
            let entry = self
                .entries
                .get_mut(&address)
                .ok_or(DropReason::NoSpace)?;
            return Ok(Inserted {
                entry,
                created: false,
                evicted: None,
            });
        }

        let evicted = if self.entries.len() >= self.capacity {
            Some(self.evict_one().ok_or(DropReason::NoSpace)?)
        } else {
            None
        };

        let generation = self.next_generation;
        self.next_generation += 1;
        let queue_capacity = self.queue_capacity;
        let entry = self
            .entries
            .entry(address)
            .or_insert_with(|| CacheEntry::new(address, generation, queue_capacity, now));

        Ok(Inserted {
            entry,
            created: true,
            evicted,
        })
    }

    pub fn remove(&mut self, address: &Ipv4Addr) -> Option<CacheEntry> {
        self.entries.remove(address)
    }

    /// Remove the best eviction candidate.
    ///
    /// Priority: FAILED, then STALE, then INCOMPLETE with an empty queue,
    /// then REACHABLE. Ties go to the oldest timestamp per the tie-break
    /// policy. DELAY, PROBE, static entries and INCOMPLETE entries holding
    /// packets are never chosen.
    pub fn evict_one(&mut self) -> Option<Evicted> {
        let tie_break = self.tie_break;
        let address = self
            .entries
            .values()
            .filter_map(|entry| {
                eviction_tier(entry).map(|tier| {
                    let age_key = match tie_break {
                        TieBreak::OldestConfirmed => entry.last_confirmed_at(),
                        TieBreak::OldestCreated => entry.created_at(),
                    };
                    ((tier, age_key, entry.address()), entry.address())
                })
            })
            .min_by_key(|(key, _)| *key)
            .map(|(_, address)| address)?;

        let entry = self.entries.remove(&address)?;
        let evicted = Evicted {
            address,
            dropped_pending: entry.pending_len(),
        };
        debug!(
            address = %address,
            state = %entry.state(),
            dropped_pending = evicted.dropped_pending,
            "evicted ARP entry"
        );
        Some(evicted)
    }

    /// Remove every entry, returning them.
    pub fn clear(&mut self) -> Vec<CacheEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CacheEntry> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn eviction_tier(entry: &CacheEntry) -> Option<u8> {
    if entry.is_static() {
        return None;
    }
    match &entry.state {
        EntryState::Failed => Some(0),
        EntryState::Stale { .. } => Some(1),
        EntryState::Incomplete { queue, .. } if queue.is_empty() => Some(2),
        EntryState::Reachable { .. } => Some(3),
        EntryState::Incomplete { .. } | EntryState::Delay { .. } | EntryState::Probe { .. } => {
            None
        }
    }
}

/// True if the entry could ever be chosen by [`EntryStore::evict_one`].
pub fn is_evictable(entry: &CacheEntry) -> bool {
    eviction_tier(entry).is_some()
}
