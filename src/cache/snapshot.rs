//! Point-in-time copies of cache contents for display and inspection.

use super::entry::{CacheEntry, State};
use crate::protocol::MacAddr;
use std::fmt;
use std::net::Ipv4Addr;

/// One entry as seen at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub address: Ipv4Addr,
    pub mac: Option<MacAddr>,
    pub state: State,
    pub is_static: bool,
    pub retry_count: u32,
    /// Packets waiting for resolution
    pub pending: usize,
    pub generation: u64,
}

impl EntrySnapshot {
    pub(crate) fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            address: entry.address(),
            mac: entry.link_address(),
            state: entry.state(),
            is_static: entry.is_static(),
            retry_count: entry.retry_count(),
            pending: entry.pending_len(),
            generation: entry.generation(),
        }
    }
}

impl fmt::Display for EntrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mac = match self.mac {
            Some(mac) => mac.to_string(),
            None => "(incomplete)".to_string(),
        };
        let flags = if self.is_static { "PERM" } else { "" };
        write!(
            f,
            "{:<15} {:<17} {:<10} {:<4}",
            self.address.to_string(),
            mac,
            self.state.to_string(),
            flags
        )?;
        if self.pending > 0 {
            write!(f, " queued={}", self.pending)?;
        }
        if self.retry_count > 0 && !self.state.is_resolved() {
            write!(f, " probes={}", self.retry_count)?;
        }
        Ok(())
    }
}

/// Whole-table dump, sorted by address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDump {
    entries: Vec<EntrySnapshot>,
    capacity: usize,
}

impl CacheDump {
    pub(crate) fn new(mut entries: Vec<EntrySnapshot>, capacity: usize) -> Self {
        entries.sort_by_key(|e| e.address);
        Self { entries, capacity }
    }

    pub fn entries(&self) -> &[EntrySnapshot] {
        &self.entries
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, address: Ipv4Addr) -> Option<&EntrySnapshot> {
        self.entries
            .binary_search_by_key(&address, |e| e.address)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn count(&self, state: State) -> usize {
        self.entries.iter().filter(|e| e.state == state).count()
    }
}

impl fmt::Display for CacheDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<15} {:<17} {:<10} {:<4}",
            "Address", "HWaddress", "State", "Flags"
        )?;
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        write!(f, "{}/{} entries", self.entries.len(), self.capacity)
    }
}
