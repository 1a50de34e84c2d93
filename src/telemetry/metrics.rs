//! Counters for address resolution activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by one.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `val` to the counter.
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Returns the current count.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// ARP cache statistics, shared between the manager and its observers.
#[derive(Debug, Default)]
pub struct ArpMetrics {
    /// Who-has requests sent to the broadcast address.
    pub broadcast_probes: Counter,
    /// Reconfirmation requests sent to a cached address.
    pub unicast_probes: Counter,
    /// Packets parked behind an unresolved address.
    pub packets_queued: Counter,
    /// Queued packets handed to the transmitter after resolution.
    pub packets_flushed: Counter,
    /// Packets refused because the entry's queue was full.
    pub packets_rejected: Counter,
    /// Queued packets discarded by failure, eviction or invalidation.
    pub pending_dropped: Counter,
    /// Resolve requests answered with DROPPED.
    pub resolves_dropped: Counter,
    /// Entries that ran out of retries.
    pub resolutions_failed: Counter,
    /// Entries removed to make room.
    pub evictions: Counter,

    /// Current number of entries.
    pub entries: AtomicU64,
}

impl ArpMetrics {
    /// Creates a metrics set with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current table size.
    pub fn set_entries(&self, count: usize) {
        self.entries.store(count as u64, Ordering::Relaxed);
    }

    /// Exports all metrics as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        vec![
            ("arp_broadcast_probes".into(), self.broadcast_probes.get()),
            ("arp_unicast_probes".into(), self.unicast_probes.get()),
            ("arp_packets_queued".into(), self.packets_queued.get()),
            ("arp_packets_flushed".into(), self.packets_flushed.get()),
            ("arp_packets_rejected".into(), self.packets_rejected.get()),
            ("arp_pending_dropped".into(), self.pending_dropped.get()),
            ("arp_resolves_dropped".into(), self.resolves_dropped.get()),
            ("arp_resolutions_failed".into(), self.resolutions_failed.get()),
            ("arp_evictions".into(), self.evictions.get()),
            ("arp_entries".into(), self.entries.load(Ordering::Relaxed)),
        ]
    }
}
