//! Cache manager: the public, thread-safe face of the ARP cache.
//!
//! All mutation happens under one lock. Probes and packets produced by an
//! operation are handed to the [`Transmitter`] only after the lock is
//! released.

use super::engine::{Effects, Engine, TickOutcome};
use super::entry::State;
use super::snapshot::{CacheDump, EntrySnapshot};
use super::store::EntryStore;
use super::transmit::{Outbound, Transmitter};
use super::Packet;
use crate::config::CacheConfig;
use crate::error::{DropReason, Evicted};
use crate::protocol::MacAddr;
use crate::telemetry::ArpMetrics;
use parking_lot::Mutex;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Outcome of [`CacheManager::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Link address known; the packet was handed to the transmitter.
    Resolved(MacAddr),
    /// Parked until the address resolves.
    Queued,
    /// The entry's pending queue is full; the packet was dropped.
    RejectedFull,
    Dropped(DropReason),
}

/// Summary of one [`CacheManager::tick`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries whose state changed (excluding failures and removals)
    pub transitions: usize,
    /// Probes sent this pass
    pub probes: usize,
    /// Addresses that ran out of retries
    pub failed: Vec<Ipv4Addr>,
    /// Entries removed after their FAILED grace or STALE idle time
    pub expired: usize,
    /// Queued packets discarded by failures
    pub dropped_pending: usize,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        *self == TickReport::default()
    }
}

struct Inner {
    store: EntryStore,
    engine: Engine,
}

pub struct CacheManager<T> {
    inner: Mutex<Inner>,
    transmitter: T,
    config: CacheConfig,
    metrics: Arc<ArpMetrics>,
}

impl<T: Transmitter> CacheManager<T> {
    /// Build a cache and install the configured static entries.
    pub fn new(config: CacheConfig, transmitter: T) -> Self {
        let manager = Self {
            inner: Mutex::new(Inner {
                store: EntryStore::new(config.capacity, config.queue_capacity, config.tie_break),
                engine: Engine::new(&config),
            }),
            transmitter,
            metrics: Arc::new(ArpMetrics::new()),
            config,
        };

        for (address, mac) in manager.config.static_entries.clone() {
            if manager.insert_static(address, mac).is_err() {
                warn!(%address, "no room for static ARP entry");
            }
        }
        info!(
            capacity = manager.config.capacity,
            static_entries = manager.len(),
            "ARP cache ready"
        );
        manager
    }

    /// Resolve `address` for `packet` using the current time.
    pub fn resolve(&self, address: Ipv4Addr, packet: Packet) -> Resolution {
        self.resolve_at(address, packet, Instant::now())
    }

    /// Resolve `address` for `packet` as of `now`. Never blocks on I/O.
    pub fn resolve_at(&self, address: Ipv4Addr, packet: Packet, now: Instant) -> Resolution {
        self.resolve_reporting_at(address, packet, now).0
    }

    /// [`resolve_at`](Self::resolve_at), also returning the entry evicted
    /// to make room for `address`, if any.
    ///
    /// The evicted entry's `dropped_pending` is always zero: entries with
    /// queued packets are never chosen for eviction.
    pub fn resolve_reporting_at(
        &self,
        address: Ipv4Addr,
        packet: Packet,
        now: Instant,
    ) -> (Resolution, Option<Evicted>) {
        let mut fx = Effects::default();
        let mut evicted = None;

        let resolution = {
            let mut guard = self.inner.lock();
            let Inner { store, engine } = &mut *guard;

            // A FAILED entry past its grace period is as good as absent.
            if let Some(entry) = store.get(&address) {
                if entry.state() == State::Failed {
                    match entry.expires_at() {
                        Some(deadline) if now < deadline => {
                            self.metrics.resolves_dropped.inc();
                            return (Resolution::Dropped(DropReason::Unreachable), None);
                        }
                        _ => {
                            store.remove(&address);
                        }
                    }
                }
            }

            match store.insert_or_get(address, now) {
                Err(reason) => {
                    warn!(%address, "ARP cache full, dropping packet");
                    self.metrics.resolves_dropped.inc();
                    Resolution::Dropped(reason)
                }
                Ok(inserted) => {
                    evicted = inserted.evicted;
                    let entry = inserted.entry;
                    if inserted.created {
                        engine.start(entry, now, &mut fx);
                    }

                    match engine.on_send(entry, now) {
                        Some(mac) => {
                            fx.outbound.push(Outbound::Packet { packet, mac });
                            Resolution::Resolved(mac)
                        }
                        None => match entry.pending_mut().map(|queue| queue.enqueue(packet)) {
                            Some(Ok(())) => {
                                self.metrics.packets_queued.inc();
                                Resolution::Queued
                            }
                            Some(Err(_)) => {
                                self.metrics.packets_rejected.inc();
                                trace!(%address, "pending queue full");
                                Resolution::RejectedFull
                            }
                            None => Resolution::Dropped(DropReason::Unreachable),
                        },
                    }
                }
            }
        };

        self.record_eviction(evicted);
        self.dispatch(fx);
        (resolution, evicted)
    }

    /// Learn `address` is at `mac` (reply or gratuitous announcement).
    pub fn observe(&self, address: Ipv4Addr, mac: MacAddr) -> Option<Evicted> {
        self.observe_at(address, mac, Instant::now())
    }

    /// Learn `address` is at `mac` as of `now`.
    ///
    /// Creates the entry if needed. A previously invalidated address comes
    /// back as a new entry with a new generation and an empty queue.
    /// Returns the entry evicted to make room, if any.
    pub fn observe_at(&self, address: Ipv4Addr, mac: MacAddr, now: Instant) -> Option<Evicted> {
        if address.is_unspecified() || address.is_broadcast() || !mac.is_unicast() {
            trace!(%address, %mac, "ignoring unusable ARP binding");
            return None;
        }

        let mut fx = Effects::default();
        let evicted = {
            let mut guard = self.inner.lock();
            let Inner { store, engine } = &mut *guard;
            match store.insert_or_get(address, now) {
                Ok(inserted) => {
                    engine.confirm(inserted.entry, mac, now, &mut fx);
                    inserted.evicted
                }
                Err(_) => {
                    debug!(%address, "ARP cache full, not learning binding");
                    None
                }
            }
        };

        self.record_eviction(evicted);
        self.dispatch(fx);
        evicted
    }

    /// Upper-layer reachability hint (e.g. forward progress on a connection).
    ///
    /// Only entries that already hold a link address are affected.
    pub fn confirm(&self, address: Ipv4Addr) -> bool {
        self.confirm_at(address, Instant::now())
    }

    pub fn confirm_at(&self, address: Ipv4Addr, now: Instant) -> bool {
        let mut fx = Effects::default();
        let confirmed = {
            let mut guard = self.inner.lock();
            let Inner { store, engine } = &mut *guard;
            match store.get_mut(&address) {
                Some(entry) => match entry.link_address() {
                    Some(mac) => engine.confirm(entry, mac, now, &mut fx).is_some(),
                    None => false,
                },
                None => false,
            }
        };
        self.dispatch(fx);
        confirmed
    }

    /// Install a permanent binding, replacing any dynamic entry.
    pub fn insert_static(
        &self,
        address: Ipv4Addr,
        mac: MacAddr,
    ) -> Result<Option<Evicted>, DropReason> {
        self.insert_static_at(address, mac, Instant::now())
    }

    pub fn insert_static_at(
        &self,
        address: Ipv4Addr,
        mac: MacAddr,
        now: Instant,
    ) -> Result<Option<Evicted>, DropReason> {
        let mut fx = Effects::default();
        let evicted = {
            let mut guard = self.inner.lock();
            let Inner { store, engine } = &mut *guard;
            let inserted = store.insert_or_get(address, now)?;
            engine.pin(inserted.entry, mac, now, &mut fx);
            inserted.evicted
        };
        debug!(%address, %mac, "static ARP entry installed");

        self.record_eviction(evicted);
        self.dispatch(fx);
        Ok(evicted)
    }

    /// Advance every entry's timers. Call at a regular cadence.
    pub fn tick(&self, now: Instant) -> TickReport {
        let mut fx = Effects::default();
        let mut report = TickReport::default();

        {
            let mut guard = self.inner.lock();
            let Inner { store, engine } = &mut *guard;
            let mut expired = Vec::new();

            for entry in store.iter_mut() {
                let address = entry.address();
                match engine.tick(entry, now, &mut fx) {
                    TickOutcome::Idle | TickOutcome::Reprobed => {}
                    TickOutcome::Changed { from, to } => {
                        trace!(%address, %from, %to, "ARP entry aged");
                        report.transitions += 1;
                    }
                    TickOutcome::Failed {
                        from,
                        dropped_pending,
                    } => {
                        debug!(%address, %from, dropped_pending, "resolution gave up");
                        report.failed.push(address);
                        report.dropped_pending += dropped_pending;
                    }
                    TickOutcome::Expired => expired.push(address),
                }
            }

            for address in &expired {
                store.remove(address);
                trace!(%address, "ARP entry expired");
            }
            report.expired = expired.len();
            self.metrics.set_entries(store.len());
        }

        report.probes = fx
            .outbound
            .iter()
            .filter(|o| !matches!(o, Outbound::Packet { .. }))
            .count();
        self.metrics
            .resolutions_failed
            .add(report.failed.len() as u64);
        self.metrics
            .pending_dropped
            .add(report.dropped_pending as u64);
        self.dispatch(fx);
        report
    }

    /// Remove one entry. Returns the number of queued packets dropped,
    /// or `None` if the address was not cached.
    pub fn invalidate(&self, address: Ipv4Addr) -> Option<usize> {
        let removed = {
            let mut guard = self.inner.lock();
            let removed = guard.store.remove(&address);
            self.metrics.set_entries(guard.store.len());
            removed
        }?;

        let dropped = removed.pending_len();
        self.metrics.pending_dropped.add(dropped as u64);
        debug!(%address, dropped_pending = dropped, "ARP entry invalidated");
        Some(dropped)
    }

    /// Remove every entry, static ones included (e.g. link down).
    /// Returns the number of queued packets dropped.
    pub fn invalidate_all(&self) -> usize {
        let removed = {
            let mut guard = self.inner.lock();
            let removed = guard.store.clear();
            self.metrics.set_entries(0);
            removed
        };

        let dropped: usize = removed.iter().map(|e| e.pending_len()).sum();
        self.metrics.pending_dropped.add(dropped as u64);
        info!(
            entries = removed.len(),
            dropped_pending = dropped,
            "ARP cache flushed"
        );
        dropped
    }

    /// Link address and state for `address`, without side effects.
    pub fn lookup(&self, address: Ipv4Addr) -> Option<(MacAddr, State)> {
        let guard = self.inner.lock();
        let entry = guard.store.get(&address)?;
        entry.link_address().map(|mac| (mac, entry.state()))
    }

    pub fn state(&self, address: Ipv4Addr) -> Option<State> {
        self.inner.lock().store.get(&address).map(|e| e.state())
    }

    pub fn entry(&self, address: Ipv4Addr) -> Option<EntrySnapshot> {
        self.inner
            .lock()
            .store
            .get(&address)
            .map(EntrySnapshot::from_entry)
    }

    /// Copy of the whole table for display or inspection.
    pub fn snapshot(&self) -> CacheDump {
        let guard = self.inner.lock();
        CacheDump::new(
            guard.store.iter().map(EntrySnapshot::from_entry).collect(),
            guard.store.capacity(),
        )
    }

    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<ArpMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    fn record_eviction(&self, evicted: Option<Evicted>) {
        if let Some(evicted) = evicted {
            self.metrics.evictions.inc();
            self.metrics
                .pending_dropped
                .add(evicted.dropped_pending as u64);
        }
        self.metrics.set_entries(self.len());
    }

    fn dispatch(&self, fx: Effects) {
        self.metrics.packets_flushed.add(fx.flushed as u64);
        for outbound in fx.outbound {
            match outbound {
                Outbound::BroadcastProbe { .. } => self.metrics.broadcast_probes.inc(),
                Outbound::UnicastProbe { .. } => self.metrics.unicast_probes.inc(),
                Outbound::Packet { .. } => {}
            }
            outbound.dispatch(&self.transmitter);
        }
    }
}
