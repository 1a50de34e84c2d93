//! Resolution engine: the per-entry state machine.
//!
//! ```text
//! INCOMPLETE --reply--> REACHABLE --reachable_timeout--> STALE --send--> DELAY
//!     |                     ^  ^                            |              |
//!     | retries exhausted   |  +-------- reply -------------+--------------+
//!     v                     |                                              v
//!   FAILED <--retries exhausted-- PROBE <--------delay_timeout-------------+
//! ```
//!
//! Every time-driven step is keyed off `CacheEntry::expires_at`, so a tick
//! is a single comparison per entry.

use super::entry::{CacheEntry, EntryKind, EntryState, State};
use super::transmit::Outbound;
use crate::config::{CacheConfig, RetryBackoff};
use crate::protocol::MacAddr;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Side effects collected while the cache lock is held.
#[derive(Debug, Default)]
pub(crate) struct Effects {
    pub outbound: Vec<Outbound>,
    /// Queued packets released by a resolution
    pub flushed: usize,
}

impl Effects {
    fn flush(&mut self, packets: Vec<super::Packet>, mac: MacAddr) {
        self.flushed += packets.len();
        self.outbound
            .extend(packets.into_iter().map(|packet| Outbound::Packet { packet, mac }));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Deadline not reached
    Idle,
    /// Another probe went out without a state change
    Reprobed,
    Changed { from: State, to: State },
    /// Retries exhausted
    Failed { from: State, dropped_pending: usize },
    /// FAILED grace or STALE idle time elapsed; remove the entry
    Expired,
}

enum Step {
    Fail,
    Reprobe { probes: u32, mac: Option<MacAddr> },
    Age(MacAddr),
    Expire,
}

#[derive(Debug, Clone)]
pub(crate) struct Engine {
    reachable_timeout: Duration,
    delay_timeout: Duration,
    max_retries: u32,
    retry: RetryBackoff,
    failed_grace: Duration,
    stale_timeout: Duration,
}

impl Engine {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            reachable_timeout: config.reachable_timeout,
            delay_timeout: config.delay_timeout,
            max_retries: config.max_retries.max(1),
            retry: config.retry,
            failed_grace: config.failed_grace,
            stale_timeout: config.stale_timeout,
        }
    }

    /// Send the first broadcast probe for a freshly created entry.
    pub fn start(&self, entry: &mut CacheEntry, now: Instant, fx: &mut Effects) {
        if let EntryState::Incomplete { probes, .. } = &mut entry.state {
            *probes = 1;
        }
        entry.expires_at = Some(now + self.retry.delay(1));
        trace!(address = %entry.address(), "starting resolution");
        fx.outbound.push(Outbound::BroadcastProbe {
            target: entry.address(),
        });
    }

    /// Apply a reply or announcement carrying `mac`.
    ///
    /// Returns the previous state, or `None` when the observation was
    /// ignored: static entries keep their binding, and an observation
    /// stamped before a resolved entry's last confirmation is out of date.
    /// INCOMPLETE and FAILED entries accept any observation.
    pub fn confirm(
        &self,
        entry: &mut CacheEntry,
        mac: MacAddr,
        now: Instant,
        fx: &mut Effects,
    ) -> Option<State> {
        if entry.is_static() {
            return None;
        }
        if entry.link_address().is_some() && now < entry.last_confirmed_at {
            debug!(address = %entry.address(), "ignoring out-of-date confirmation");
            return None;
        }

        let from = entry.state();
        let flushed = entry.transition(EntryState::Reachable { mac });
        if !flushed.is_empty() {
            debug!(
                address = %entry.address(),
                %mac,
                count = flushed.len(),
                "resolved, flushing queued packets"
            );
        }
        fx.flush(flushed, mac);

        entry.last_confirmed_at = entry.last_confirmed_at.max(now);
        entry.expires_at = Some(now + self.reachable_timeout);
        if from != State::Reachable {
            debug!(address = %entry.address(), %mac, %from, "entry reachable");
        }
        Some(from)
    }

    /// Turn an entry into a permanent binding.
    pub fn pin(&self, entry: &mut CacheEntry, mac: MacAddr, now: Instant, fx: &mut Effects) {
        let flushed = entry.transition(EntryState::Reachable { mac });
        fx.flush(flushed, mac);
        entry.set_kind(EntryKind::Static);
        entry.last_confirmed_at = now;
        entry.expires_at = None;
    }

    /// Record outbound use. Returns the link address if one is known;
    /// a STALE entry moves to DELAY.
    pub fn on_send(&self, entry: &mut CacheEntry, now: Instant) -> Option<MacAddr> {
        entry.last_used_at = now;
        match entry.state {
            EntryState::Stale { mac } => {
                entry.transition(EntryState::Delay { mac });
                entry.expires_at = Some(now + self.delay_timeout);
                debug!(address = %entry.address(), "stale entry used, delaying probe");
                Some(mac)
            }
            EntryState::Reachable { mac }
            | EntryState::Delay { mac }
            | EntryState::Probe { mac, .. } => Some(mac),
            EntryState::Incomplete { .. } | EntryState::Failed => None,
        }
    }

    /// Run the time-driven transition for one entry, if due.
    pub fn tick(&self, entry: &mut CacheEntry, now: Instant, fx: &mut Effects) -> TickOutcome {
        match entry.expires_at {
            Some(deadline) if now >= deadline => {}
            _ => return TickOutcome::Idle,
        }

        let address = entry.address();
        let from = entry.state();
        let step = match entry.state {
            EntryState::Incomplete { probes, .. } | EntryState::Probe { probes, .. }
                if probes >= self.max_retries =>
            {
                Step::Fail
            }
            EntryState::Incomplete { probes, .. } => Step::Reprobe {
                probes: probes + 1,
                mac: None,
            },
            EntryState::Probe { mac, probes } => Step::Reprobe {
                probes: probes + 1,
                mac: Some(mac),
            },
            EntryState::Delay { mac } => Step::Reprobe {
                probes: 1,
                mac: Some(mac),
            },
            EntryState::Reachable { mac } => Step::Age(mac),
            EntryState::Stale { .. } | EntryState::Failed => Step::Expire,
        };

        match step {
            Step::Fail => {
                let dropped_pending = entry.transition(EntryState::Failed).len();
                entry.expires_at = Some(now + self.failed_grace);
                warn!(%address, %from, dropped_pending, "address resolution failed");
                TickOutcome::Failed {
                    from,
                    dropped_pending,
                }
            }
            Step::Reprobe { probes, mac: None } => {
                if let EntryState::Incomplete { probes: sent, .. } = &mut entry.state {
                    *sent = probes;
                }
                entry.expires_at = Some(now + self.retry.delay(probes));
                trace!(%address, probes, "re-sending broadcast probe");
                fx.outbound.push(Outbound::BroadcastProbe { target: address });
                TickOutcome::Reprobed
            }
            Step::Reprobe {
                probes,
                mac: Some(mac),
            } => {
                entry.transition(EntryState::Probe { mac, probes });
                entry.expires_at = Some(now + self.retry.delay(probes));
                trace!(%address, %mac, probes, "sending unicast probe");
                fx.outbound.push(Outbound::UnicastProbe {
                    target: address,
                    mac,
                });
                if from == State::Probe {
                    TickOutcome::Reprobed
                } else {
                    TickOutcome::Changed {
                        from,
                        to: State::Probe,
                    }
                }
            }
            Step::Age(mac) => {
                entry.transition(EntryState::Stale { mac });
                entry.expires_at = Some(now + self.stale_timeout);
                debug!(%address, "entry stale");
                TickOutcome::Changed {
                    from,
                    to: State::Stale,
                }
            }
            Step::Expire => TickOutcome::Expired,
        }
    }
}
