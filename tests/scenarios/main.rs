//! End-to-end cache scenarios driven through the public API
//!
//! Time is explicit: every operation takes an offset from a fixed start
//! instant, so each scenario is deterministic.
//!
//! Run with: cargo test --test scenarios

mod aging;
mod concurrency;
mod invalidation;
mod resolution;

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use xstack_arp::cache::{CacheManager, Outbound, Outbox};
use xstack_arp::config::CacheConfig;
use xstack_arp::protocol::MacAddr;

pub const MAC_A: MacAddr = MacAddr([0x02, 0x00, 0x5e, 0x00, 0x00, 0x0a]);
pub const MAC_B: MacAddr = MacAddr([0x02, 0x00, 0x5e, 0x00, 0x00, 0x0b]);

pub fn host(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 0, 2, last)
}

/// A cache wired to a recording transmitter
pub struct Harness {
    pub cache: CacheManager<Arc<Outbox>>,
    pub outbox: Arc<Outbox>,
    start: Instant,
}

impl Harness {
    pub fn new(config: CacheConfig) -> Self {
        let outbox = Arc::new(Outbox::new());
        Self {
            cache: CacheManager::new(config, Arc::clone(&outbox)),
            outbox,
            start: Instant::now(),
        }
    }

    /// Instant `secs` seconds after the scenario start
    pub fn at(&self, secs: u64) -> Instant {
        self.start + Duration::from_secs(secs)
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.outbox.drain()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
