//! Concurrent callers and re-entrant transmitters

use crate::{host, Harness, MAC_A};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread;
use xstack_arp::cache::{CacheManager, State, Transmitter};
use xstack_arp::config::CacheConfig;
use xstack_arp::protocol::MacAddr;

/// Transmitter that queries the cache from inside every callback
#[derive(Default)]
struct Reentrant {
    cache: OnceLock<Weak<CacheManager<Arc<Reentrant>>>>,
    seen: Mutex<Vec<Option<State>>>,
}

impl Reentrant {
    fn record(&self, target: Ipv4Addr) {
        if let Some(cache) = self.cache.get().and_then(Weak::upgrade) {
            self.seen.lock().unwrap().push(cache.state(target));
        }
    }
}

impl Transmitter for Reentrant {
    fn transmit_broadcast_probe(&self, target: Ipv4Addr) {
        self.record(target);
    }

    fn transmit_unicast_probe(&self, target: Ipv4Addr, _mac: MacAddr) {
        self.record(target);
    }

    fn transmit(&self, packet: Vec<u8>, _mac: MacAddr) {
        self.record(Ipv4Addr::from([packet[0], packet[1], packet[2], packet[3]]));
    }
}

#[test]
fn test_transmitter_may_call_back_into_cache() {
    let tx = Arc::new(Reentrant::default());
    let cache = Arc::new(CacheManager::new(CacheConfig::default(), Arc::clone(&tx)));
    tx.cache.set(Arc::downgrade(&cache)).ok();

    let target = host(1);
    cache.resolve(target, target.octets().to_vec());
    cache.observe(target, MAC_A);

    // Probe saw the new INCOMPLETE entry; the flush saw it resolved
    assert_eq!(
        *tx.seen.lock().unwrap(),
        vec![Some(State::Incomplete), Some(State::Reachable)]
    );
}

#[test]
fn test_observe_and_tick_race() {
    let h = Arc::new(Harness::new(CacheConfig {
        capacity: 128,
        ..CacheConfig::default()
    }));

    let observer = {
        let h = Arc::clone(&h);
        thread::spawn(move || {
            for i in 0..100u8 {
                h.cache.resolve_at(host(i), vec![i], h.at(0));
                h.cache.observe_at(host(i), MAC_A, h.at(1));
            }
        })
    };
    let ticker = {
        let h = Arc::clone(&h);
        thread::spawn(move || {
            for _ in 0..100 {
                h.cache.tick(h.at(1));
            }
        })
    };
    observer.join().unwrap();
    ticker.join().unwrap();

    // One probe per address was due at 1s; no entry may have failed
    let dump = h.cache.snapshot();
    assert_eq!(dump.entries().len(), 100);
    assert_eq!(dump.count(State::Reachable), 100);
    assert!(dump.entries().iter().all(|e| e.pending == 0));
}
