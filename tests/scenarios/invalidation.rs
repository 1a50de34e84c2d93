//! Administrative removal and stale-reply protection

use crate::{host, Harness, MAC_A, MAC_B};
use xstack_arp::cache::{Outbound, State};
use xstack_arp::config::CacheConfig;
use xstack_arp::Resolution;

#[test]
fn test_invalidate_then_reply_creates_fresh_entry() {
    let h = Harness::default();
    h.cache.resolve_at(host(1), vec![1], h.at(0));
    h.cache.resolve_at(host(1), vec![2], h.at(0));
    let before = h.cache.entry(host(1)).unwrap();

    assert_eq!(h.cache.invalidate(host(1)), Some(2));
    h.cache.observe_at(host(1), MAC_A, h.at(0));

    let after = h.cache.entry(host(1)).unwrap();
    assert_ne!(after.generation, before.generation);
    assert_eq!(after.state, State::Reachable);
    assert!(
        !h.sent().iter().any(|o| matches!(o, Outbound::Packet { .. })),
        "Packets dropped by invalidate must not be resurrected"
    );
}

#[test]
fn test_invalidate_stops_probing() {
    let h = Harness::default();
    h.cache.resolve_at(host(2), vec![1], h.at(0));
    h.sent();

    h.cache.invalidate(host(2));
    for secs in 1..10 {
        h.cache.tick(h.at(secs));
    }
    assert!(h.sent().is_empty());
    assert_eq!(h.cache.state(host(2)), None);
}

#[test]
fn test_invalidate_unknown_address() {
    let h = Harness::default();
    assert_eq!(h.cache.invalidate(host(3)), None);
}

#[test]
fn test_link_down_flushes_everything() {
    let h = Harness::new(CacheConfig {
        static_entries: vec![(host(254), MAC_B)],
        ..CacheConfig::default()
    });
    h.cache.resolve_at(host(1), vec![1], h.at(0));
    h.cache.observe_at(host(2), MAC_A, h.at(0));
    assert_eq!(h.cache.len(), 3);

    assert_eq!(h.cache.invalidate_all(), 1);
    assert!(h.cache.is_empty());
    assert_eq!(h.cache.metrics().pending_dropped.get(), 1);

    // Resolution starts over from scratch
    h.sent();
    assert_eq!(h.cache.resolve_at(host(2), vec![2], h.at(1)), Resolution::Queued);
    assert_eq!(h.sent(), vec![Outbound::BroadcastProbe { target: host(2) }]);
}
