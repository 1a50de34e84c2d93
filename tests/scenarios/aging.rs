//! Reachability aging: REACHABLE, STALE, DELAY, PROBE

use crate::{host, Harness, MAC_A, MAC_B};
use xstack_arp::cache::{Outbound, State};
use xstack_arp::config::CacheConfig;
use xstack_arp::Resolution;

#[test]
fn test_reachable_to_probe_to_failed() {
    let h = Harness::default();
    h.cache.observe_at(host(1), MAC_A, h.at(0));

    h.cache.tick(h.at(29));
    assert_eq!(h.cache.state(host(1)), Some(State::Reachable));
    h.cache.tick(h.at(30));
    assert_eq!(h.cache.state(host(1)), Some(State::Stale));
    assert!(h.sent().is_empty(), "STALE revalidation is lazy");

    // Sending to a STALE entry still uses the cached address
    assert_eq!(
        h.cache.resolve_at(host(1), vec![7], h.at(31)),
        Resolution::Resolved(MAC_A)
    );
    assert_eq!(h.cache.state(host(1)), Some(State::Delay));

    h.cache.tick(h.at(35));
    assert_eq!(h.cache.state(host(1)), Some(State::Delay));
    h.cache.tick(h.at(36));
    assert_eq!(h.cache.state(host(1)), Some(State::Probe));

    // Unicast probes at 36s, 37s, 39s then failure at 43s
    for secs in [37, 39] {
        h.cache.tick(h.at(secs));
    }
    let report = h.cache.tick(h.at(43));
    assert_eq!(report.failed, vec![host(1)]);
    assert_eq!(h.cache.lookup(host(1)), None, "Link address must be invalidated");

    let sent = h.sent();
    assert_eq!(
        sent[0],
        Outbound::Packet {
            packet: vec![7],
            mac: MAC_A
        }
    );
    assert_eq!(sent.len(), 4);
    assert!(sent[1..]
        .iter()
        .all(|o| *o == Outbound::UnicastProbe { target: host(1), mac: MAC_A }));
}

#[test]
fn test_reply_during_delay_or_probe_restores_reachable() {
    let h = Harness::default();
    h.cache.observe_at(host(2), MAC_A, h.at(0));
    h.cache.tick(h.at(30));
    h.cache.resolve_at(host(2), vec![], h.at(30));
    h.cache.observe_at(host(2), MAC_A, h.at(32));
    assert_eq!(h.cache.state(host(2)), Some(State::Reachable));

    // Age again, this time into PROBE
    h.cache.tick(h.at(62));
    h.cache.resolve_at(host(2), vec![], h.at(62));
    h.cache.tick(h.at(67));
    let entry = h.cache.entry(host(2)).unwrap();
    assert_eq!(entry.state, State::Probe);
    assert_eq!(entry.retry_count, 1);

    h.cache.observe_at(host(2), MAC_B, h.at(67));
    let entry = h.cache.entry(host(2)).unwrap();
    assert_eq!(entry.state, State::Reachable);
    assert_eq!(entry.mac, Some(MAC_B));
    assert_eq!(entry.retry_count, 0);
}

#[test]
fn test_upper_layer_confirmation() {
    let h = Harness::default();
    h.cache.observe_at(host(3), MAC_A, h.at(0));
    h.cache.tick(h.at(30));
    h.cache.resolve_at(host(3), vec![], h.at(31));

    assert!(h.cache.confirm_at(host(3), h.at(32)));
    assert_eq!(h.cache.state(host(3)), Some(State::Reachable));
    h.cache.tick(h.at(36));
    assert_eq!(
        h.cache.state(host(3)),
        Some(State::Reachable),
        "Confirmed entry must not move to PROBE"
    );
}

#[test]
fn test_older_observation_does_not_regress() {
    let h = Harness::default();
    h.cache.observe_at(host(4), MAC_A, h.at(10));
    h.cache.observe_at(host(4), MAC_B, h.at(5));
    assert_eq!(h.cache.lookup(host(4)), Some((MAC_A, State::Reachable)));

    // A late tick stamped before the deadline is a no-op
    h.cache.tick(h.at(20));
    assert_eq!(h.cache.state(host(4)), Some(State::Reachable));
}

#[test]
fn test_idle_stale_entry_collected() {
    let h = Harness::default();
    h.cache.observe_at(host(5), MAC_A, h.at(0));
    h.cache.tick(h.at(30));
    let stale = h.cache.config().stale_timeout.as_secs();

    assert_eq!(h.cache.tick(h.at(29 + stale)).expired, 0);
    assert_eq!(h.cache.tick(h.at(30 + stale)).expired, 1);
    assert!(h.cache.is_empty());
}

#[test]
fn test_reply_read_before_entry_created_resolves() {
    let h = Harness::default();
    // The receive path stamped the reply just before the miss took the lock
    h.cache.resolve_at(host(6), vec![6], h.at(1));
    h.cache.observe_at(host(6), MAC_A, h.at(0));

    assert_eq!(h.cache.lookup(host(6)), Some((MAC_A, State::Reachable)));
    assert!(h.sent().contains(&Outbound::Packet {
        packet: vec![6],
        mac: MAC_A
    }));
}

#[test]
fn test_reply_after_failure_accepted_regardless_of_stamp() {
    let h = Harness::new(CacheConfig {
        max_retries: 1,
        ..CacheConfig::default()
    });
    h.cache.resolve_at(host(7), vec![], h.at(5));
    h.cache.tick(h.at(6));
    assert_eq!(h.cache.state(host(7)), Some(State::Failed));

    h.cache.observe_at(host(7), MAC_A, h.at(2));
    assert_eq!(h.cache.state(host(7)), Some(State::Reachable));
}
