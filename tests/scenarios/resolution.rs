//! Miss, queue, resolve and failure paths

use crate::{host, Harness, MAC_A, MAC_B};
use xstack_arp::cache::{Outbound, State};
use xstack_arp::config::{parse, CacheConfig};
use xstack_arp::{DropReason, Resolution};

#[test]
fn test_one_entry_per_address() {
    let h = Harness::default();
    for i in 0..3 {
        h.cache.resolve_at(host(1), vec![i], h.at(0));
    }
    h.cache.observe_at(host(1), MAC_A, h.at(0));
    h.cache.observe_at(host(1), MAC_B, h.at(1));

    let dump = h.cache.snapshot();
    assert_eq!(dump.entries().len(), 1, "Duplicate entries: {}", dump);
    assert_eq!(dump.entries()[0].mac, Some(MAC_B));
}

#[test]
fn test_queue_flush_then_resolved() {
    let h = Harness::default();

    assert_eq!(h.cache.resolve_at(host(1), vec![0xaa], h.at(0)), Resolution::Queued);
    assert_eq!(h.sent(), vec![Outbound::BroadcastProbe { target: host(1) }]);

    h.cache.observe_at(host(1), MAC_A, h.at(0));
    assert_eq!(
        h.sent(),
        vec![Outbound::Packet {
            packet: vec![0xaa],
            mac: MAC_A
        }],
        "Queued packet should be flushed to the resolved address"
    );

    assert_eq!(
        h.cache.resolve_at(host(1), vec![0xbb], h.at(1)),
        Resolution::Resolved(MAC_A)
    );
    let entry = h.cache.entry(host(1)).unwrap();
    assert_eq!(entry.pending, 0, "Resolved entry must not queue");
    assert_eq!(entry.retry_count, 0);
}

#[test]
fn test_flush_preserves_order() {
    let h = Harness::default();
    for i in 1..=3u8 {
        h.cache.resolve_at(host(2), vec![i], h.at(0));
    }
    h.sent();
    h.cache.observe_at(host(2), MAC_A, h.at(0));

    let packets: Vec<_> = h
        .sent()
        .into_iter()
        .filter_map(|o| match o {
            Outbound::Packet { packet, .. } => Some(packet[0]),
            _ => None,
        })
        .collect();
    assert_eq!(packets, vec![1, 2, 3]);
}

#[test]
fn test_queue_bound_rejects() {
    let h = Harness::default();
    let capacity = h.cache.config().queue_capacity;
    for i in 0..capacity {
        assert_eq!(
            h.cache.resolve_at(host(3), vec![i as u8], h.at(0)),
            Resolution::Queued
        );
    }
    assert_eq!(
        h.cache.resolve_at(host(3), vec![0xff], h.at(0)),
        Resolution::RejectedFull
    );
    assert_eq!(h.cache.entry(host(3)).unwrap().pending, capacity);
}

#[test]
fn test_retries_exhausted_reports_dropped_pending() {
    let h = Harness::default();
    h.cache.resolve_at(host(4), vec![1], h.at(0));
    h.cache.resolve_at(host(4), vec![2], h.at(0));

    // Backoff 1s, 2s, 4s after the first probe
    for secs in [1, 3] {
        let report = h.cache.tick(h.at(secs));
        assert_eq!(report.probes, 1);
        assert!(report.failed.is_empty());
    }
    assert!(h.cache.tick(h.at(6)).is_quiet());

    let report = h.cache.tick(h.at(7));
    assert_eq!(report.failed, vec![host(4)]);
    assert_eq!(report.dropped_pending, 2);
    assert_eq!(h.cache.state(host(4)), Some(State::Failed));

    let probes = h.sent();
    assert_eq!(probes.len(), 3);
    assert!(probes
        .iter()
        .all(|o| *o == Outbound::BroadcastProbe { target: host(4) }));
}

#[test]
fn test_failed_entry_reports_dropped_without_probing() {
    let h = Harness::new(CacheConfig {
        max_retries: 1,
        ..CacheConfig::default()
    });
    h.cache.resolve_at(host(5), vec![1], h.at(0));
    h.cache.tick(h.at(1));
    h.sent();

    assert_eq!(
        h.cache.resolve_at(host(5), vec![2], h.at(2)),
        Resolution::Dropped(DropReason::Unreachable)
    );
    assert!(h.sent().is_empty(), "FAILED entry must not re-probe");

    // Grace period over: the entry is removed by tick
    let grace = h.cache.config().failed_grace.as_secs();
    assert_eq!(h.cache.tick(h.at(1 + grace)).expired, 1);
    assert_eq!(h.cache.state(host(5)), None);
}

#[test]
fn test_configured_from_toml() {
    let config = parse(
        r#"
        [cache]
        capacity = 4
        queue_capacity = 1
        max_retries = 2

        [[static]]
        address = "192.0.2.254"
        mac = "02:00:5e:00:00:fe"
        "#,
    )
    .unwrap();
    let h = Harness::new(CacheConfig::from_config(&config).unwrap());

    assert_eq!(h.cache.len(), 1);
    assert_eq!(
        h.cache.resolve_at(host(254), vec![], h.at(0)),
        Resolution::Resolved("02:00:5e:00:00:fe".parse().unwrap())
    );

    h.cache.resolve_at(host(1), vec![1], h.at(0));
    assert_eq!(
        h.cache.resolve_at(host(1), vec![2], h.at(0)),
        Resolution::RejectedFull
    );
    h.cache.tick(h.at(1));
    let report = h.cache.tick(h.at(3));
    assert_eq!(report.failed, vec![host(1)]);
}
