//! ARP input processing and request construction
//!
//! Glue between raw ARP payloads and the cache: learning bindings from
//! what arrives, answering requests for our own address, and turning
//! cache probes back into packets.

use super::manager::CacheManager;
use super::transmit::{Outbound, Transmitter};
use crate::protocol::{ArpOp, ArpPacket, MacAddr};
use crate::Result;
use std::net::Ipv4Addr;
use tracing::{trace, warn};

/// Number of gratuitous packets sent when an address is configured
pub const ANNOUNCE_COUNT: usize = 3;

/// Our own binding on the interface the cache serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalAddress {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

/// Result of processing an ARP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArpAction {
    /// Nothing learned, nothing to send
    None,
    /// Send this reply back to the requester
    Reply(ArpPacket),
    /// The sender's binding was recorded
    Learned,
}

/// Process an ARP payload received on the local interface.
///
/// The sender is learned when it is already cached, when the packet is
/// addressed to us, or when it is an announcement. Requests for our
/// address are answered.
pub fn process_arp<T: Transmitter>(
    cache: &CacheManager<T>,
    local: &LocalAddress,
    payload: &[u8],
) -> Result<ArpAction> {
    let packet = ArpPacket::parse(payload)?;

    if packet.sender_ip.is_unspecified() {
        // Address probe from a host still configuring itself
        trace!(target_ip = %packet.target_ip, "ignoring ARP from 0.0.0.0");
        return Ok(ArpAction::None);
    }
    if packet.sender_ip == local.ip {
        if packet.sender_mac != local.mac {
            warn!(
                ip = %local.ip,
                mac = %packet.sender_mac,
                "address conflict detected"
            );
        }
        return Ok(ArpAction::None);
    }

    let for_us = packet.target_ip == local.ip;
    let learn = for_us || packet.is_gratuitous() || cache.state(packet.sender_ip).is_some();
    if learn {
        cache.observe(packet.sender_ip, packet.sender_mac);
    }

    match packet.operation {
        ArpOp::Request if for_us => Ok(ArpAction::Reply(ArpPacket::reply(
            local.mac,
            local.ip,
            packet.sender_mac,
            packet.sender_ip,
        ))),
        _ if learn => Ok(ArpAction::Learned),
        _ => Ok(ArpAction::None),
    }
}

/// Gratuitous packets announcing `local`, to be sent to broadcast.
pub fn announcements(local: &LocalAddress, count: usize) -> Vec<ArpPacket> {
    vec![ArpPacket::gratuitous(local.mac, local.ip); count]
}

/// Build the request for a probe, with its link-layer destination.
///
/// Returns `None` for data packets, which need no ARP framing.
pub fn probe_request(local: &LocalAddress, outbound: &Outbound) -> Option<(MacAddr, ArpPacket)> {
    match *outbound {
        Outbound::BroadcastProbe { target } => Some((
            MacAddr::BROADCAST,
            ArpPacket::request(local.mac, local.ip, target),
        )),
        Outbound::UnicastProbe { target, mac } => {
            Some((mac, ArpPacket::request(local.mac, local.ip, target)))
        }
        Outbound::Packet { .. } => None,
    }
}
