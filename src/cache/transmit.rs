//! Outbound interface to the link layer.

use super::Packet;
use crate::protocol::MacAddr;
use parking_lot::Mutex;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Link-layer transmit collaborator.
///
/// Calls are fire-and-forget and are never made while the cache lock is
/// held, so implementations may call back into the cache.
pub trait Transmitter: Send + Sync {
    /// Who-has `target` to the broadcast address.
    fn transmit_broadcast_probe(&self, target: Ipv4Addr);

    /// Who-has `target` sent straight to its cached link address.
    fn transmit_unicast_probe(&self, target: Ipv4Addr, mac: MacAddr);

    /// A network-layer packet for `mac`.
    fn transmit(&self, packet: Packet, mac: MacAddr);
}

impl<T: Transmitter + ?Sized> Transmitter for Arc<T> {
    fn transmit_broadcast_probe(&self, target: Ipv4Addr) {
        (**self).transmit_broadcast_probe(target)
    }

    fn transmit_unicast_probe(&self, target: Ipv4Addr, mac: MacAddr) {
        (**self).transmit_unicast_probe(target, mac)
    }

    fn transmit(&self, packet: Packet, mac: MacAddr) {
        (**self).transmit(packet, mac)
    }
}

/// One unit of work for the transmitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    BroadcastProbe { target: Ipv4Addr },
    UnicastProbe { target: Ipv4Addr, mac: MacAddr },
    Packet { packet: Packet, mac: MacAddr },
}

impl Outbound {
    pub(crate) fn dispatch<T: Transmitter + ?Sized>(self, transmitter: &T) {
        match self {
            Outbound::BroadcastProbe { target } => transmitter.transmit_broadcast_probe(target),
            Outbound::UnicastProbe { target, mac } => {
                transmitter.transmit_unicast_probe(target, mac)
            }
            Outbound::Packet { packet, mac } => transmitter.transmit(packet, mac),
        }
    }
}

/// Transmitter that buffers work for an event loop to drain.
///
/// Fits callers that own the socket and send from their own loop.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: Mutex<Vec<Outbound>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything buffered so far, oldest first.
    pub fn drain(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.queue.lock())
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Transmitter for Outbox {
    fn transmit_broadcast_probe(&self, target: Ipv4Addr) {
        self.queue.lock().push(Outbound::BroadcastProbe { target });
    }

    fn transmit_unicast_probe(&self, target: Ipv4Addr, mac: MacAddr) {
        self.queue.lock().push(Outbound::UnicastProbe { target, mac });
    }

    fn transmit(&self, packet: Packet, mac: MacAddr) {
        self.queue.lock().push(Outbound::Packet { packet, mac });
    }
}
