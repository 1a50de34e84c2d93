//! Link-layer addressing and the ARP wire format.

pub mod arp;
pub mod types;

pub use arp::{ArpOp, ArpPacket, ARP_PACKET_SIZE};
pub use types::*;
