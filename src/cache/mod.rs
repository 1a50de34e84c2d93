//! IPv4 ARP neighbor cache
//!
//! A bounded table of IPv4 to link-address bindings. Lookups that miss
//! start a broadcast resolution and park the caller's packet; replies
//! release the parked packets; a periodic tick ages, re-probes, and
//! expires entries.

mod engine;
mod entry;
pub mod input;
mod manager;
mod pending;
mod snapshot;
mod store;
mod timer;
mod transmit;

/// A network-layer packet waiting on, or released by, resolution.
pub type Packet = Vec<u8>;

pub use entry::{CacheEntry, EntryKind, State};
pub use input::{announcements, process_arp, ArpAction, LocalAddress};
pub use manager::{CacheManager, Resolution, TickReport};
pub use pending::PendingQueue;
pub use snapshot::{CacheDump, EntrySnapshot};
pub use store::{is_evictable, EntryStore, Inserted};
pub use timer::{TimerHandle, TimerWheel};
pub use transmit::{Outbound, Outbox, Transmitter};
