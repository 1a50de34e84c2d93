//! xstack-arp - IPv4 neighbor cache
//!
//! Address resolution for a userspace network stack: a bounded ARP cache
//! with pending-packet queues, probe retries with backoff, and NUD-style
//! reachability aging.

pub mod cache;
pub mod config;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use cache::{CacheManager, Resolution, State, Transmitter};
pub use error::{DropReason, Error, Evicted, QueueFull, Result};
