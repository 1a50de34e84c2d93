use std::io;
use std::net::Ipv4Addr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A per-entry pending queue is at capacity (REJECTED_FULL).
///
/// Recoverable: the packet is dropped and counted, the entry is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pending queue full")]
pub struct QueueFull;

/// Why a resolve request could not be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The entry is FAILED and its grace period has not elapsed.
    Unreachable,
    /// The store is full and no entry may be evicted.
    NoSpace,
}

/// An entry removed to make room for another (DROPPED_PENDING).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evicted {
    pub address: Ipv4Addr,
    /// Queued packets discarded together with the entry.
    pub dropped_pending: usize,
}
