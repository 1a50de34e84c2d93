//! Bounded queue of outbound packets parked behind one unresolved address.

use super::Packet;
use crate::error::QueueFull;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct PendingQueue {
    packets: VecDeque<Packet>,
    capacity: usize,
    /// Packets refused since the entry was created
    rejected: u64,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            capacity,
            rejected: 0,
        }
    }

    /// Park a packet. A full queue drops the packet and counts it.
    pub fn enqueue(&mut self, packet: Packet) -> Result<(), QueueFull> {
        if self.packets.len() >= self.capacity {
            self.rejected += 1;
            return Err(QueueFull);
        }
        self.packets.push_back(packet);
        Ok(())
    }

    /// Take every queued packet in arrival order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Packet> {
        self.packets.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
