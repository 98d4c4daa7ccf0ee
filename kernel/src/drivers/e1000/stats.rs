//! Driver-side packet counters
//!
//! Updated from interrupt context and from senders without locks.

use core::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Statistics {
    /// Frames queued for the bottom half
    pub received: AtomicU64,
    /// Frames copied out and published
    pub delivered: AtomicU64,
    /// Completed descriptors shorter than the Ethernet minimum
    pub runts: AtomicU64,
    /// Completed descriptors without end-of-packet
    pub fragments: AtomicU64,
    /// Completed descriptors with receive errors
    pub receive_errors: AtomicU64,
    /// Frames dropped because the bottom half fell behind
    pub queue_full: AtomicU64,
    /// RXO causes seen
    pub overruns: AtomicU64,
    pub transmitted: AtomicU64,
    pub late_collisions: AtomicU64,
    pub excessive_collisions: AtomicU64,
    /// Interrupts that left cause bits nobody claimed
    pub unhandled_interrupts: AtomicU64,
}

impl Statistics {
    pub const fn new() -> Self {
        Statistics {
            received: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            runts: AtomicU64::new(0),
            fragments: AtomicU64::new(0),
            receive_errors: AtomicU64::new(0),
            queue_full: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            transmitted: AtomicU64::new(0),
            late_collisions: AtomicU64::new(0),
            excessive_collisions: AtomicU64::new(0),
            unhandled_interrupts: AtomicU64::new(0),
        }
    }

    pub fn count(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatisticsSnapshot {
            received: load(&self.received),
            delivered: load(&self.delivered),
            runts: load(&self.runts),
            fragments: load(&self.fragments),
            receive_errors: load(&self.receive_errors),
            queue_full: load(&self.queue_full),
            overruns: load(&self.overruns),
            transmitted: load(&self.transmitted),
            late_collisions: load(&self.late_collisions),
            excessive_collisions: load(&self.excessive_collisions),
            unhandled_interrupts: load(&self.unhandled_interrupts),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub received: u64,
    pub delivered: u64,
    pub runts: u64,
    pub fragments: u64,
    pub receive_errors: u64,
    pub queue_full: u64,
    pub overruns: u64,
    pub transmitted: u64,
    pub late_collisions: u64,
    pub excessive_collisions: u64,
    pub unhandled_interrupts: u64,
}

impl StatisticsSnapshot {
    /// Completed descriptors that were not forwarded
    pub fn dropped(&self) -> u64 {
        self.runts + self.fragments + self.receive_errors + self.queue_full
    }
}
