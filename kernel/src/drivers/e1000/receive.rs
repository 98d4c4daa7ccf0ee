//! Receive path: ring draining in interrupt context, hand-off to the bottom half
//!
//! [`ReceiveRing::receive_poll`] runs inside the top half. It walks the ring
//! from the cursor while descriptors are done, filters out frames nobody
//! should see, and pushes a [`ReceivedPacket`] (a pointer into the slot's
//! DMA buffer plus a length) onto the [`InterruptQueue`]. The slot goes back
//! to the device right away; the bottom half copies the bytes out later.
//! The queue has one entry per descriptor, so at most a ring's worth of
//! frames can be waiting to be copied.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::pin::Pin;
use core::task::{Context, Poll};

use crossbeam_queue::ArrayQueue;
use futures_util::stream::Stream;
use futures_util::task::AtomicWaker;
use x86_64::{PhysAddr, VirtAddr};

use super::descriptor::{Descriptors, ReceiveDescriptor};
use super::ring::HardwareDescriptorRing;
use super::stats::Statistics;
use super::E1000Error;
use crate::event::ReceiveEvent;
use crate::memory::DmaBuffer;

/// Shortest frame the driver forwards (Ethernet minimum including FCS)
pub const MIN_FRAME_LENGTH: u16 = 64;

/// A frame sitting in a receive slot, not yet copied out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedPacket {
    address: VirtAddr,
    length: u16,
}

// SAFETY: the address names a pinned DMA buffer owned by the driver.
unsafe impl Send for ReceivedPacket {}

impl ReceivedPacket {
    pub fn address(&self) -> VirtAddr {
        self.address
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    /// Copy the frame out of its DMA slot
    pub fn to_vec(&self) -> Vec<u8> {
        // SAFETY: `address` is the start of a receive buffer at least
        // `length` bytes long; only `ReceiveRing` constructs packets.
        let bytes = unsafe {
            core::slice::from_raw_parts(self.address.as_ptr::<u8>(), usize::from(self.length))
        };
        bytes.to_vec()
    }
}

/// Bounded, lock-free hand-off from the top half to the bottom half
pub struct InterruptQueue {
    queue: ArrayQueue<ReceivedPacket>,
    waker: AtomicWaker,
}

impl InterruptQueue {
    pub fn new(capacity: usize) -> Self {
        InterruptQueue {
            queue: ArrayQueue::new(capacity),
            waker: AtomicWaker::new(),
        }
    }

    /// Queue a packet without blocking; false if the queue was full
    ///
    /// Must not block or allocate.
    pub fn push(&self, packet: ReceivedPacket) -> bool {
        if self.queue.push(packet).is_err() {
            return false;
        }
        self.waker.wake();
        true
    }

    pub fn pop(&self) -> Option<ReceivedPacket> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

pub struct ReceiveRing {
    descriptors: Descriptors<ReceiveDescriptor>,
    hardware: HardwareDescriptorRing,
    /// One DMA buffer per descriptor, indexed like the ring
    buffers: Vec<DmaBuffer>,
}

impl ReceiveRing {
    pub fn new(
        descriptors: Descriptors<ReceiveDescriptor>,
        hardware: HardwareDescriptorRing,
        buffers: Vec<DmaBuffer>,
    ) -> Result<Self, E1000Error> {
        if buffers.len() != descriptors.len() {
            return Err(E1000Error::InvalidRingSize(buffers.len()));
        }
        Ok(ReceiveRing {
            descriptors,
            hardware,
            buffers,
        })
    }

    /// Point every descriptor at its buffer and give all but one slot to the
    /// device
    pub fn initialize(&mut self, base: PhysAddr) {
        for (descriptor, buffer) in self.descriptors.iter_mut().zip(&self.buffers) {
            descriptor.write_address(buffer.phys());
            descriptor.clear_status();
        }
        let last = self.descriptors.len() as u32 - 1;
        self.hardware.initialize(base, last);
    }

    /// Drain completed descriptors from the cursor onwards
    ///
    /// Returns how many frames were queued. Runts, fragments and frames with
    /// receive errors are dropped and counted; so is a frame that finds the
    /// queue full.
    pub fn receive_poll(&mut self, queue: &InterruptQueue, stats: &Statistics) -> usize {
        let mut forwarded = 0;
        while self.descriptors.current().done() {
            let index = self.descriptors.position();
            let descriptor = self.descriptors.current_mut();
            let length = descriptor.read_length();

            if length < MIN_FRAME_LENGTH {
                Statistics::count(&stats.runts);
                log::trace!("E1000: dropping runt of {} bytes in slot {}", length, index);
            } else if !descriptor.is_end_of_packet() {
                Statistics::count(&stats.fragments);
                log::trace!("E1000: dropping fragment in slot {}", index);
            } else if descriptor.has_errors() {
                Statistics::count(&stats.receive_errors);
                log::debug!(
                    "E1000: dropping frame with errors {:#04x} in slot {}",
                    descriptor.errors(),
                    index
                );
            } else {
                let packet = ReceivedPacket {
                    address: self.buffers[index].virt(),
                    length,
                };
                if queue.push(packet) {
                    Statistics::count(&stats.received);
                    forwarded += 1;
                } else {
                    Statistics::count(&stats.queue_full);
                    log::warn!("E1000: receive queue full; dropping frame");
                }
            }

            descriptor.clear_status();
            self.descriptors.set_next();
            self.hardware.advance_tail();
        }
        forwarded
    }

    pub fn position(&self) -> usize {
        self.descriptors.position()
    }

    pub fn tail(&self) -> u32 {
        self.hardware.tail()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Async bottom half: yields every queued frame, copied out of its slot
pub struct ReceiveStream {
    queue: Arc<InterruptQueue>,
}

impl ReceiveStream {
    pub fn new(queue: Arc<InterruptQueue>) -> Self {
        ReceiveStream { queue }
    }
}

impl Stream for ReceiveStream {
    type Item = ReceiveEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<ReceiveEvent>> {
        let queue = &self.queue;

        // fast path
        if let Some(packet) = queue.pop() {
            return Poll::Ready(Some(ReceiveEvent::new(packet.to_vec())));
        }

        queue.waker.register(cx.waker());
        match queue.pop() {
            Some(packet) => {
                queue.waker.take();
                Poll::Ready(Some(ReceiveEvent::new(packet.to_vec())))
            }
            None => Poll::Pending,
        }
    }
}
