//! Blocking transmit path
//!
//! [`TransmitRing::send_packet`] is a submit-and-await operation: it hands a
//! single descriptor to the device and spins on the calling thread until the
//! device reports the slot done. There is no timeout and no retry. A frame
//! the device gave up on after collisions still counts as done; the returned
//! [`TransmitStatus`] says which way it went.

use x86_64::PhysAddr;

use super::descriptor::{Descriptors, TransmitDescriptor};
use super::ring::HardwareDescriptorRing;

/// How the device finished with a transmitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitStatus {
    Completed,
    /// Collision after the slot time (half duplex only)
    LateCollision,
    /// The collision threshold was reached and the frame abandoned
    ExcessiveCollisions,
}

pub struct TransmitRing {
    descriptors: Descriptors<TransmitDescriptor>,
    hardware: HardwareDescriptorRing,
}

impl TransmitRing {
    pub fn new(descriptors: Descriptors<TransmitDescriptor>, hardware: HardwareDescriptorRing) -> Self {
        TransmitRing {
            descriptors,
            hardware,
        }
    }

    /// Program the device with the ring; head and tail both start at zero
    pub fn initialize(&mut self, base: PhysAddr) {
        self.hardware.initialize(base, 0);
    }

    /// Send the `length` bytes at physical address `buffer` and wait for the
    /// device to finish with them
    ///
    /// # Safety
    ///
    /// `buffer` must hold `length` bytes of DMA-visible memory that stays
    /// untouched until this call returns.
    pub unsafe fn send_packet(&mut self, buffer: PhysAddr, length: u16) -> TransmitStatus {
        let descriptor = self.descriptors.current_mut();
        descriptor.clear_status();
        descriptor.write_address(buffer);
        descriptor.write_length(length);
        descriptor.write_command();

        self.hardware.advance_tail();

        let descriptor = self.descriptors.current();
        while !descriptor.is_done() {
            core::hint::spin_loop();
        }

        let status = if descriptor.has_excess_collisions() {
            TransmitStatus::ExcessiveCollisions
        } else if descriptor.has_late_collision() {
            TransmitStatus::LateCollision
        } else {
            TransmitStatus::Completed
        };
        self.descriptors.set_next();
        status
    }

    /// Index of the slot the next frame goes into
    pub fn position(&self) -> usize {
        self.descriptors.position()
    }

    pub fn tail(&self) -> u32 {
        self.hardware.tail()
    }
}
