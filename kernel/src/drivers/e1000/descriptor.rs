//! Legacy transmit/receive descriptors and the host-side ring cursor
//!
//! Descriptors live in a DMA block shared with the device. They are never
//! copied out: a [`TransmitDescriptor`] or [`ReceiveDescriptor`] is a view
//! onto one 16-byte slot, and every field access through it is volatile,
//! because the device writes the status bytes behind our back.
//!
//! Wire layout (little endian):
//! ```text
//! Transmit: 0 addr(8) | 8 length(2) | 10 cso(1) | 11 cmd(1) | 12 status(1) | 13 css(1) | 14 special(2)
//! Receive:  0 addr(8) | 8 length(2) | 10 csum(2) | 12 status(1) | 13 errors(1) | 14 special(2)
//! ```

use alloc::vec::Vec;
use core::mem::size_of;
use core::ptr::{addr_of, addr_of_mut, read_volatile, write_volatile, NonNull};

use x86_64::{PhysAddr, VirtAddr};

use super::regs::*;
use super::E1000Error;

/// Bytes per hardware descriptor
pub const DESCRIPTOR_BYTES: usize = 16;
/// Ring lengths must be a multiple of this many descriptors
pub const DESCRIPTOR_SET: usize = 8;
/// Longest ring RDLEN/TDLEN can describe (length field is bits 19:7)
pub const MAX_DESCRIPTORS: usize = 0xF_FF80 / DESCRIPTOR_BYTES;

/// Transmit descriptor as the device sees it
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default)]
pub struct RawTransmitDescriptor {
    pub addr: u64,
    pub length: u16,
    pub cso: u8,
    pub cmd: u8,
    pub status: u8,
    pub css: u8,
    pub special: u16,
}

/// Receive descriptor as the device sees it
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default)]
pub struct RawReceiveDescriptor {
    pub addr: u64,
    pub length: u16,
    pub checksum: u16,
    pub status: u8,
    pub errors: u8,
    pub special: u16,
}

const _: () = assert!(size_of::<RawTransmitDescriptor>() == DESCRIPTOR_BYTES);
const _: () = assert!(size_of::<RawReceiveDescriptor>() == DESCRIPTOR_BYTES);

/// A view type that can be placed over one slot of a descriptor block
pub trait Descriptor: Sized {
    /// # Safety
    ///
    /// `slot` must be 16-byte aligned and point to a descriptor that stays
    /// mapped for the lifetime of the view.
    unsafe fn at(slot: VirtAddr) -> Self;
}

pub struct TransmitDescriptor {
    raw: NonNull<RawTransmitDescriptor>,
}

impl Descriptor for TransmitDescriptor {
    unsafe fn at(slot: VirtAddr) -> Self {
        TransmitDescriptor {
            // SAFETY: the caller guarantees a mapped, non-null slot.
            raw: unsafe { NonNull::new_unchecked(slot.as_mut_ptr()) },
        }
    }
}

impl TransmitDescriptor {
    pub fn write_address(&mut self, address: PhysAddr) {
        // SAFETY: `raw` points at a live slot per `Descriptor::at`.
        unsafe { write_volatile(addr_of_mut!((*self.raw.as_ptr()).addr), address.as_u64()) }
    }

    pub fn write_length(&mut self, length: u16) {
        // SAFETY: as above.
        unsafe { write_volatile(addr_of_mut!((*self.raw.as_ptr()).length), length) }
    }

    /// Program a legacy single-buffer frame: end of packet, insert FCS and
    /// report status, with the extension bit cleared
    pub fn write_command(&mut self) {
        let cmd = (TXD_CMD_EOP | TXD_CMD_IFCS | TXD_CMD_RS) & !TXD_CMD_DEXT;
        // SAFETY: as above.
        unsafe { write_volatile(addr_of_mut!((*self.raw.as_ptr()).cmd), cmd) }
    }

    pub fn clear_status(&mut self) {
        // SAFETY: as above.
        unsafe { write_volatile(addr_of_mut!((*self.raw.as_ptr()).status), 0) }
    }

    pub fn status(&self) -> u8 {
        // SAFETY: as above.
        unsafe { read_volatile(addr_of!((*self.raw.as_ptr()).status)) }
    }

    /// The device is finished with this slot (sent, or given up after collisions)
    pub fn is_done(&self) -> bool {
        self.status() & (TXD_STAT_DD | TXD_STAT_EC | TXD_STAT_LC) != 0
    }

    pub fn has_late_collision(&self) -> bool {
        self.status() & TXD_STAT_LC != 0
    }

    pub fn has_excess_collisions(&self) -> bool {
        self.status() & TXD_STAT_EC != 0
    }
}

pub struct ReceiveDescriptor {
    raw: NonNull<RawReceiveDescriptor>,
}

impl Descriptor for ReceiveDescriptor {
    unsafe fn at(slot: VirtAddr) -> Self {
        ReceiveDescriptor {
            // SAFETY: the caller guarantees a mapped, non-null slot.
            raw: unsafe { NonNull::new_unchecked(slot.as_mut_ptr()) },
        }
    }
}

impl ReceiveDescriptor {
    pub fn write_address(&mut self, address: PhysAddr) {
        // SAFETY: `raw` points at a live slot per `Descriptor::at`.
        unsafe { write_volatile(addr_of_mut!((*self.raw.as_ptr()).addr), address.as_u64()) }
    }

    /// Physical address of the packet buffer this slot receives into
    pub fn packet_address(&self) -> PhysAddr {
        // SAFETY: as above.
        PhysAddr::new_truncate(unsafe { read_volatile(addr_of!((*self.raw.as_ptr()).addr)) })
    }

    pub fn read_length(&self) -> u16 {
        // SAFETY: as above.
        unsafe { read_volatile(addr_of!((*self.raw.as_ptr()).length)) }
    }

    pub fn status(&self) -> u8 {
        // SAFETY: as above.
        unsafe { read_volatile(addr_of!((*self.raw.as_ptr()).status)) }
    }

    pub fn errors(&self) -> u8 {
        // SAFETY: as above.
        unsafe { read_volatile(addr_of!((*self.raw.as_ptr()).errors)) }
    }

    pub fn done(&self) -> bool {
        self.status() & RXD_STAT_DD != 0
    }

    pub fn is_end_of_packet(&self) -> bool {
        self.status() & RXD_STAT_EOP != 0
    }

    pub fn has_errors(&self) -> bool {
        self.errors() & RXD_ERR_FATAL != 0
    }

    /// Hand the slot back in a clean state: status, errors and length zeroed
    pub fn clear_status(&mut self) {
        let raw = self.raw.as_ptr();
        // SAFETY: as above.
        unsafe {
            write_volatile(addr_of_mut!((*raw).status), 0);
            write_volatile(addr_of_mut!((*raw).errors), 0);
            write_volatile(addr_of_mut!((*raw).length), 0);
        }
    }
}

// SAFETY: a view is the only handle to its slot; it moves with the ring
// that owns it and the ring serializes access.
unsafe impl Send for TransmitDescriptor {}
unsafe impl Send for ReceiveDescriptor {}

/// Fixed-length ring of descriptor views plus the software cursor
pub struct Descriptors<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T> Descriptors<T> {
    /// Wrap `items`; the count must be a non-zero multiple of eight, at most `MAX_DESCRIPTORS`
    pub fn new(items: Vec<T>) -> Result<Self, E1000Error> {
        if items.is_empty() || items.len() % DESCRIPTOR_SET != 0 || items.len() > MAX_DESCRIPTORS {
            return Err(E1000Error::InvalidRingSize(items.len()));
        }
        Ok(Descriptors { items, cursor: 0 })
    }

    /// The descriptor software will touch next
    pub fn current(&self) -> &T {
        &self.items[self.cursor]
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.items[self.cursor]
    }

    /// Advance the cursor, wrapping at the end of the ring
    pub fn set_next(&mut self) {
        self.cursor = (self.cursor + 1) % self.items.len();
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<T: Descriptor> Descriptors<T> {
    /// Build `count` views over the contiguous block starting at `block`
    ///
    /// # Safety
    ///
    /// `block` must be 16-byte aligned and hold `count * 16` mapped bytes for
    /// the lifetime of the ring.
    pub unsafe fn over_block(block: VirtAddr, count: usize) -> Result<Self, E1000Error> {
        let items = (0..count)
            .map(|i| {
                // SAFETY: slot `i` lies inside the block per the caller's contract.
                unsafe { T::at(block + (i * DESCRIPTOR_BYTES) as u64) }
            })
            .collect();
        Descriptors::new(items)
    }
}
