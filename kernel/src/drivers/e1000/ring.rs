//! Base/length/head/tail programming for one descriptor ring
//!
//! The device keeps its own view of a ring in five registers. Software only
//! ever moves the tail: everything from head up to (not including) tail
//! belongs to the device.

use x86_64::{PhysAddr, VirtAddr};

use super::descriptor::DESCRIPTOR_BYTES;
use super::regs::*;
use super::register::{Access, Register};

pub struct HardwareDescriptorRing {
    base_low: Register,
    base_high: Register,
    length: Register,
    head: Register,
    tail: Register,
    count: u32,
    /// Last value written to the tail register
    shadow_tail: u32,
}

impl HardwareDescriptorRing {
    /// Wrap the ring register block at `mmio + block`
    ///
    /// # Safety
    ///
    /// `mmio` must map the device's register window and `block` must be the
    /// offset of a ring register block inside it.
    pub unsafe fn new(mmio: VirtAddr, block: u32, count: usize) -> Self {
        // SAFETY: offsets inside the ring block, per the caller's contract.
        let at = |offset: u32| unsafe { Register::at(mmio, block + offset, Access::ReadWrite) };
        HardwareDescriptorRing {
            base_low: at(RING_BAL),
            base_high: at(RING_BAH),
            length: at(RING_LEN),
            head: at(RING_HEAD),
            tail: at(RING_TAIL),
            count: count as u32,
            shadow_tail: 0,
        }
    }

    /// Program base and length, reset head, and set the initial tail
    pub fn initialize(&mut self, base: PhysAddr, tail: u32) {
        let base = base.as_u64();
        self.base_low.set(base as u32, !0);
        self.base_low.confirm();
        self.base_high.set((base >> 32) as u32, !0);
        self.base_high.confirm();
        self.length.set(self.count * DESCRIPTOR_BYTES as u32, !0);
        self.length.confirm();
        self.head.set(0, !0);
        self.head.confirm();
        self.write_tail(tail);
    }

    pub fn write_tail(&mut self, tail: u32) {
        let tail = tail % self.count;
        self.tail.set(tail, !0);
        self.tail.confirm();
        self.shadow_tail = tail;
    }

    /// Hand one more descriptor to the device
    pub fn advance_tail(&mut self) {
        self.write_tail(self.shadow_tail + 1);
    }

    pub fn tail(&self) -> u32 {
        self.shadow_tail
    }

    /// Current device-side head, read live
    pub fn head(&self) -> u32 {
        self.head.read_direct()
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}
