//! Staged read-modify-write access to one 32-bit MMIO register
//!
//! Control groups never write hardware bit by bit. Each setter stages its
//! change in a [`BitManipulation`] (a pair of pending masks), and a single
//! [`Register::confirm`] folds every staged change into the live value:
//!
//! ```text
//! written = (live & !off_mask) | on_mask
//! ```
//!
//! `confirm` is the only place a staged register is written. There is no
//! locking here; the owner of a `Register` is its only writer.

use core::ptr::{read_volatile, write_volatile, NonNull};

use x86_64::VirtAddr;

/// Pending bit changes for one register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitManipulation {
    on: u32,
    off: u32,
}

impl BitManipulation {
    pub const fn new() -> Self {
        BitManipulation { on: 0, off: 0 }
    }

    /// Clear every bit in `mask`, then set the bits of `values` inside `mask`
    pub fn set(&mut self, values: u32, mask: u32) {
        self.off |= mask;
        self.on = (self.on & !mask) | (values & mask);
    }

    /// Turn every bit in `bits` on or off
    pub fn decide(&mut self, bits: u32, enable: bool) {
        if enable {
            self.on |= bits;
            self.off &= !bits;
        } else {
            self.off |= bits;
            self.on &= !bits;
        }
    }

    /// Fold the pending changes into `live`
    pub const fn apply(&self, live: u32) -> u32 {
        (live & !self.off) | self.on
    }

    pub const fn on_mask(&self) -> u32 {
        self.on
    }

    pub const fn off_mask(&self) -> u32 {
        self.off
    }

    pub const fn is_empty(&self) -> bool {
        self.on == 0 && self.off == 0
    }

    pub fn clear(&mut self) {
        *self = BitManipulation::new();
    }
}

/// How the live value of a register is obtained before a confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads return the current register contents
    ReadWrite,
    /// Reads are meaningless (IMC); the live value is taken to be zero
    WriteOnly,
}

/// One 32-bit MMIO cell plus the changes staged for it
#[derive(Debug)]
pub struct Register {
    address: NonNull<u32>,
    access: Access,
    staged: BitManipulation,
}

// SAFETY: a Register is the sole handle to its MMIO cell; moving it to
// another thread moves that ownership with it.
unsafe impl Send for Register {}

impl Register {
    /// Wrap the register at `base + offset`
    ///
    /// # Safety
    ///
    /// `base + offset` must be a 4-byte aligned register (or memory standing
    /// in for one) that stays mapped for the lifetime of the returned value.
    pub unsafe fn at(base: VirtAddr, offset: u32, access: Access) -> Self {
        let address = (base + u64::from(offset)).as_mut_ptr::<u32>();
        Register {
            // SAFETY: the caller guarantees a mapped, non-null register address.
            address: unsafe { NonNull::new_unchecked(address) },
            access,
            staged: BitManipulation::new(),
        }
    }

    /// Stage "clear `mask`, then set the bits of `values` inside `mask`"
    pub fn set(&mut self, values: u32, mask: u32) {
        self.staged.set(values, mask);
    }

    /// Stage `bits` on or off
    pub fn decide(&mut self, bits: u32, enable: bool) {
        self.staged.decide(bits, enable);
    }

    /// Write the staged changes to hardware and return the written value
    ///
    /// With nothing staged this touches nothing and returns the live value.
    pub fn confirm(&mut self) -> u32 {
        let live = match self.access {
            Access::ReadWrite => self.read_direct(),
            Access::WriteOnly => 0,
        };
        if self.staged.is_empty() {
            return live;
        }
        let value = self.staged.apply(live);
        // SAFETY: `address` is a mapped register per the constructor contract.
        unsafe { write_volatile(self.address.as_ptr(), value) };
        self.staged.clear();
        value
    }

    /// Read the register, bypassing anything staged
    pub fn read_direct(&self) -> u32 {
        // SAFETY: `address` is a mapped register per the constructor contract.
        unsafe { read_volatile(self.address.as_ptr()) }
    }

    /// Changes staged since the last confirm
    pub fn staged(&self) -> BitManipulation {
        self.staged
    }
}

/// A register that is only ever read (STATUS), or whose read is the whole
/// operation (ICR)
///
/// Holds no staged state, so any number of contexts may read it at once,
/// the top half included.
#[derive(Debug)]
pub struct ReadOnlyRegister {
    address: NonNull<u32>,
}

// SAFETY: reads are single volatile loads of a mapped register.
unsafe impl Send for ReadOnlyRegister {}
unsafe impl Sync for ReadOnlyRegister {}

impl ReadOnlyRegister {
    /// # Safety
    ///
    /// Same contract as [`Register::at`].
    pub unsafe fn at(base: VirtAddr, offset: u32) -> Self {
        let address = (base + u64::from(offset)).as_mut_ptr::<u32>();
        ReadOnlyRegister {
            // SAFETY: the caller guarantees a mapped, non-null register address.
            address: unsafe { NonNull::new_unchecked(address) },
        }
    }

    pub fn read(&self) -> u32 {
        // SAFETY: `address` is a mapped register per the constructor contract.
        unsafe { read_volatile(self.address.as_ptr()) }
    }
}
