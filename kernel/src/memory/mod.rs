//! Memory mapping service interface
//!
//! Drivers never touch page tables directly. They ask the kernel's memory
//! service for two things:
//!
//! - a virtual window onto a device's MMIO registers ([`MemoryService::map_mmio`])
//! - pinned, DMA-visible memory plus its physical address
//!   ([`MemoryService::map_io`] / [`MemoryService::physical_address`])
//!
//! Physical addresses handed out by the service are assumed to stay valid for
//! the lifetime of the device that uses them.

use core::fmt;

use x86_64::{PhysAddr, VirtAddr};

/// Size of one page of kernel memory
pub const PAGE_SIZE: usize = 4096;

/// Round `size` up to the next multiple of [`PAGE_SIZE`]
pub const fn page_align_up(size: usize) -> usize {
    (size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Errors reported by the memory service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// No memory left to satisfy the allocation
    OutOfMemory,
    /// The requested MMIO window could not be mapped
    MappingFailed,
    /// The virtual address is not backed by a physical frame
    NotMapped,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfMemory => write!(f, "out of memory"),
            MemoryError::MappingFailed => write!(f, "MMIO mapping failed"),
            MemoryError::NotMapped => write!(f, "address not mapped"),
        }
    }
}

/// Kernel memory service used by device drivers
pub trait MemoryService: Send + Sync {
    /// Map `size` bytes of device memory starting at `phys` into kernel space
    fn map_mmio(&self, phys: PhysAddr, size: usize) -> Result<VirtAddr, MemoryError>;

    /// Allocate `size` bytes of zeroed, pinned memory suitable for DMA
    fn map_io(&self, size: usize) -> Result<VirtAddr, MemoryError>;

    /// Translate a kernel virtual address into the physical address the
    /// device must be given
    fn physical_address(&self, virt: VirtAddr) -> Result<PhysAddr, MemoryError>;
}

/// A pinned DMA region: the CPU's view and the device's view of the same bytes
#[derive(Debug, Clone, Copy)]
pub struct DmaBuffer {
    virt: VirtAddr,
    phys: PhysAddr,
    size: usize,
}

impl DmaBuffer {
    /// Allocate and pin a region of `size` bytes through `memory`
    pub fn allocate(memory: &dyn MemoryService, size: usize) -> Result<Self, MemoryError> {
        let virt = memory.map_io(size)?;
        let phys = memory.physical_address(virt)?;
        Ok(DmaBuffer { virt, phys, size })
    }

    /// Kernel virtual address of the region
    pub fn virt(&self) -> VirtAddr {
        self.virt
    }

    /// Physical address to program into the device
    pub fn phys(&self) -> PhysAddr {
        self.phys
    }

    /// Size of the region in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy `data` to the start of the region
    ///
    /// Returns the number of bytes copied, which is `data.len()` clamped to
    /// the region size.
    pub fn copy_from(&self, data: &[u8]) -> usize {
        let len = data.len().min(self.size);
        // SAFETY: the region is `size` bytes of kernel memory owned by the
        // driver for the device's lifetime and not aliased by a Rust reference.
        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), self.virt.as_mut_ptr::<u8>(), len);
        }
        len
    }
}

// SAFETY: a DmaBuffer is a pair of addresses plus a length; the memory it
// names is pinned for the device lifetime and accesses are serialized by the
// ring that owns the slot.
unsafe impl Send for DmaBuffer {}
unsafe impl Sync for DmaBuffer {}
