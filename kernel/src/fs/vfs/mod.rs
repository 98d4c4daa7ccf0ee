//! Virtual File System (VFS) interface
//!
//! Drivers publish read-only information (a NIC's MAC address, for example)
//! as virtual nodes. The concrete filesystem that stores them belongs to the
//! kernel proper; drivers only see the [`Filesystem`] trait.

pub mod error;

pub use error::VfsError;

use alloc::boxed::Box;

/// A node whose contents are produced on demand rather than stored on disk
pub trait VirtualNode: Send + Sync {
    /// File name of the node inside its directory
    fn name(&self) -> &str;

    /// Total length of the node's contents in bytes
    fn len(&self) -> usize;

    /// Copy contents starting at `offset` into `buf`, returning bytes read
    fn read(&self, offset: usize, buf: &mut [u8]) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The subset of the VFS that device drivers use
pub trait Filesystem: Send + Sync {
    /// Create `path` and any missing parent directories
    fn create_directory(&self, path: &str) -> Result<(), VfsError>;

    /// Attach `node` inside the directory at `path`
    fn add_virtual_node(&self, path: &str, node: Box<dyn VirtualNode>) -> Result<(), VfsError>;
}

/// Read helper for nodes backed by a fixed byte string
pub fn read_static(contents: &[u8], offset: usize, buf: &mut [u8]) -> usize {
    if offset >= contents.len() {
        return 0;
    }
    let len = buf.len().min(contents.len() - offset);
    buf[..len].copy_from_slice(&contents[offset..offset + len]);
    len
}
