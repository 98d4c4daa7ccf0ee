//! Filesystem abstraction layer
//!
//! Only the VFS surface drivers publish nodes through lives in this crate.

pub mod vfs;

pub use vfs::{Filesystem, VfsError, VirtualNode};
