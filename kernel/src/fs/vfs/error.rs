//! VFS Error Types
//!
//! Defines error conditions that can occur during VFS operations.

use core::fmt;

/// VFS error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsError {
    /// File or directory not found
    NotFound,
    /// Not a directory (when directory expected)
    NotDirectory,
    /// File or directory already exists
    AlreadyExists,
    /// No space left on device
    NoSpace,
    /// Invalid path
    InvalidPath,
    /// Filesystem is read-only
    ReadOnly,
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::NotFound => write!(f, "not found"),
            VfsError::NotDirectory => write!(f, "not a directory"),
            VfsError::AlreadyExists => write!(f, "already exists"),
            VfsError::NoSpace => write!(f, "no space left"),
            VfsError::InvalidPath => write!(f, "invalid path"),
            VfsError::ReadOnly => write!(f, "read-only filesystem"),
        }
    }
}
