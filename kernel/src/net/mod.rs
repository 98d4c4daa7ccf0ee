//! Network stack interface
//!
//! The protocol layers (ARP, IPv4, ...) live in the kernel proper. What a NIC
//! driver needs from them is a place to register itself; what they need from
//! a driver is the [`NetworkDevice`] surface: send an opaque Ethernet frame
//! and report the hardware address.

use alloc::sync::Arc;
use core::fmt;

use crate::drivers::e1000::MacAddress;

/// Errors a network device reports to the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// The frame was empty or exceeds what the device can send in one go
    InvalidFrame,
    /// The device rejected or could not complete the request
    DeviceError,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::InvalidFrame => write!(f, "invalid frame"),
            NetError::DeviceError => write!(f, "device error"),
        }
    }
}

/// A device that moves raw Ethernet frames
pub trait NetworkDevice: Send + Sync {
    /// Send one frame, blocking until the hardware is done with it
    fn send_packet(&self, frame: &[u8]) -> Result<(), NetError>;

    /// The device's hardware address
    fn mac_address(&self) -> MacAddress;
}

/// The kernel's registry of network devices
pub trait NetworkStack: Send + Sync {
    fn register(&self, device: Arc<dyn NetworkDevice>);
}
