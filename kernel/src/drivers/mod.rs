//! Device drivers subsystem
//!
//! PCI enumeration happens in the kernel proper; this module receives the
//! enumerated devices and initializes any that have drivers available.

pub mod e1000;
pub mod pci;

use alloc::sync::Arc;
use alloc::vec::Vec;

use e1000::{E1000Error, Services, E1000};
use pci::Device;

/// Initialize a driver for every supported network controller in `devices`
///
/// A device that fails to come up is logged and skipped. Returns the
/// drivers that initialized successfully.
pub fn probe_and_init(devices: &[Device], services: &Services<'_>) -> Vec<Arc<E1000>> {
    log::info!("Initializing network drivers...");

    let mut drivers = Vec::new();
    for device in devices.iter().filter(|device| device.is_network()) {
        match e1000::initialize_detected(device.clone(), services) {
            Ok(driver) => {
                log::info!("E1000 network driver initialized successfully");
                drivers.push(driver);
            }
            Err(E1000Error::UnknownDevice { vendor, device }) => {
                log::debug!("No driver for network controller {:04x}:{:04x}", vendor, device);
            }
            Err(e) => {
                log::warn!("E1000 network driver initialization failed for {}: {}", device, e);
            }
        }
    }

    log::info!("Network drivers initialized: {} device(s)", drivers.len());
    drivers
}
