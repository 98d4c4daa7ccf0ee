//! PCI device description and configuration space access
//!
//! Bus enumeration and BAR decoding belong to the kernel's PCI subsystem.
//! Drivers receive an already-decoded [`Device`] plus a [`ConfigAccess`]
//! handle they can use to flip bits in the command register.
//!
//! The command register lives at offset 0x04 of configuration space:
//! ```text
//! Bit 0: I/O Space Enable
//! Bit 1: Memory Space Enable
//! Bit 2: Bus Master Enable
//! ```

use core::fmt;

/// Intel vendor ID
pub const INTEL_VENDOR_ID: u16 = 0x8086;

/// Offset of the command register in configuration space
const COMMAND_OFFSET: u8 = 0x04;
const COMMAND_MEMORY_SPACE: u16 = 1 << 1;
const COMMAND_BUS_MASTER: u16 = 1 << 2;

/// PCI device class codes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceClass {
    Legacy = 0x00,
    MassStorage = 0x01,
    Network = 0x02,
    Display = 0x03,
    Bridge = 0x06,
    Unknown = 0xFF,
}

/// Base Address Register (BAR) information
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Bar {
    /// Physical address of the BAR
    pub address: u64,
    /// Size of the BAR region in bytes
    pub size: u64,
    /// Whether this is an I/O port BAR (vs memory-mapped)
    pub is_io: bool,
}

impl Bar {
    /// Create an empty/invalid BAR
    pub const fn empty() -> Self {
        Bar {
            address: 0,
            size: 0,
            is_io: false,
        }
    }

    /// Check if this BAR is valid (has non-zero size)
    pub fn is_valid(&self) -> bool {
        self.size > 0
    }
}

/// Raw access to PCI configuration space, provided by the PCI subsystem
pub trait ConfigAccess: Send + Sync {
    fn read_config_word(&self, bus: u8, device: u8, function: u8, offset: u8) -> u16;
    fn write_config_word(&self, bus: u8, device: u8, function: u8, offset: u8, value: u16);
}

/// Represents a PCI device
#[derive(Clone, PartialEq, Eq)]
pub struct Device {
    /// Bus number (0-255)
    pub bus: u8,
    /// Device/slot number (0-31)
    pub device: u8,
    /// Function number (0-7)
    pub function: u8,
    /// Vendor ID
    pub vendor_id: u16,
    /// Device ID
    pub device_id: u16,
    /// Device class
    pub class: DeviceClass,
    /// Device subclass
    pub subclass: u8,
    /// Interrupt line
    pub interrupt_line: u8,
    /// Base Address Registers (up to 6 for standard devices)
    pub bars: [Bar; 6],
}

impl Device {
    /// Check if this is any network controller
    pub fn is_network(&self) -> bool {
        self.class == DeviceClass::Network
    }

    /// BAR0, where Intel NICs expose their register window
    pub fn bar0(&self) -> Option<&Bar> {
        self.bars.first().filter(|bar| bar.is_valid() && !bar.is_io)
    }

    /// Enable bus mastering for DMA
    pub fn enable_bus_master(&self, config: &dyn ConfigAccess) {
        self.set_command_bits(config, COMMAND_BUS_MASTER);
    }

    /// Enable memory space access
    pub fn enable_memory_space(&self, config: &dyn ConfigAccess) {
        self.set_command_bits(config, COMMAND_MEMORY_SPACE);
    }

    fn set_command_bits(&self, config: &dyn ConfigAccess, bits: u16) {
        let command = config.read_config_word(self.bus, self.device, self.function, COMMAND_OFFSET);
        config.write_config_word(self.bus, self.device, self.function, COMMAND_OFFSET, command | bits);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}.{} {:04x}:{:04x} {:?}/{:02x}",
            self.bus,
            self.device,
            self.function,
            self.vendor_id,
            self.device_id,
            self.class,
            self.subclass
        )
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PciDevice")
            .field("location", &format_args!("{:02x}:{:02x}.{}", self.bus, self.device, self.function))
            .field("vendor_id", &format_args!("{:#06x}", self.vendor_id))
            .field("device_id", &format_args!("{:#06x}", self.device_id))
            .field("class", &self.class)
            .field("subclass", &format_args!("{:#04x}", self.subclass))
            .field("irq", &self.interrupt_line)
            .finish()
    }
}
