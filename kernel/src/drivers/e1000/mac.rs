//! Station address and its filesystem node

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::fs::vfs::{self, VirtualNode};

/// A 48-bit Ethernet hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Assemble from three little-endian EEPROM words
    pub fn from_words(words: [u16; 3]) -> Self {
        let mut bytes = [0u8; 6];
        for (pair, word) in bytes.chunks_exact_mut(2).zip(words) {
            pair.copy_from_slice(&word.to_le_bytes());
        }
        MacAddress(bytes)
    }

    /// Assemble from Receive Address Low/High; the valid bit and the
    /// address-select bits of RAH are ignored
    pub fn from_receive_address(low: u32, high: u32) -> Self {
        let low = low.to_le_bytes();
        let high = high.to_le_bytes();
        MacAddress([low[0], low[1], low[2], low[3], high[0], high[1]])
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Read-only node holding `xx:xx:xx:xx:xx:xx\n`
pub struct MacAddressNode {
    contents: String,
}

impl MacAddressNode {
    pub const NAME: &'static str = "mac";

    pub fn new(mac: MacAddress) -> Self {
        MacAddressNode {
            contents: format!("{}\n", mac),
        }
    }

    pub fn boxed(mac: MacAddress) -> Box<dyn VirtualNode> {
        Box::new(MacAddressNode::new(mac))
    }
}

impl VirtualNode for MacAddressNode {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn len(&self) -> usize {
        self.contents.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> usize {
        vfs::read_static(self.contents.as_bytes(), offset, buf)
    }
}
