//! Chip variants of the 8254x family
//!
//! One driver engine serves every supported chip. What differs between them
//! is captured in a [`Variant`] value: where the registers live, which
//! optional features exist, where the MAC address comes from and how the
//! EEPROM read register is laid out. A setter or predicate for a feature the
//! variant lacks returns [`E1000Error::Unsupported`] instead of quietly
//! doing nothing, so porting to a new chip surfaces gaps immediately.

use bitflags::bitflags;

use super::regs::*;
use super::E1000Error;

bitflags! {
    /// Optional hardware features
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Features: u32 {
        /// CTRL.VME
        const VLAN_MODE = 1 << 0;
        /// RCTL.VFE / CFIEN / CFI
        const VLAN_FILTER = 1 << 1;
        /// RCTL.LBM
        const LOOPBACK = 1 << 2;
        /// RCTL.MO
        const MULTICAST_OFFSET = 1 << 3;
        /// RCTL.DPF / PMCF
        const PAUSE_FRAMES = 1 << 4;
        /// CTRL.PHY_RST
        const PHY_RESET = 1 << 5;
        /// Causes beyond link/overrun/receive: TXDW, TXQE, RXSEQ, MDAC, RXCFG,
        /// GPI, TXD_LOW, SRPD
        const EXTENDED_CAUSES = 1 << 6;
        /// ICR.PHYINT
        const PHY_INTERRUPT = 1 << 7;
    }
}

/// Register offsets inside BAR0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    pub device_control: u32,
    pub status: u32,
    pub eeprom_read: u32,
    pub interrupt_cause: u32,
    pub interrupt_mask_set: u32,
    pub interrupt_mask_clear: u32,
    pub receive_control: u32,
    pub transmit_control: u32,
    pub receive_ring: u32,
    pub transmit_ring: u32,
    pub receive_address_low: u32,
    pub receive_address_high: u32,
}

impl RegisterMap {
    /// The layout shared by the 8254x parts
    pub const STANDARD: RegisterMap = RegisterMap {
        device_control: REG_CTRL,
        status: REG_STATUS,
        eeprom_read: REG_EERD,
        interrupt_cause: REG_ICR,
        interrupt_mask_set: REG_IMS,
        interrupt_mask_clear: REG_IMC,
        receive_control: REG_RCTL,
        transmit_control: REG_TCTL,
        receive_ring: REG_RX_RING,
        transmit_ring: REG_TX_RING,
        receive_address_low: REG_RAL,
        receive_address_high: REG_RAH,
    };
}

/// Bit layout of the EEPROM Read register (EERD)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromLayout {
    pub start: u32,
    pub done: u32,
    pub address_shift: u32,
    pub data_shift: u32,
}

impl EepromLayout {
    /// 82540EM/82545EM: START bit 0, DONE bit 4, address in bits 15:8
    pub const I8254X: EepromLayout = EepromLayout {
        start: 1 << 0,
        done: 1 << 4,
        address_shift: 8,
        data_shift: 16,
    };

    /// 82541xx: START bit 0, DONE bit 1, address in bits 15:2
    pub const I82541: EepromLayout = EepromLayout {
        start: 1 << 0,
        done: 1 << 1,
        address_shift: 2,
        data_shift: 16,
    };
}

/// Where the station address is loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacSource {
    /// Words 0..3 of the EEPROM, read through EERD
    Eeprom(EepromLayout),
    /// Receive Address 0, preloaded by the hardware from its NVM
    ReceiveAddress,
}

/// Everything that distinguishes one supported chip from another
#[derive(Debug, PartialEq, Eq)]
pub struct Variant {
    pub name: &'static str,
    pub device_ids: &'static [u16],
    pub registers: RegisterMap,
    pub features: Features,
    pub mac_source: MacSource,
    /// Directory name prefix under `/dev/network`
    pub node_prefix: &'static str,
}

impl Variant {
    pub fn supports(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    /// Fail with `Unsupported` unless the variant has `feature`
    pub fn require(&self, feature: Features, name: &'static str) -> Result<(), E1000Error> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(E1000Error::Unsupported {
                variant: self.name,
                feature: name,
            })
        }
    }

    /// Look up the variant driving PCI device `device_id`
    pub fn from_device_id(device_id: u16) -> Option<&'static Variant> {
        VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.device_ids.contains(&device_id))
    }
}

pub static INTEL_82540EM: Variant = Variant {
    name: "82540EM",
    device_ids: &[0x100E],
    registers: RegisterMap::STANDARD,
    features: Features::VLAN_MODE
        .union(Features::VLAN_FILTER)
        .union(Features::LOOPBACK)
        .union(Features::MULTICAST_OFFSET)
        .union(Features::PAUSE_FRAMES)
        .union(Features::PHY_RESET)
        .union(Features::EXTENDED_CAUSES),
    mac_source: MacSource::Eeprom(EepromLayout::I8254X),
    node_prefix: "intel82540EM",
};

pub static INTEL_82541IP: Variant = Variant {
    name: "82541IP",
    device_ids: &[0x107C],
    registers: RegisterMap::STANDARD,
    features: Features::VLAN_MODE
        .union(Features::PHY_RESET)
        .union(Features::EXTENDED_CAUSES)
        .union(Features::PHY_INTERRUPT),
    mac_source: MacSource::Eeprom(EepromLayout::I82541),
    node_prefix: "intel82541IP",
};

pub static INTEL_82545EM: Variant = Variant {
    name: "82545EM",
    device_ids: &[0x100F],
    registers: RegisterMap::STANDARD,
    features: Features::VLAN_MODE
        .union(Features::VLAN_FILTER)
        .union(Features::LOOPBACK)
        .union(Features::MULTICAST_OFFSET)
        .union(Features::PAUSE_FRAMES)
        .union(Features::PHY_RESET)
        .union(Features::EXTENDED_CAUSES),
    mac_source: MacSource::ReceiveAddress,
    node_prefix: "intel82545EM",
};

/// Every chip this driver knows how to run
pub static VARIANTS: [&Variant; 3] = [&INTEL_82540EM, &INTEL_82541IP, &INTEL_82545EM];
