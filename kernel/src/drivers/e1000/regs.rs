//! Intel E1000 Register Definitions
//!
//! Based on Intel PCI/PCI-X Family of Gigabit Ethernet Controllers
//! Software Developer's Manual. Register offsets here are the ones shared by
//! the 8254x family; a chip variant may override any of them through its
//! [`RegisterMap`](super::variant::RegisterMap).

// =============================================================================
// Register Offsets
// =============================================================================

/// Device Control Register
pub const REG_CTRL: u32 = 0x0000;
/// Device Status Register
pub const REG_STATUS: u32 = 0x0008;
/// EEPROM Read Register
pub const REG_EERD: u32 = 0x0014;
/// Interrupt Cause Read
pub const REG_ICR: u32 = 0x00C0;
/// Interrupt Mask Set/Read
pub const REG_IMS: u32 = 0x00D0;
/// Interrupt Mask Clear
pub const REG_IMC: u32 = 0x00D8;
/// Receive Control Register
pub const REG_RCTL: u32 = 0x0100;
/// Transmit Control Register
pub const REG_TCTL: u32 = 0x0400;
/// Receive descriptor ring register block (RDBAL)
pub const REG_RX_RING: u32 = 0x2800;
/// Transmit descriptor ring register block (TDBAL)
pub const REG_TX_RING: u32 = 0x3800;
/// Receive Address Low
pub const REG_RAL: u32 = 0x5400;
/// Receive Address High
pub const REG_RAH: u32 = 0x5404;

// Offsets inside a descriptor ring register block, relative to its base
/// Descriptor Base Address Low
pub const RING_BAL: u32 = 0x00;
/// Descriptor Base Address High
pub const RING_BAH: u32 = 0x04;
/// Descriptor ring length in bytes
pub const RING_LEN: u32 = 0x08;
/// Descriptor Head
pub const RING_HEAD: u32 = 0x10;
/// Descriptor Tail
pub const RING_TAIL: u32 = 0x18;

// =============================================================================
// Device Control Register (CTRL) Bits
// =============================================================================

/// Full Duplex
pub const CTRL_FD: u32 = 1 << 0;
/// Link Reset
pub const CTRL_LRST: u32 = 1 << 3;
/// Auto-Speed Detection Enable
pub const CTRL_ASDE: u32 = 1 << 5;
/// Set Link Up
pub const CTRL_SLU: u32 = 1 << 6;
/// Invert Loss-of-Signal
pub const CTRL_ILOS: u32 = 1 << 7;
/// Speed selection (bits 8-9)
pub const CTRL_SPEED_MASK: u32 = 0x3 << 8;
pub const CTRL_SPEED_SHIFT: u32 = 8;
/// Force Speed
pub const CTRL_FRCSPD: u32 = 1 << 11;
/// Force Duplex
pub const CTRL_FRCDPLX: u32 = 1 << 12;
/// Device Reset
pub const CTRL_RST: u32 = 1 << 26;
/// VLAN Mode Enable
pub const CTRL_VME: u32 = 1 << 30;
/// PHY Reset
pub const CTRL_PHY_RST: u32 = 1 << 31;

// =============================================================================
// Device Status Register (STATUS) Bits
// =============================================================================

/// Full Duplex
pub const STATUS_FD: u32 = 1 << 0;
/// Link Up
pub const STATUS_LU: u32 = 1 << 1;
/// Speed (bits 6-7)
pub const STATUS_SPEED_MASK: u32 = 0x3 << 6;
pub const STATUS_SPEED_SHIFT: u32 = 6;

// =============================================================================
// Interrupt Cause/Mask Bits
// =============================================================================

/// TX Descriptor Written Back
pub const ICR_TXDW: u32 = 1 << 0;
/// TX Queue Empty
pub const ICR_TXQE: u32 = 1 << 1;
/// Link Status Change
pub const ICR_LSC: u32 = 1 << 2;
/// RX Sequence Error
pub const ICR_RXSEQ: u32 = 1 << 3;
/// RX Descriptor Min Threshold Hit
pub const ICR_RXDMT0: u32 = 1 << 4;
/// RX Overrun
pub const ICR_RXO: u32 = 1 << 6;
/// RX Timer Interrupt
pub const ICR_RXT0: u32 = 1 << 7;
/// MDIO Access Complete
pub const ICR_MDAC: u32 = 1 << 9;
/// RX Config Queue
pub const ICR_RXCFG: u32 = 1 << 10;
/// PHY Interrupt
pub const ICR_PHYINT: u32 = 1 << 12;
/// General Purpose Interrupt on SDP6
pub const ICR_GPI_SDP6: u32 = 1 << 13;
/// General Purpose Interrupt on SDP7
pub const ICR_GPI_SDP7: u32 = 1 << 14;
/// Both general purpose interrupt bits (13-14)
pub const ICR_GPI_MASK: u32 = ICR_GPI_SDP6 | ICR_GPI_SDP7;
pub const ICR_GPI_SHIFT: u32 = 13;
/// TX Descriptor Low Threshold Hit
pub const ICR_TXD_LOW: u32 = 1 << 15;
/// Small Receive Packet Detected
pub const ICR_SRPD: u32 = 1 << 16;

/// Every cause bit the driver knows how to name
pub const ICR_KNOWN: u32 = ICR_TXDW
    | ICR_TXQE
    | ICR_LSC
    | ICR_RXSEQ
    | ICR_RXDMT0
    | ICR_RXO
    | ICR_RXT0
    | ICR_MDAC
    | ICR_RXCFG
    | ICR_PHYINT
    | ICR_GPI_MASK
    | ICR_TXD_LOW
    | ICR_SRPD;

// =============================================================================
// Receive Control Register (RCTL) Bits
// =============================================================================

/// Receiver Enable
pub const RCTL_EN: u32 = 1 << 1;
/// Store Bad Packets
pub const RCTL_SBP: u32 = 1 << 2;
/// Unicast Promiscuous Enable
pub const RCTL_UPE: u32 = 1 << 3;
/// Multicast Promiscuous Enable
pub const RCTL_MPE: u32 = 1 << 4;
/// Long Packet Reception Enable
pub const RCTL_LPE: u32 = 1 << 5;
/// Loopback Mode (bits 6-7)
pub const RCTL_LBM_MASK: u32 = 0x3 << 6;
pub const RCTL_LBM_SHIFT: u32 = 6;
/// Receive Descriptor Min Threshold Size (bits 8-9)
pub const RCTL_RDMTS_MASK: u32 = 0x3 << 8;
pub const RCTL_RDMTS_SHIFT: u32 = 8;
/// Multicast Offset (bits 12-13)
pub const RCTL_MO_MASK: u32 = 0x3 << 12;
pub const RCTL_MO_SHIFT: u32 = 12;
/// Broadcast Accept Mode
pub const RCTL_BAM: u32 = 1 << 15;
/// Receive Buffer Size (bits 16-17)
pub const RCTL_BSIZE_MASK: u32 = 0x3 << 16;
pub const RCTL_BSIZE_SHIFT: u32 = 16;
/// VLAN Filter Enable
pub const RCTL_VFE: u32 = 1 << 18;
/// Canonical Form Indicator Enable
pub const RCTL_CFIEN: u32 = 1 << 19;
/// Canonical Form Indicator value
pub const RCTL_CFI: u32 = 1 << 20;
/// Discard Pause Frames
pub const RCTL_DPF: u32 = 1 << 22;
/// Pass MAC Control Frames
pub const RCTL_PMCF: u32 = 1 << 23;
/// Buffer Size Extension
pub const RCTL_BSEX: u32 = 1 << 25;
/// Strip Ethernet CRC
pub const RCTL_SECRC: u32 = 1 << 26;

// =============================================================================
// Transmit Control Register (TCTL) Bits
// =============================================================================

/// Transmit Enable
pub const TCTL_EN: u32 = 1 << 1;
/// Pad Short Packets
pub const TCTL_PSP: u32 = 1 << 3;
/// Collision Threshold (bits 4-11)
pub const TCTL_CT_MASK: u32 = 0xFF << 4;
pub const TCTL_CT_SHIFT: u32 = 4;
/// Collision Distance (bits 12-21)
pub const TCTL_COLD_MASK: u32 = 0x3FF << 12;
pub const TCTL_COLD_SHIFT: u32 = 12;
/// Software XOFF Transmission
pub const TCTL_SWXOFF: u32 = 1 << 22;

// =============================================================================
// Receive Address High (RAH) Bits
// =============================================================================

/// Address Valid
pub const RAH_AV: u32 = 1 << 31;

// =============================================================================
// TX Descriptor Command Bits
// =============================================================================

/// End of Packet
pub const TXD_CMD_EOP: u8 = 1 << 0;
/// Insert FCS (CRC)
pub const TXD_CMD_IFCS: u8 = 1 << 1;
/// Report Status
pub const TXD_CMD_RS: u8 = 1 << 3;
/// Descriptor Extension; cleared for the legacy layout
pub const TXD_CMD_DEXT: u8 = 1 << 5;

// =============================================================================
// TX Descriptor Status Bits
// =============================================================================

/// Descriptor Done
pub const TXD_STAT_DD: u8 = 1 << 0;
/// Excess Collisions
pub const TXD_STAT_EC: u8 = 1 << 1;
/// Late Collision
pub const TXD_STAT_LC: u8 = 1 << 2;

// =============================================================================
// RX Descriptor Status and Error Bits
// =============================================================================

/// Descriptor Done
pub const RXD_STAT_DD: u8 = 1 << 0;
/// End of Packet
pub const RXD_STAT_EOP: u8 = 1 << 1;

/// CRC or alignment error
pub const RXD_ERR_CE: u8 = 1 << 0;
/// Symbol error
pub const RXD_ERR_SE: u8 = 1 << 1;
/// Sequence error
pub const RXD_ERR_SEQ: u8 = 1 << 2;
/// Carrier extension error
pub const RXD_ERR_CXE: u8 = 1 << 4;
/// TCP/UDP checksum error
pub const RXD_ERR_TCPE: u8 = 1 << 5;
/// IP checksum error
pub const RXD_ERR_IPE: u8 = 1 << 6;
/// RX data error
pub const RXD_ERR_RXE: u8 = 1 << 7;

/// Errors that make a received frame unusable
pub const RXD_ERR_FATAL: u8 =
    RXD_ERR_CE | RXD_ERR_SE | RXD_ERR_SEQ | RXD_ERR_CXE | RXD_ERR_TCPE | RXD_ERR_IPE | RXD_ERR_RXE;
