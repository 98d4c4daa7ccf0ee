//! Named-field control groups over CTRL, TCTL, RCTL, IMS and IMC
//!
//! Every setter only stages its change on the wrapped [`Register`]; nothing
//! reaches the hardware until `manage()` is called. Setters that take a
//! value check it against the field's domain, and setters for optional
//! features check the chip variant, so a bad configuration fails before any
//! register is touched.

use core::ops::{Deref, DerefMut};

use super::regs::*;
use super::register::Register;
use super::variant::{Features, Variant};
use super::E1000Error;

/// Link speed encodings shared by CTRL.SPEED and STATUS.SPEED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSpeed {
    Mbps10 = 0b00,
    Mbps100 = 0b01,
    Mbps1000 = 0b10,
}

impl LinkSpeed {
    /// Decode a two-bit speed field (0b11 also means 1000 Mb/s)
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => LinkSpeed::Mbps10,
            0b01 => LinkSpeed::Mbps100,
            _ => LinkSpeed::Mbps1000,
        }
    }

    pub fn mbps(self) -> u32 {
        match self {
            LinkSpeed::Mbps10 => 10,
            LinkSpeed::Mbps100 => 100,
            LinkSpeed::Mbps1000 => 1000,
        }
    }
}

fn invalid(field: &'static str, value: u32) -> E1000Error {
    E1000Error::InvalidArgument { field, value }
}

// =============================================================================
// Device Control (CTRL)
// =============================================================================

pub struct DeviceControl {
    register: Register,
    variant: &'static Variant,
}

impl DeviceControl {
    pub fn new(register: Register, variant: &'static Variant) -> Self {
        DeviceControl { register, variant }
    }

    pub fn full_duplex(&mut self, enable: bool) {
        self.register.decide(CTRL_FD, enable);
    }

    pub fn link_reset(&mut self, enable: bool) {
        self.register.decide(CTRL_LRST, enable);
    }

    pub fn auto_speed_detection(&mut self, enable: bool) {
        self.register.decide(CTRL_ASDE, enable);
    }

    /// Force the link up regardless of the PHY's link indication
    pub fn set_link_up(&mut self, enable: bool) {
        self.register.decide(CTRL_SLU, enable);
    }

    pub fn invert_loss_of_signal(&mut self, enable: bool) {
        self.register.decide(CTRL_ILOS, enable);
    }

    /// Speed used when `force_speed` is set
    pub fn speed(&mut self, speed: LinkSpeed) {
        self.register
            .set((speed as u32) << CTRL_SPEED_SHIFT, CTRL_SPEED_MASK);
    }

    pub fn force_speed(&mut self, enable: bool) {
        self.register.decide(CTRL_FRCSPD, enable);
    }

    pub fn force_duplex(&mut self, enable: bool) {
        self.register.decide(CTRL_FRCDPLX, enable);
    }

    pub fn vlan_mode(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.variant.require(Features::VLAN_MODE, "VLAN mode")?;
        self.register.decide(CTRL_VME, enable);
        Ok(())
    }

    pub fn reset_internal_phy(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.variant.require(Features::PHY_RESET, "PHY reset")?;
        self.register.decide(CTRL_PHY_RST, enable);
        Ok(())
    }

    /// Global device reset; self-clearing in hardware
    pub fn device_reset(&mut self, enable: bool) {
        self.register.decide(CTRL_RST, enable);
    }

    /// Commit the staged changes, returning the value written
    pub fn manage(&mut self) -> u32 {
        self.register.confirm()
    }
}

// =============================================================================
// Transmit Control (TCTL)
// =============================================================================

pub struct TransmitControl {
    register: Register,
}

impl TransmitControl {
    pub fn new(register: Register) -> Self {
        TransmitControl { register }
    }

    pub fn enable(&mut self, enable: bool) {
        self.register.decide(TCTL_EN, enable);
    }

    pub fn pad_short_packets(&mut self, enable: bool) {
        self.register.decide(TCTL_PSP, enable);
    }

    /// Number of attempts at retransmission before giving up on a packet
    pub fn collision_threshold(&mut self, threshold: u8) {
        self.register
            .set(u32::from(threshold) << TCTL_CT_SHIFT, TCTL_CT_MASK);
    }

    /// Minimum number of byte times that must elapse for proper CSMA/CD
    pub fn collision_distance(&mut self, distance: u16) -> Result<(), E1000Error> {
        let distance = u32::from(distance);
        if distance > TCTL_COLD_MASK >> TCTL_COLD_SHIFT {
            return Err(invalid("collision distance", distance));
        }
        self.register.set(distance << TCTL_COLD_SHIFT, TCTL_COLD_MASK);
        Ok(())
    }

    pub fn software_xoff(&mut self, enable: bool) {
        self.register.decide(TCTL_SWXOFF, enable);
    }

    pub fn manage(&mut self) -> u32 {
        self.register.confirm()
    }
}

// =============================================================================
// Receive Control (RCTL)
// =============================================================================

pub struct ReceiveControl {
    register: Register,
    variant: &'static Variant,
}

impl ReceiveControl {
    pub fn new(register: Register, variant: &'static Variant) -> Self {
        ReceiveControl { register, variant }
    }

    pub fn receiver(&mut self, enable: bool) {
        self.register.decide(RCTL_EN, enable);
    }

    pub fn store_bad_packets(&mut self, enable: bool) {
        self.register.decide(RCTL_SBP, enable);
    }

    pub fn unicast_promiscuous(&mut self, enable: bool) {
        self.register.decide(RCTL_UPE, enable);
    }

    pub fn multicast_promiscuous(&mut self, enable: bool) {
        self.register.decide(RCTL_MPE, enable);
    }

    pub fn long_packet_reception(&mut self, enable: bool) {
        self.register.decide(RCTL_LPE, enable);
    }

    /// 0 = normal operation, 3 = PHY/external loopback; 1 and 2 are reserved
    pub fn loopback_mode(&mut self, mode: u8) -> Result<(), E1000Error> {
        self.variant.require(Features::LOOPBACK, "loopback mode")?;
        if mode != 0b00 && mode != 0b11 {
            return Err(invalid("loopback mode", u32::from(mode)));
        }
        self.register
            .set(u32::from(mode) << RCTL_LBM_SHIFT, RCTL_LBM_MASK);
        Ok(())
    }

    /// RXDMT0 fires when free descriptors drop to 1/2 (0), 1/4 (1) or 1/8 (2)
    /// of the ring
    pub fn descriptor_minimum_threshold_size(&mut self, size: u8) -> Result<(), E1000Error> {
        if size > 0b10 {
            return Err(invalid("descriptor minimum threshold size", u32::from(size)));
        }
        self.register
            .set(u32::from(size) << RCTL_RDMTS_SHIFT, RCTL_RDMTS_MASK);
        Ok(())
    }

    /// Which bits of a multicast address index the filter table: 47:36 (0)
    /// down to 43:32 (3)
    pub fn multicast_offset(&mut self, offset: u8) -> Result<(), E1000Error> {
        self.variant
            .require(Features::MULTICAST_OFFSET, "multicast offset")?;
        if offset > 0b11 {
            return Err(invalid("multicast offset", u32::from(offset)));
        }
        self.register
            .set(u32::from(offset) << RCTL_MO_SHIFT, RCTL_MO_MASK);
        Ok(())
    }

    pub fn broadcast_accept_mode(&mut self, enable: bool) {
        self.register.decide(RCTL_BAM, enable);
    }

    /// Receive buffer size in bytes; also decides the BSEX extension bit
    pub fn buffer_size(&mut self, bytes: u32) -> Result<(), E1000Error> {
        let (bits, extended) = match bytes {
            2048 => (0b00, false),
            1024 => (0b01, false),
            512 => (0b10, false),
            256 => (0b11, false),
            16384 => (0b01, true),
            8192 => (0b10, true),
            4096 => (0b11, true),
            _ => return Err(invalid("receive buffer size", bytes)),
        };
        self.register.set(bits << RCTL_BSIZE_SHIFT, RCTL_BSIZE_MASK);
        self.register.decide(RCTL_BSEX, extended);
        Ok(())
    }

    pub fn vlan_filter(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.variant.require(Features::VLAN_FILTER, "VLAN filter")?;
        self.register.decide(RCTL_VFE, enable);
        Ok(())
    }

    pub fn canonical_form_indicator(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.variant
            .require(Features::VLAN_FILTER, "canonical form indicator")?;
        self.register.decide(RCTL_CFIEN, enable);
        Ok(())
    }

    pub fn canonical_form_indicator_bit_value(&mut self, set: bool) -> Result<(), E1000Error> {
        self.variant
            .require(Features::VLAN_FILTER, "canonical form indicator value")?;
        self.register.decide(RCTL_CFI, set);
        Ok(())
    }

    pub fn discard_pause_frames(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.variant
            .require(Features::PAUSE_FRAMES, "discard pause frames")?;
        self.register.decide(RCTL_DPF, enable);
        Ok(())
    }

    pub fn pass_mac_control_frames(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.variant
            .require(Features::PAUSE_FRAMES, "pass MAC control frames")?;
        self.register.decide(RCTL_PMCF, enable);
        Ok(())
    }

    pub fn strip_ethernet_crc(&mut self, enable: bool) {
        self.register.decide(RCTL_SECRC, enable);
    }

    pub fn manage(&mut self) -> u32 {
        self.register.confirm()
    }
}

// =============================================================================
// Interrupt Mask Set (IMS) / Interrupt Mask Clear (IMC)
// =============================================================================

/// Per-cause bit staging shared by IMS and IMC
///
/// On IMS a staged bit enables its cause; on IMC the same bit masks it.
pub struct InterruptMask {
    register: Register,
    variant: &'static Variant,
}

impl InterruptMask {
    fn extended(&mut self, bit: u32, enable: bool, name: &'static str) -> Result<(), E1000Error> {
        self.variant.require(Features::EXTENDED_CAUSES, name)?;
        self.register.decide(bit, enable);
        Ok(())
    }

    /// Cause bits this variant defines
    fn supported(&self) -> u32 {
        let mut bits = ICR_LSC | ICR_RXDMT0 | ICR_RXO | ICR_RXT0;
        if self.variant.supports(Features::EXTENDED_CAUSES) {
            bits |= ICR_TXDW
                | ICR_TXQE
                | ICR_RXSEQ
                | ICR_MDAC
                | ICR_RXCFG
                | ICR_GPI_MASK
                | ICR_TXD_LOW
                | ICR_SRPD;
        }
        if self.variant.supports(Features::PHY_INTERRUPT) {
            bits |= ICR_PHYINT;
        }
        bits
    }

    pub fn link_status_change(&mut self, enable: bool) {
        self.register.decide(ICR_LSC, enable);
    }

    pub fn receive_descriptor_minimum_threshold_hit(&mut self, enable: bool) {
        self.register.decide(ICR_RXDMT0, enable);
    }

    pub fn receiver_fifo_overrun(&mut self, enable: bool) {
        self.register.decide(ICR_RXO, enable);
    }

    pub fn receive_timer(&mut self, enable: bool) {
        self.register.decide(ICR_RXT0, enable);
    }

    pub fn transmit_descriptor_written_back(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.extended(ICR_TXDW, enable, "TXDW interrupt")
    }

    pub fn transmit_queue_empty(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.extended(ICR_TXQE, enable, "TXQE interrupt")
    }

    pub fn receive_sequence_error(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.extended(ICR_RXSEQ, enable, "RXSEQ interrupt")
    }

    pub fn mdio_access_complete(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.extended(ICR_MDAC, enable, "MDAC interrupt")
    }

    pub fn receiving_c_ordered_sets(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.extended(ICR_RXCFG, enable, "RXCFG interrupt")
    }

    pub fn phy_interrupt(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.variant.require(Features::PHY_INTERRUPT, "PHY interrupt")?;
        self.register.decide(ICR_PHYINT, enable);
        Ok(())
    }

    /// Stage the SDP6 (bit 0) and SDP7 (bit 1) general purpose interrupts
    pub fn general_purpose_interrupts(&mut self, mask: u8) -> Result<(), E1000Error> {
        self.variant
            .require(Features::EXTENDED_CAUSES, "general purpose interrupts")?;
        if mask > 0b11 {
            return Err(invalid("general purpose interrupt mask", u32::from(mask)));
        }
        self.register
            .set(u32::from(mask) << ICR_GPI_SHIFT, ICR_GPI_MASK);
        Ok(())
    }

    pub fn transmit_descriptor_low_threshold_hit(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.extended(ICR_TXD_LOW, enable, "TXD_LOW interrupt")
    }

    pub fn small_receive_packet_detection(&mut self, enable: bool) -> Result<(), E1000Error> {
        self.extended(ICR_SRPD, enable, "SRPD interrupt")
    }

    /// Stage every cause this variant defines
    pub fn all(&mut self) {
        let bits = self.supported();
        self.register.decide(bits, true);
    }

    /// Stage every reserved bit to zero
    pub fn clear_reserved(&mut self) {
        let bits = self.supported();
        self.register.decide(!bits, false);
    }

    pub fn manage(&mut self) -> u32 {
        self.register.confirm()
    }
}

/// IMS: a one in a confirmed bit enables that cause
pub struct InterruptEnable(InterruptMask);

impl InterruptEnable {
    pub fn new(register: Register, variant: &'static Variant) -> Self {
        InterruptEnable(InterruptMask { register, variant })
    }
}

impl Deref for InterruptEnable {
    type Target = InterruptMask;

    fn deref(&self) -> &InterruptMask {
        &self.0
    }
}

impl DerefMut for InterruptEnable {
    fn deref_mut(&mut self) -> &mut InterruptMask {
        &mut self.0
    }
}

/// IMC: a one in a confirmed bit masks that cause
///
/// The register is write-only, so its staging starts from zero rather than
/// from a read of the live value.
pub struct InterruptDisable(InterruptMask);

impl InterruptDisable {
    pub fn new(register: Register, variant: &'static Variant) -> Self {
        InterruptDisable(InterruptMask { register, variant })
    }
}

impl Deref for InterruptDisable {
    type Target = InterruptMask;

    fn deref(&self) -> &InterruptMask {
        &self.0
    }
}

impl DerefMut for InterruptDisable {
    fn deref_mut(&mut self) -> &mut InterruptMask {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::e1000::register::tests::FakeCell;
    use crate::drivers::e1000::variant::tests::MINIMAL;
    use crate::drivers::e1000::variant::{INTEL_82540EM, INTEL_82541IP};

    #[test]
    fn test_link_up_and_auto_speed_set_bits_6_and_5() {
        let mut cell = FakeCell::new(0);
        let mut control = DeviceControl::new(cell.register(), &INTEL_82540EM);
        control.set_link_up(true);
        control.auto_speed_detection(true);
        assert_eq!(control.manage(), (1 << 6) | (1 << 5));
        assert_eq!(cell.get(), 0b0110_0000);
    }

    #[test]
    fn test_loopback_mode_domain() {
        let mut cell = FakeCell::new(0);
        let mut control = ReceiveControl::new(cell.register(), &INTEL_82540EM);
        assert_eq!(
            control.loopback_mode(1),
            Err(E1000Error::InvalidArgument { field: "loopback mode", value: 1 })
        );
        assert!(control.loopback_mode(2).is_err());
        assert!(control.loopback_mode(0).is_ok());
        assert!(control.loopback_mode(3).is_ok());
        assert_eq!(control.manage(), 0b11 << 6);
    }

    #[test]
    fn test_loopback_unsupported_on_82541() {
        let mut cell = FakeCell::new(0);
        let mut control = ReceiveControl::new(cell.register(), &INTEL_82541IP);
        assert!(matches!(
            control.loopback_mode(0),
            Err(E1000Error::Unsupported { variant: "82541IP", .. })
        ));
    }

    #[test]
    fn test_buffer_size_encoding() {
        let mut cell = FakeCell::new(0);
        let mut control = ReceiveControl::new(cell.register(), &INTEL_82540EM);

        control.buffer_size(4096).unwrap();
        assert_eq!(control.manage(), (0b11 << 16) | RCTL_BSEX);

        control.buffer_size(2048).unwrap();
        assert_eq!(control.manage(), 0);

        control.buffer_size(512).unwrap();
        assert_eq!(control.manage(), 0b10 << 16);

        assert!(control.buffer_size(3000).is_err());
        assert!(control.buffer_size(32768).is_err());
    }

    #[test]
    fn test_threshold_and_offset_domains() {
        let mut cell = FakeCell::new(0);
        let mut control = ReceiveControl::new(cell.register(), &INTEL_82540EM);
        assert!(control.descriptor_minimum_threshold_size(3).is_err());
        assert!(control.descriptor_minimum_threshold_size(1).is_ok());
        assert!(control.multicast_offset(4).is_err());
        assert!(control.multicast_offset(2).is_ok());
        assert_eq!(control.manage(), (1 << 8) | (2 << 12));
    }

    #[test]
    fn test_transmit_control_fields() {
        let mut cell = FakeCell::new(0);
        let mut control = TransmitControl::new(cell.register());
        control.enable(true);
        control.pad_short_packets(true);
        control.collision_threshold(0x0F);
        control.collision_distance(0x40).unwrap();
        assert!(control.collision_distance(0x400).is_err());
        assert_eq!(
            control.manage(),
            TCTL_EN | TCTL_PSP | (0x0F << 4) | (0x40 << 12)
        );
    }

    #[test]
    fn test_speed_replaces_field() {
        let mut cell = FakeCell::new(CTRL_SPEED_MASK);
        let mut control = DeviceControl::new(cell.register(), &INTEL_82540EM);
        control.speed(LinkSpeed::Mbps100);
        assert_eq!(control.manage(), 0b01 << 8);
    }

    #[test]
    fn test_interrupt_disable_masks_supported_causes_only() {
        let mut cell = FakeCell::new(0xFFFF_FFFF);
        let mut disable = InterruptDisable::new(cell.write_only(), &MINIMAL);
        disable.all();
        disable.clear_reserved();
        assert_eq!(disable.manage(), ICR_LSC | ICR_RXDMT0 | ICR_RXO | ICR_RXT0);

        let mut cell = FakeCell::new(0xFFFF_FFFF);
        let mut disable = InterruptDisable::new(cell.write_only(), &INTEL_82541IP);
        disable.all();
        disable.clear_reserved();
        assert_eq!(disable.manage(), ICR_KNOWN);
    }

    #[test]
    fn test_interrupt_enable_extended_causes() {
        let mut cell = FakeCell::new(0);
        let mut enable = InterruptEnable::new(cell.register(), &INTEL_82540EM);
        enable.link_status_change(true);
        enable.general_purpose_interrupts(0b11).unwrap();
        enable.mdio_access_complete(true).unwrap();
        assert!(enable.general_purpose_interrupts(0b100).is_err());
        assert!(enable.phy_interrupt(true).is_err());
        assert_eq!(enable.manage(), ICR_LSC | ICR_GPI_MASK | ICR_MDAC);

        let mut cell = FakeCell::new(0);
        let mut enable = InterruptEnable::new(cell.register(), &INTEL_82541IP);
        assert!(enable.mdio_access_complete(true).is_ok());
        assert!(enable.small_receive_packet_detection(true).is_ok());
        assert!(enable.transmit_descriptor_low_threshold_hit(true).is_ok());
        assert!(enable.phy_interrupt(true).is_ok());

        let mut cell = FakeCell::new(0);
        let mut enable = InterruptEnable::new(cell.register(), &MINIMAL);
        assert_eq!(
            enable.mdio_access_complete(true),
            Err(E1000Error::Unsupported {
                variant: "minimal",
                feature: "MDAC interrupt",
            })
        );
    }
}
