//! Interrupt Cause Read (ICR) decoding
//!
//! Reading ICR clears it in hardware, so a handler gets exactly one look at
//! the causes of an interrupt. [`InterruptCause::read_and_clear`] captures
//! that look in a snapshot; each predicate then claims its own bit out of
//! the snapshot. Whatever nobody claimed is left behind and reported by
//! [`InterruptCause::has_unhandled_interrupts`].

use super::regs::*;
use super::register::Register;
use super::variant::{Features, Variant};
use super::E1000Error;

pub struct InterruptCause {
    register: Register,
    variant: &'static Variant,
    /// Bits not yet claimed by a predicate
    snapshot: u32,
    /// Everything the last read returned
    interrupts: u32,
}

impl InterruptCause {
    pub fn new(register: Register, variant: &'static Variant) -> Self {
        InterruptCause {
            register,
            variant,
            snapshot: 0,
            interrupts: 0,
        }
    }

    /// Read ICR (clearing it in hardware) and start a new snapshot
    pub fn read_and_clear(&mut self) -> u32 {
        let value = self.register.read_direct();
        self.snapshot = value;
        self.interrupts = value;
        value
    }

    /// Everything the last `read_and_clear` returned, claimed or not
    pub fn interrupts(&self) -> u32 {
        self.interrupts
    }

    /// Whether some asserted bit has not been claimed by a predicate
    pub fn has_unhandled_interrupts(&self) -> bool {
        self.snapshot != 0
    }

    /// The unclaimed bits
    pub fn unhandled(&self) -> u32 {
        self.snapshot
    }

    fn claim(&mut self, bits: u32) -> u32 {
        let hit = self.snapshot & bits;
        self.snapshot &= !bits;
        hit
    }

    fn claim_extended(&mut self, bit: u32, name: &'static str) -> Result<bool, E1000Error> {
        self.variant.require(Features::EXTENDED_CAUSES, name)?;
        Ok(self.claim(bit) != 0)
    }

    pub fn has_link_status_changed(&mut self) -> bool {
        self.claim(ICR_LSC) != 0
    }

    pub fn is_receive_descriptor_minimum_threshold_reached(&mut self) -> bool {
        self.claim(ICR_RXDMT0) != 0
    }

    /// The receive FIFO overflowed and at least one frame was lost
    pub fn is_receiver_overrun(&mut self) -> bool {
        self.claim(ICR_RXO) != 0
    }

    pub fn has_receive_timer_interrupt(&mut self) -> bool {
        self.claim(ICR_RXT0) != 0
    }

    pub fn is_transmit_descriptor_written_back(&mut self) -> Result<bool, E1000Error> {
        self.claim_extended(ICR_TXDW, "TXDW interrupt")
    }

    pub fn is_transmit_queue_empty(&mut self) -> Result<bool, E1000Error> {
        self.claim_extended(ICR_TXQE, "TXQE interrupt")
    }

    pub fn has_receive_sequence_error(&mut self) -> Result<bool, E1000Error> {
        self.claim_extended(ICR_RXSEQ, "RXSEQ interrupt")
    }

    pub fn is_mdio_access_completed(&mut self) -> Result<bool, E1000Error> {
        self.claim_extended(ICR_MDAC, "MDAC interrupt")
    }

    pub fn has_receiving_c_ordered_sets(&mut self) -> Result<bool, E1000Error> {
        self.claim_extended(ICR_RXCFG, "RXCFG interrupt")
    }

    pub fn is_phy_interrupt(&mut self) -> Result<bool, E1000Error> {
        self.variant.require(Features::PHY_INTERRUPT, "PHY interrupt")?;
        Ok(self.claim(ICR_PHYINT) != 0)
    }

    /// SDP6 in bit 0, SDP7 in bit 1
    pub fn general_purpose_interrupts(&mut self) -> Result<u8, E1000Error> {
        self.variant
            .require(Features::EXTENDED_CAUSES, "general purpose interrupts")?;
        Ok((self.claim(ICR_GPI_MASK) >> ICR_GPI_SHIFT) as u8)
    }

    pub fn is_transmit_descriptor_low_threshold_hit(&mut self) -> Result<bool, E1000Error> {
        self.claim_extended(ICR_TXD_LOW, "TXD_LOW interrupt")
    }

    pub fn has_small_receive_packet_detected(&mut self) -> Result<bool, E1000Error> {
        self.claim_extended(ICR_SRPD, "SRPD interrupt")
    }
}
