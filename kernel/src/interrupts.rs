//! Interrupt dispatcher interface
//!
//! The kernel owns the IDT and the PIC. A device driver registers an
//! [`InterruptHandler`] for a vector and asks for its IRQ line to be
//! unmasked; from then on the dispatcher calls [`InterruptHandler::trigger`]
//! in interrupt context, and later drains deferred work through
//! [`InterruptHandler::parse_interrupt_data`] outside of it.

use alloc::sync::Arc;

/// Vector offset of the first legacy PIC line
pub const PIC_1_OFFSET: u8 = 32;

/// Map a legacy IRQ line to its interrupt vector
pub const fn irq_vector(irq: u8) -> u8 {
    PIC_1_OFFSET + irq
}

/// State handed to a handler when its vector fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptFrame {
    /// The vector that fired
    pub vector: u8,
}

/// A device-side interrupt handler
///
/// `trigger` runs in interrupt context: it must not block or allocate.
/// `parse_interrupt_data` runs in the deferred (bottom-half) context and
/// consumes one unit of the data `trigger` queued.
pub trait InterruptHandler: Send + Sync {
    /// Top half: acknowledge the device and queue follow-up work
    fn trigger(&self, frame: &InterruptFrame);

    /// Whether `trigger` left data for the bottom half
    fn has_interrupt_data(&self) -> bool {
        false
    }

    /// Bottom half: process one queued item
    fn parse_interrupt_data(&self) {}
}

/// The kernel's interrupt dispatcher
///
/// The dispatcher holds a handle to the specific driver instance it calls
/// back into; drivers keep no global "current instance" pointers.
pub trait InterruptDispatcher: Send + Sync {
    /// Route `vector` to `handler`
    fn assign(&self, vector: u8, handler: Arc<dyn InterruptHandler>);

    /// Unmask the legacy IRQ line `irq`
    fn allow(&self, irq: u8);
}
