//! Kernel event bus interface
//!
//! Producers publish [`Event`]s and forget about them; the bus fans them out
//! to whoever subscribed to the matching [`EventType`]. Delivery is not
//! guaranteed, so producers must not rely on a consumer having seen an event.

use alloc::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// An Ethernet frame arrived on a network device
    Receive,
}

/// A received Ethernet frame, copied out of the device's DMA slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveEvent {
    /// The frame bytes, owned by the event
    pub packet: Vec<u8>,
    /// Frame length as reported by the device
    pub length: u16,
}

impl ReceiveEvent {
    pub fn new(packet: Vec<u8>) -> Self {
        let length = packet.len() as u16;
        ReceiveEvent { packet, length }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Receive(ReceiveEvent),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Receive(_) => EventType::Receive,
        }
    }
}

/// Fire-and-forget publication of kernel events
pub trait EventBus: Send + Sync {
    fn publish(&self, event: Event);
}
