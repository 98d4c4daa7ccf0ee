//! Network interface core of the teaching kernel.
//!
//! The heart of this crate is the Intel E1000-family driver in
//! [`drivers::e1000`]. Everything around it (PCI configuration access, the
//! memory mapping service, the interrupt dispatcher, the event bus, the
//! network stack and the virtual filesystem) is described here only by the
//! interfaces the driver consumes, so the kernel proper can plug in its own
//! implementations.
//!
//! The crate is `no_std` + `alloc`; unit tests build against the host
//! standard library.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod drivers;
pub mod event;
pub mod fs;
pub mod interrupts;
pub mod memory;
pub mod net;
