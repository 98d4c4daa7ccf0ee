//! Intel 8254x (e1000) Gigabit Ethernet Driver
//!
//! One engine drives every chip listed in [`variant::VARIANTS`]; the
//! per-chip differences (register offsets, optional features, where the MAC
//! address comes from) are data, not code.
//!
//! The driver is split the way the hardware is:
//!
//! - control groups ([`control`]) stage named bit fields of CTRL, RCTL,
//!   TCTL, IMS and IMC and commit them in one write
//! - [`interrupt::InterruptCause`] decodes ICR
//! - descriptor rings ([`descriptor`], [`ring`]) are driven by
//!   [`transmit::TransmitRing`] and [`receive::ReceiveRing`]
//!
//! Interrupt handling is split into a top half ([`E1000::trigger`]) that
//! acknowledges the device and moves finished receive descriptors onto a
//! bounded queue, and a bottom half ([`E1000::parse_interrupt_data`], or a
//! [`ReceiveStream`]) that copies frames out and publishes them.
//!
//! # References
//! - Intel PCI/PCI-X Family of Gigabit Ethernet Controllers Software Developer's Manual
//! - OSDev Wiki: https://wiki.osdev.org/Intel_8254x

pub mod control;
pub mod descriptor;
pub mod eeprom;
pub mod interrupt;
pub mod mac;
pub mod receive;
pub mod register;
pub mod regs;
pub mod ring;
pub mod stats;
pub mod transmit;
pub mod variant;

use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use spin::Mutex;
use x86_64::{PhysAddr, VirtAddr};

use crate::drivers::pci::{ConfigAccess, Device, INTEL_VENDOR_ID};
use crate::event::{Event, EventBus, ReceiveEvent};
use crate::fs::Filesystem;
use crate::interrupts::{irq_vector, InterruptDispatcher, InterruptFrame, InterruptHandler};
use crate::memory::{page_align_up, DmaBuffer, MemoryError, MemoryService};
use crate::net::{NetError, NetworkDevice, NetworkStack};

use control::{
    DeviceControl, InterruptDisable, InterruptEnable, ReceiveControl, TransmitControl,
};
use descriptor::{Descriptors, DESCRIPTOR_BYTES, DESCRIPTOR_SET, MAX_DESCRIPTORS};
use eeprom::Eeprom;
use interrupt::InterruptCause;
use receive::{InterruptQueue, ReceiveRing};
use register::{Access, ReadOnlyRegister, Register};
use regs::*;
use ring::HardwareDescriptorRing;
use stats::{Statistics, StatisticsSnapshot};
use transmit::TransmitRing;

pub use control::LinkSpeed;
pub use mac::{MacAddress, MacAddressNode};
pub use receive::ReceiveStream;
pub use transmit::TransmitStatus;
pub use variant::{Features, MacSource, Variant};

/// Size of the register window behind BAR0
pub const MMIO_SIZE: usize = 0x20000;

/// Largest frame a single legacy transmit descriptor may carry
pub const MAX_FRAME_LENGTH: usize = 16288;

/// Receive buffer sizes RCTL can encode
pub const RECEIVE_BUFFER_SIZES: [u32; 7] = [256, 512, 1024, 2048, 4096, 8192, 16384];

/// Directory the MAC address nodes are published under
const NODE_DIRECTORY: &str = "/dev/network";

/// Per-frame logging, compiled in with the `packet_trace` feature
macro_rules! packet_trace {
    ($($arg:tt)*) => {
        if cfg!(feature = "packet_trace") {
            log::trace!($($arg)*);
        }
    };
}

/// Index appended to the next published node name
static NODE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Errors reported by the e1000 driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum E1000Error {
    /// A setter or configuration value outside its field's domain
    InvalidArgument { field: &'static str, value: u32 },
    /// The chip variant has no such feature
    Unsupported {
        variant: &'static str,
        feature: &'static str,
    },
    /// Descriptor count is zero, not a multiple of eight, or too long for RDLEN/TDLEN
    InvalidRingSize(usize),
    /// BAR0 is missing, an I/O BAR, or out of the physical address range
    NoMmioBar,
    /// No variant drives this PCI id
    UnknownDevice { vendor: u16, device: u16 },
    Memory(MemoryError),
    /// The EEPROM never reported DONE for `word`
    EepromTimeout { word: u8 },
    FrameTooLarge { length: usize, limit: usize },
    EmptyFrame,
}

impl fmt::Display for E1000Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            E1000Error::InvalidArgument { field, value } => {
                write!(f, "invalid {}: {:#x}", field, value)
            }
            E1000Error::Unsupported { variant, feature } => {
                write!(f, "{} is not supported on the {}", feature, variant)
            }
            E1000Error::InvalidRingSize(count) => {
                write!(
                    f,
                    "invalid descriptor count {} (must be a non-zero multiple of {} up to {})",
                    count, DESCRIPTOR_SET, MAX_DESCRIPTORS
                )
            }
            E1000Error::NoMmioBar => write!(f, "no usable MMIO BAR"),
            E1000Error::UnknownDevice { vendor, device } => {
                write!(f, "no driver for PCI device {:04x}:{:04x}", vendor, device)
            }
            E1000Error::Memory(e) => write!(f, "memory error: {}", e),
            E1000Error::EepromTimeout { word } => write!(f, "EEPROM read of word {} timed out", word),
            E1000Error::FrameTooLarge { length, limit } => {
                write!(f, "frame of {} bytes exceeds limit of {}", length, limit)
            }
            E1000Error::EmptyFrame => write!(f, "empty frame"),
        }
    }
}

impl From<MemoryError> for E1000Error {
    fn from(e: MemoryError) -> Self {
        E1000Error::Memory(e)
    }
}

impl From<E1000Error> for NetError {
    fn from(e: E1000Error) -> Self {
        match e {
            E1000Error::EmptyFrame | E1000Error::FrameTooLarge { .. } => NetError::InvalidFrame,
            _ => NetError::DeviceError,
        }
    }
}

/// Ring and buffer sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Receive descriptors, in sets of eight
    pub receive_sets: usize,
    /// Transmit descriptors, in sets of eight
    pub transmit_sets: usize,
    /// Bytes per receive buffer; one of [`RECEIVE_BUFFER_SIZES`]
    pub receive_buffer_size: u32,
    /// Bytes per transmit bounce buffer
    pub transmit_buffer_size: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            receive_sets: 4,
            transmit_sets: 4,
            receive_buffer_size: 4096,
            transmit_buffer_size: 4096,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<(), E1000Error> {
        for sets in [self.receive_sets, self.transmit_sets] {
            if sets == 0 || sets > MAX_DESCRIPTORS / DESCRIPTOR_SET {
                return Err(E1000Error::InvalidRingSize(sets.saturating_mul(DESCRIPTOR_SET)));
            }
        }
        if !RECEIVE_BUFFER_SIZES.contains(&self.receive_buffer_size) {
            return Err(E1000Error::InvalidArgument {
                field: "receive buffer size",
                value: self.receive_buffer_size,
            });
        }
        if self.transmit_buffer_size == 0 {
            return Err(E1000Error::InvalidArgument {
                field: "transmit buffer size",
                value: 0,
            });
        }
        Ok(())
    }

    pub fn receive_descriptors(&self) -> usize {
        self.receive_sets * DESCRIPTOR_SET
    }

    pub fn transmit_descriptors(&self) -> usize {
        self.transmit_sets * DESCRIPTOR_SET
    }

    /// Receive descriptor block size, rounded up to whole pages
    pub fn receive_block_size(&self) -> usize {
        page_align_up(self.receive_descriptors() * DESCRIPTOR_BYTES)
    }

    pub fn transmit_block_size(&self) -> usize {
        page_align_up(self.transmit_descriptors() * DESCRIPTOR_BYTES)
    }

    /// Largest frame `transmit` accepts
    pub fn max_frame_length(&self) -> usize {
        self.transmit_buffer_size.min(MAX_FRAME_LENGTH)
    }
}

/// The kernel services a driver instance is wired into
pub struct Services<'a> {
    pub config: &'a dyn ConfigAccess,
    pub memory: &'a dyn MemoryService,
    pub interrupts: &'a dyn InterruptDispatcher,
    pub network: &'a dyn NetworkStack,
    pub filesystem: &'a dyn Filesystem,
    pub events: Arc<dyn EventBus>,
}

/// Control groups only touched from thread context
struct Controls {
    enable: InterruptEnable,
    disable: InterruptDisable,
    transmit: TransmitControl,
    receive: ReceiveControl,
}

/// Transmit ring plus one bounce buffer per slot
struct Transmitter {
    ring: TransmitRing,
    buffers: Vec<DmaBuffer>,
}

/// E1000 driver state
pub struct E1000 {
    variant: &'static Variant,
    /// PCI device information
    pci_device: Device,
    mac: MacAddress,
    max_frame_length: usize,
    status: ReadOnlyRegister,
    /// ICR as of the last read, for diagnostics
    last_interrupts: AtomicU32,
    // Only the top half locks these once the interrupt line is live
    device_control: Mutex<DeviceControl>,
    cause: Mutex<InterruptCause>,
    receive_ring: Mutex<ReceiveRing>,
    controls: Mutex<Controls>,
    transmitter: Mutex<Transmitter>,
    queue: Arc<InterruptQueue>,
    events: Arc<dyn EventBus>,
    stats: Statistics,
}

/// Find the variant that drives `device`, if any
pub fn probe(device: &Device) -> Option<&'static Variant> {
    if device.vendor_id != INTEL_VENDOR_ID {
        return None;
    }
    Variant::from_device_id(device.device_id)
}

/// Probe `device` and bring it up with the default configuration
pub fn initialize_detected(device: Device, services: &Services<'_>) -> Result<Arc<E1000>, E1000Error> {
    let variant = probe(&device).ok_or(E1000Error::UnknownDevice {
        vendor: device.vendor_id,
        device: device.device_id,
    })?;
    initialize(device, variant, DriverConfig::default(), services)
}

/// Bring up one device
///
/// The steps run in a fixed order; any failure aborts before the device is
/// registered with the network stack or the interrupt dispatcher.
pub fn initialize(
    device: Device,
    variant: &'static Variant,
    config: DriverConfig,
    services: &Services<'_>,
) -> Result<Arc<E1000>, E1000Error> {
    // 1. Sizing
    config.validate()?;
    let receive_count = config.receive_descriptors();
    let transmit_count = config.transmit_descriptors();
    log::info!(
        "E1000: {} at {} with {} RX / {} TX descriptors",
        variant.name,
        device,
        receive_count,
        transmit_count
    );

    // 2. DMA needs bus mastering
    device.enable_memory_space(services.config);
    device.enable_bus_master(services.config);

    // 3. Register window
    let bar = device.bar0().ok_or(E1000Error::NoMmioBar)?;
    let bar_address = PhysAddr::try_new(bar.address).map_err(|_| E1000Error::NoMmioBar)?;
    let mmio_base = services.memory.map_mmio(bar_address, MMIO_SIZE)?;
    log::info!("E1000: MMIO {:#x} mapped to {:#x}", bar.address, mmio_base.as_u64());

    // 4. Descriptor blocks and packet buffers
    let memory = services.memory;
    let receive_block = DmaBuffer::allocate(memory, config.receive_block_size())?;
    let transmit_block = DmaBuffer::allocate(memory, config.transmit_block_size())?;
    let receive_buffers = (0..receive_count)
        .map(|_| DmaBuffer::allocate(memory, config.receive_buffer_size as usize))
        .collect::<Result<Vec<_>, _>>()?;
    let transmit_buffers = (0..transmit_count)
        .map(|_| DmaBuffer::allocate(memory, config.transmit_buffer_size))
        .collect::<Result<Vec<_>, _>>()?;

    // 5. Views over the blocks
    // SAFETY: both blocks are page aligned and sized for their counts.
    let receive_descriptors = unsafe { Descriptors::over_block(receive_block.virt(), receive_count)? };
    let transmit_descriptors =
        unsafe { Descriptors::over_block(transmit_block.virt(), transmit_count)? };

    // 6. Register graph
    let map = &variant.registers;
    // SAFETY: every offset comes from the variant's map of the BAR0 window.
    let register = |offset: u32, access: Access| unsafe { Register::at(mmio_base, offset, access) };
    let mut device_control = DeviceControl::new(register(map.device_control, Access::ReadWrite), variant);
    let mut controls = Controls {
        enable: InterruptEnable::new(register(map.interrupt_mask_set, Access::ReadWrite), variant),
        disable: InterruptDisable::new(register(map.interrupt_mask_clear, Access::WriteOnly), variant),
        transmit: TransmitControl::new(register(map.transmit_control, Access::ReadWrite)),
        receive: ReceiveControl::new(register(map.receive_control, Access::ReadWrite), variant),
    };
    let cause = InterruptCause::new(register(map.interrupt_cause, Access::ReadWrite), variant);
    // SAFETY: STATUS and ICR offsets from the variant's map.
    let (status, acknowledge) = unsafe {
        (
            ReadOnlyRegister::at(mmio_base, map.status),
            ReadOnlyRegister::at(mmio_base, map.interrupt_cause),
        )
    };
    // SAFETY: ring blocks from the variant's map.
    let (receive_hardware, transmit_hardware) = unsafe {
        (
            HardwareDescriptorRing::new(mmio_base, map.receive_ring, receive_count),
            HardwareDescriptorRing::new(mmio_base, map.transmit_ring, transmit_count),
        )
    };
    let mut receive_ring = ReceiveRing::new(receive_descriptors, receive_hardware, receive_buffers)?;
    let mut transmit_ring = TransmitRing::new(transmit_descriptors, transmit_hardware);

    // 7. Rings before receiver and transmitter are enabled
    receive_ring.initialize(receive_block.phys());
    transmit_ring.initialize(transmit_block.phys());

    // 8. Device configuration
    configure_device(&mut device_control)?;
    configure_interrupts(&mut controls, variant)?;
    configure_transmit(&mut controls.transmit);
    configure_receive(&mut controls.receive, &config)?;

    // 9. Station address
    let mac = load_mac_address(mmio_base, variant)?;
    log::info!("E1000: MAC address {}", mac);

    let driver = Arc::new(E1000 {
        variant,
        pci_device: device,
        mac,
        max_frame_length: config.max_frame_length(),
        status,
        last_interrupts: AtomicU32::new(0),
        device_control: Mutex::new(device_control),
        cause: Mutex::new(cause),
        receive_ring: Mutex::new(receive_ring),
        controls: Mutex::new(controls),
        transmitter: Mutex::new(Transmitter {
            ring: transmit_ring,
            buffers: transmit_buffers,
        }),
        queue: Arc::new(InterruptQueue::new(receive_count)),
        events: services.events.clone(),
        stats: Statistics::new(),
    });

    // 10. Network stack
    services.network.register(driver.clone());

    // 11. Interrupt line
    let irq = driver.pci_device.interrupt_line;
    services.interrupts.assign(irq_vector(irq), driver.clone());
    services.interrupts.allow(irq);

    // 12. Drop anything latched during setup; the top half may already be
    // live, so this read goes around the cause lock
    driver.last_interrupts.store(acknowledge.read(), Ordering::Relaxed);

    // 13. MAC address node
    driver.publish_node(services.filesystem, mac);

    if driver.link_up() {
        log::info!("E1000: Link up at {} Mbps", driver.link_speed().mbps());
    } else {
        log::info!("E1000: Link down (waiting for link...)");
    }
    log::info!("E1000: Driver initialized successfully");
    Ok(driver)
}

fn configure_device(control: &mut DeviceControl) -> Result<(), E1000Error> {
    control.set_link_up(true);
    control.auto_speed_detection(true);
    control.vlan_mode(false)?;
    control.reset_internal_phy(false)?;
    control.manage();
    Ok(())
}

fn configure_interrupts(controls: &mut Controls, variant: &Variant) -> Result<(), E1000Error> {
    let disable = &mut controls.disable;
    disable.all();
    disable.clear_reserved();
    disable.manage();

    let enable = &mut controls.enable;
    enable.link_status_change(true);
    enable.receive_descriptor_minimum_threshold_hit(true);
    enable.receiver_fifo_overrun(true);
    enable.receive_timer(true);
    if variant.supports(Features::EXTENDED_CAUSES) {
        enable.mdio_access_complete(true)?;
        enable.general_purpose_interrupts(0b11)?;
        enable.small_receive_packet_detection(true)?;
        enable.transmit_descriptor_low_threshold_hit(true)?;
    }
    enable.manage();
    Ok(())
}

fn configure_transmit(control: &mut TransmitControl) {
    control.enable(true);
    control.pad_short_packets(true);
    control.manage();
}

fn configure_receive(control: &mut ReceiveControl, config: &DriverConfig) -> Result<(), E1000Error> {
    control.store_bad_packets(true);
    control.long_packet_reception(true);
    control.broadcast_accept_mode(true);
    control.unicast_promiscuous(true);
    control.multicast_promiscuous(true);
    control.buffer_size(config.receive_buffer_size)?;
    control.descriptor_minimum_threshold_size(0)?;
    control.strip_ethernet_crc(true);
    control.receiver(true);
    control.manage();
    Ok(())
}

/// Read the station address from wherever this variant keeps it
fn load_mac_address(mmio_base: VirtAddr, variant: &Variant) -> Result<MacAddress, E1000Error> {
    let map = &variant.registers;
    match variant.mac_source {
        MacSource::Eeprom(layout) => {
            // SAFETY: EERD offset inside the mapped window.
            let eerd = unsafe { Register::at(mmio_base, map.eeprom_read, Access::ReadWrite) };
            Eeprom::new(eerd, layout).read_mac_address()
        }
        MacSource::ReceiveAddress => {
            // SAFETY: RAL0/RAH0 offsets inside the mapped window.
            let (low, high) = unsafe {
                (
                    ReadOnlyRegister::at(mmio_base, map.receive_address_low),
                    ReadOnlyRegister::at(mmio_base, map.receive_address_high),
                )
            };
            Ok(MacAddress::from_receive_address(low.read(), high.read()))
        }
    }
}

impl E1000 {
    fn publish_node(&self, filesystem: &dyn Filesystem, mac: MacAddress) {
        let index = NODE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = format!("{}/{}_{}", NODE_DIRECTORY, self.variant.node_prefix, index);
        let result = filesystem
            .create_directory(&path)
            .and_then(|()| filesystem.add_virtual_node(&path, MacAddressNode::boxed(mac)));
        match result {
            Ok(()) => log::info!("E1000: MAC address published at {}/{}", path, MacAddressNode::NAME),
            Err(e) => log::warn!("E1000: could not publish {}: {}", path, e),
        }
    }

    /// Send one frame, blocking until the device is done with it
    ///
    /// The frame is copied into the slot's bounce buffer first, so `frame`
    /// can be any byte slice. Collisions do not fail the call; they show up
    /// in the returned status and in the statistics.
    pub fn transmit(&self, frame: &[u8]) -> Result<TransmitStatus, E1000Error> {
        if frame.is_empty() {
            return Err(E1000Error::EmptyFrame);
        }
        if frame.len() > self.max_frame_length {
            return Err(E1000Error::FrameTooLarge {
                length: frame.len(),
                limit: self.max_frame_length,
            });
        }

        let mut transmitter = self.transmitter.lock();
        let buffer = transmitter.buffers[transmitter.ring.position()];
        buffer.copy_from(frame);
        // SAFETY: the bounce buffer is pinned DMA memory holding the frame,
        // and the transmitter lock keeps it untouched until the send returns.
        let status = unsafe { transmitter.ring.send_packet(buffer.phys(), frame.len() as u16) };
        drop(transmitter);

        Statistics::count(&self.stats.transmitted);
        match status {
            TransmitStatus::Completed => {}
            TransmitStatus::LateCollision => {
                Statistics::count(&self.stats.late_collisions);
                log::debug!("E1000: late collision sending {} bytes", frame.len());
            }
            TransmitStatus::ExcessiveCollisions => {
                Statistics::count(&self.stats.excessive_collisions);
                log::debug!("E1000: excessive collisions sending {} bytes", frame.len());
            }
        }
        packet_trace!("E1000: sent {} bytes ({:?})", frame.len(), status);
        Ok(status)
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn link_up(&self) -> bool {
        self.status.read() & STATUS_LU != 0
    }

    pub fn link_speed(&self) -> LinkSpeed {
        LinkSpeed::from_bits((self.status.read() & STATUS_SPEED_MASK) >> STATUS_SPEED_SHIFT)
    }

    pub fn full_duplex(&self) -> bool {
        self.status.read() & STATUS_FD != 0
    }

    /// Mask every interrupt cause this variant defines
    pub fn disable_interrupts(&self) {
        let mut controls = self.controls.lock();
        controls.disable.all();
        controls.disable.manage();
    }

    /// Everything ICR held at the last read
    pub fn interrupts(&self) -> u32 {
        self.last_interrupts.load(Ordering::Relaxed)
    }

    /// An async bottom half over the same queue `parse_interrupt_data` drains
    pub fn receive_stream(&self) -> ReceiveStream {
        ReceiveStream::new(self.queue.clone())
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn variant(&self) -> &'static Variant {
        self.variant
    }

    pub fn interrupt_vector(&self) -> u8 {
        irq_vector(self.pci_device.interrupt_line)
    }
}

impl InterruptHandler for E1000 {
    /// Top half: acknowledge the device, drain finished receive descriptors
    fn trigger(&self, frame: &InterruptFrame) {
        let mut cause = self.cause.lock();
        cause.read_and_clear();

        if cause.has_link_status_changed() {
            let mut control = self.device_control.lock();
            control.set_link_up(true);
            control.manage();
            if self.link_up() {
                log::info!("E1000: Link up at {} Mbps", self.link_speed().mbps());
            } else {
                log::info!("E1000: Link down");
            }
        }

        if cause.is_receiver_overrun() {
            Statistics::count(&self.stats.overruns);
            log::warn!("E1000: receive FIFO overrun, frames lost");
        }

        if cause.is_receive_descriptor_minimum_threshold_reached() {
            self.receive_ring.lock().receive_poll(&self.queue, &self.stats);
        }

        if cause.has_receive_timer_interrupt() {
            self.receive_ring.lock().receive_poll(&self.queue, &self.stats);
        }

        if cause.has_unhandled_interrupts() {
            Statistics::count(&self.stats.unhandled_interrupts);
            log::warn!(
                "E1000: unhandled interrupt causes {:#010x} on vector {}",
                cause.unhandled(),
                frame.vector
            );
        }

        let last = cause.read_and_clear();
        self.last_interrupts.store(last, Ordering::Relaxed);
    }

    fn has_interrupt_data(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Bottom half: copy one queued frame out and publish it
    fn parse_interrupt_data(&self) {
        let Some(packet) = self.queue.pop() else {
            return;
        };
        let bytes = packet.to_vec();
        Statistics::count(&self.stats.delivered);
        packet_trace!("E1000: delivering {} bytes", bytes.len());
        self.events.publish(Event::Receive(ReceiveEvent::new(bytes)));
    }
}

impl NetworkDevice for E1000 {
    fn send_packet(&self, frame: &[u8]) -> Result<(), NetError> {
        self.transmit(frame).map(|_| ()).map_err(NetError::from)
    }

    fn mac_address(&self) -> MacAddress {
        self.mac
    }
}
