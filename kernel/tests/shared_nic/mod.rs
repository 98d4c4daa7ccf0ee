//! Shared simulated-NIC infrastructure for the driver integration tests
//!
//! Real hardware is replaced by plain memory: the register window is a
//! leaked array of words, DMA allocations are identity mapped heap pages, and
//! a background "device" thread plays the parts of the chip the driver waits
//! on (EEPROM reads and transmit completion). Receive traffic is injected
//! from the test thread with [`SimulatedNic::inject`].
//!
//! Plain memory does not clear on read, so ICR stays set until a test calls
//! [`SimulatedNic::acknowledge`] (or uses [`Harness::interrupt`], which does).

#![allow(dead_code)]

use std::alloc::{alloc_zeroed, Layout};
use std::ptr::{addr_of, addr_of_mut, read_volatile, write_volatile};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use kernel::drivers::e1000::descriptor::{RawReceiveDescriptor, RawTransmitDescriptor};
use kernel::drivers::e1000::regs::*;
use kernel::drivers::e1000::variant::{MacSource, Variant};
use kernel::drivers::e1000::{self, DriverConfig, Services, E1000, MMIO_SIZE};
use kernel::drivers::pci::{Bar, ConfigAccess, Device, DeviceClass, INTEL_VENDOR_ID};
use kernel::event::{Event, EventBus};
use kernel::fs::{Filesystem, VfsError, VirtualNode};
use kernel::interrupts::{irq_vector, InterruptDispatcher, InterruptFrame, InterruptHandler};
use kernel::memory::{page_align_up, MemoryError, MemoryService, PAGE_SIZE};
use kernel::net::{NetworkDevice, NetworkStack};
use x86_64::{PhysAddr, VirtAddr};

/// Station address every simulated NIC reports
pub const MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];
pub const BAR0_ADDRESS: u64 = 0xFEBC_0000;
pub const IRQ_LINE: u8 = 11;

/// Ordered record of the calls the driver made into kernel services
#[derive(Default)]
pub struct Journal(Mutex<Vec<String>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of the first entry starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|entry| entry.starts_with(prefix))
    }
}

// =============================================================================
// Simulated device
// =============================================================================

pub struct SimulatedNic {
    registers: &'static [AtomicU32],
    eeprom: [u16; 64],
    eeprom_layout: Option<kernel::drivers::e1000::variant::EepromLayout>,
    /// Status written back to completed transmit descriptors
    transmit_status: AtomicU8,
    sent: Mutex<Vec<Vec<u8>>>,
    stop: AtomicBool,
}

impl SimulatedNic {
    pub fn new(variant: &'static Variant) -> Arc<Self> {
        let words = MMIO_SIZE / 4;
        let registers: &'static [AtomicU32] =
            Box::leak((0..words).map(|_| AtomicU32::new(0)).collect::<Vec<_>>().into_boxed_slice());

        let mut eeprom = [0xFFFFu16; 64];
        for (i, pair) in MAC.chunks_exact(2).enumerate() {
            eeprom[i] = u16::from_le_bytes([pair[0], pair[1]]);
        }

        let eeprom_layout = match variant.mac_source {
            MacSource::Eeprom(layout) => Some(layout),
            MacSource::ReceiveAddress => None,
        };

        let nic = Arc::new(SimulatedNic {
            registers,
            eeprom,
            eeprom_layout,
            transmit_status: AtomicU8::new(TXD_STAT_DD),
            sent: Mutex::new(Vec::new()),
            stop: AtomicBool::new(false),
        });

        if eeprom_layout.is_none() {
            let low = u32::from_le_bytes([MAC[0], MAC[1], MAC[2], MAC[3]]);
            let high = u32::from(u16::from_le_bytes([MAC[4], MAC[5]])) | RAH_AV;
            nic.write(variant.registers.receive_address_low, low);
            nic.write(variant.registers.receive_address_high, high);
        }
        nic
    }

    /// Run the device side until [`SimulatedNic::shutdown`]
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let nic = self.clone();
        thread::spawn(move || {
            while !nic.stop.load(Ordering::Acquire) {
                nic.service_eeprom();
                nic.service_transmit();
                thread::yield_now();
            }
        })
    }

    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn base(&self) -> VirtAddr {
        VirtAddr::from_ptr(self.registers.as_ptr())
    }

    pub fn read(&self, offset: u32) -> u32 {
        self.registers[offset as usize / 4].load(Ordering::SeqCst)
    }

    pub fn write(&self, offset: u32, value: u32) {
        self.registers[offset as usize / 4].store(value, Ordering::SeqCst);
    }

    /// Latch interrupt causes in ICR
    pub fn raise(&self, causes: u32) {
        self.registers[REG_ICR as usize / 4].fetch_or(causes, Ordering::SeqCst);
    }

    /// What a read of ICR would have done in hardware
    pub fn acknowledge(&self) {
        self.write(REG_ICR, 0);
    }

    pub fn set_transmit_status(&self, status: u8) {
        self.transmit_status.store(status, Ordering::SeqCst);
    }

    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    fn ring_base(&self, block: u32) -> u64 {
        u64::from(self.read(block + RING_BAL)) | (u64::from(self.read(block + RING_BAH)) << 32)
    }

    fn ring_count(&self, block: u32) -> u32 {
        self.read(block + RING_LEN) / 16
    }

    fn service_eeprom(&self) {
        let Some(layout) = self.eeprom_layout else {
            return;
        };
        let value = self.read(REG_EERD);
        if value & layout.start == 0 || value & layout.done != 0 {
            return;
        }
        let word = (value >> layout.address_shift) as usize & 0x3F;
        let data = u32::from(self.eeprom[word]) << layout.data_shift;
        self.write(REG_EERD, data | layout.done);
    }

    fn service_transmit(&self) {
        let count = self.ring_count(REG_TX_RING);
        if count == 0 {
            return;
        }
        let base = self.ring_base(REG_TX_RING);
        let tail = self.read(REG_TX_RING + RING_TAIL);
        let mut head = self.read(REG_TX_RING + RING_HEAD);
        while head != tail {
            let slot = (base + u64::from(head) * 16) as *mut RawTransmitDescriptor;
            unsafe {
                let address = read_volatile(addr_of!((*slot).addr));
                let length = read_volatile(addr_of!((*slot).length));
                let frame = std::slice::from_raw_parts(address as *const u8, usize::from(length));
                self.sent.lock().unwrap().push(frame.to_vec());
                write_volatile(addr_of_mut!((*slot).status), self.transmit_status.load(Ordering::SeqCst));
            }
            head = (head + 1) % count;
            self.write(REG_TX_RING + RING_HEAD, head);
        }
    }

    /// Place `frame` in the slot at the receive head, as the device would
    ///
    /// Does not raise an interrupt; combine with [`SimulatedNic::raise`].
    pub fn inject(&self, frame: &[u8], end_of_packet: bool, errors: u8) {
        let count = self.ring_count(REG_RX_RING);
        let base = self.ring_base(REG_RX_RING);
        let head = self.read(REG_RX_RING + RING_HEAD);
        let slot = (base + u64::from(head) * 16) as *mut RawReceiveDescriptor;
        unsafe {
            let buffer = read_volatile(addr_of!((*slot).addr)) as *mut u8;
            std::ptr::copy_nonoverlapping(frame.as_ptr(), buffer, frame.len());
            write_volatile(addr_of_mut!((*slot).length), frame.len() as u16);
            write_volatile(addr_of_mut!((*slot).errors), errors);
            let status = RXD_STAT_DD | if end_of_packet { RXD_STAT_EOP } else { 0 };
            write_volatile(addr_of_mut!((*slot).status), status);
        }
        self.write(REG_RX_RING + RING_HEAD, (head + 1) % count);
    }
}

// =============================================================================
// Fake kernel services
// =============================================================================

pub struct FakeConfig {
    command: Mutex<u16>,
    journal: Arc<Journal>,
}

impl ConfigAccess for FakeConfig {
    fn read_config_word(&self, _bus: u8, _device: u8, _function: u8, _offset: u8) -> u16 {
        *self.command.lock().unwrap()
    }

    fn write_config_word(&self, _bus: u8, _device: u8, _function: u8, _offset: u8, value: u16) {
        let mut command = self.command.lock().unwrap();
        if value & !*command & (1 << 2) != 0 {
            self.journal.record("bus_master");
        }
        *command = value;
    }
}

pub struct FakeMemory {
    nic: Arc<SimulatedNic>,
    journal: Arc<Journal>,
    /// Fail every `map_io` once this many have succeeded
    pub io_limit: Option<usize>,
    io_count: Mutex<usize>,
}

impl MemoryService for FakeMemory {
    fn map_mmio(&self, phys: PhysAddr, size: usize) -> Result<VirtAddr, MemoryError> {
        self.journal.record(format!("map_mmio {:#x} {:#x}", phys.as_u64(), size));
        if phys.as_u64() != BAR0_ADDRESS || size > MMIO_SIZE {
            return Err(MemoryError::MappingFailed);
        }
        Ok(self.nic.base())
    }

    fn map_io(&self, size: usize) -> Result<VirtAddr, MemoryError> {
        let mut count = self.io_count.lock().unwrap();
        if self.io_limit.is_some_and(|limit| *count >= limit) {
            return Err(MemoryError::OutOfMemory);
        }
        *count += 1;
        self.journal.record(format!("map_io {:#x}", size));
        let layout = Layout::from_size_align(page_align_up(size.max(1)), PAGE_SIZE)
            .map_err(|_| MemoryError::OutOfMemory)?;
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(MemoryError::OutOfMemory);
        }
        Ok(VirtAddr::from_ptr(ptr))
    }

    fn physical_address(&self, virt: VirtAddr) -> Result<PhysAddr, MemoryError> {
        Ok(PhysAddr::new(virt.as_u64()))
    }
}

/// Runs on the unmasking thread with the handler for the unmasked line
pub type PendingInterrupt = Box<dyn FnOnce(&dyn InterruptHandler) + Send>;

#[derive(Default)]
pub struct FakeDispatcher {
    pub handlers: Mutex<Vec<(u8, Arc<dyn InterruptHandler>)>>,
    pub allowed: Mutex<Vec<u8>>,
    /// Delivered from inside `allow`, like a cause latched before the unmask
    pub pending: Mutex<Option<PendingInterrupt>>,
    journal: Arc<Journal>,
}

impl InterruptDispatcher for FakeDispatcher {
    fn assign(&self, vector: u8, handler: Arc<dyn InterruptHandler>) {
        self.journal.record(format!("assign {}", vector));
        self.handlers.lock().unwrap().push((vector, handler));
    }

    fn allow(&self, irq: u8) {
        self.journal.record(format!("allow {}", irq));
        self.allowed.lock().unwrap().push(irq);

        let Some(deliver) = self.pending.lock().unwrap().take() else {
            return;
        };
        let handler = self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .find(|(vector, _)| *vector == irq_vector(irq))
            .map(|(_, handler)| handler.clone());
        if let Some(handler) = handler {
            deliver(handler.as_ref());
        }
    }
}

#[derive(Default)]
pub struct FakeStack {
    pub devices: Mutex<Vec<Arc<dyn NetworkDevice>>>,
    journal: Arc<Journal>,
}

impl NetworkStack for FakeStack {
    fn register(&self, device: Arc<dyn NetworkDevice>) {
        self.journal.record("register");
        self.devices.lock().unwrap().push(device);
    }
}

#[derive(Default)]
pub struct FakeFilesystem {
    pub directories: Mutex<Vec<String>>,
    pub nodes: Mutex<Vec<(String, Box<dyn VirtualNode>)>>,
    pub fail: AtomicBool,
    journal: Arc<Journal>,
}

impl FakeFilesystem {
    /// Full contents of the first node whose directory starts with `prefix`
    pub fn read_node(&self, prefix: &str) -> Option<(String, String)> {
        let nodes = self.nodes.lock().unwrap();
        let (path, node) = nodes.iter().find(|(path, _)| path.starts_with(prefix))?;
        let mut buf = vec![0u8; node.len()];
        let n = node.read(0, &mut buf);
        Some((format!("{}/{}", path, node.name()), String::from_utf8_lossy(&buf[..n]).into_owned()))
    }
}

impl Filesystem for FakeFilesystem {
    fn create_directory(&self, path: &str) -> Result<(), VfsError> {
        self.journal.record(format!("create_directory {}", path));
        if self.fail.load(Ordering::SeqCst) {
            return Err(VfsError::ReadOnly);
        }
        self.directories.lock().unwrap().push(path.to_string());
        Ok(())
    }

    fn add_virtual_node(&self, path: &str, node: Box<dyn VirtualNode>) -> Result<(), VfsError> {
        self.journal.record(format!("add_virtual_node {}", path));
        self.nodes.lock().unwrap().push((path.to_string(), node));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBus {
    pub events: Mutex<Vec<Event>>,
}

impl EventBus for FakeBus {
    fn publish(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A simulated NIC plus every kernel service the driver needs
pub struct Harness {
    pub variant: &'static Variant,
    pub nic: Arc<SimulatedNic>,
    pub journal: Arc<Journal>,
    pub config: FakeConfig,
    pub memory: FakeMemory,
    pub dispatcher: FakeDispatcher,
    pub stack: FakeStack,
    pub filesystem: FakeFilesystem,
    pub bus: Arc<FakeBus>,
    device_thread: Option<JoinHandle<()>>,
}

impl Harness {
    pub fn new(variant: &'static Variant) -> Self {
        let journal = Arc::new(Journal::default());
        let nic = SimulatedNic::new(variant);
        let device_thread = Some(nic.start());
        Harness {
            variant,
            config: FakeConfig {
                command: Mutex::new(0),
                journal: journal.clone(),
            },
            memory: FakeMemory {
                nic: nic.clone(),
                journal: journal.clone(),
                io_limit: None,
                io_count: Mutex::new(0),
            },
            dispatcher: FakeDispatcher {
                journal: journal.clone(),
                ..FakeDispatcher::default()
            },
            stack: FakeStack {
                journal: journal.clone(),
                ..FakeStack::default()
            },
            filesystem: FakeFilesystem {
                journal: journal.clone(),
                ..FakeFilesystem::default()
            },
            bus: Arc::new(FakeBus::default()),
            nic,
            journal,
            device_thread,
        }
    }

    pub fn services(&self) -> Services<'_> {
        Services {
            config: &self.config,
            memory: &self.memory,
            interrupts: &self.dispatcher,
            network: &self.stack,
            filesystem: &self.filesystem,
            events: self.bus.clone(),
        }
    }

    /// The PCI view of the simulated NIC
    pub fn device(&self) -> Device {
        let mut bars = [Bar::empty(); 6];
        bars[0] = Bar {
            address: BAR0_ADDRESS,
            size: MMIO_SIZE as u64,
            is_io: false,
        };
        Device {
            bus: 0,
            device: 3,
            function: 0,
            vendor_id: INTEL_VENDOR_ID,
            device_id: self.variant.device_ids[0],
            class: DeviceClass::Network,
            subclass: 0,
            interrupt_line: IRQ_LINE,
            bars,
        }
    }

    pub fn try_bring_up(&self, config: DriverConfig) -> Result<Arc<E1000>, e1000::E1000Error> {
        e1000::initialize(self.device(), self.variant, config, &self.services())
    }

    pub fn bring_up(&self) -> Arc<E1000> {
        self.try_bring_up(DriverConfig::default())
            .expect("driver failed to initialize")
    }

    /// Deliver an interrupt with `causes` latched, then clear ICR
    pub fn interrupt(&self, driver: &E1000, causes: u32) {
        self.nic.raise(causes);
        driver.trigger(&InterruptFrame {
            vector: driver.interrupt_vector(),
        });
        self.nic.acknowledge();
    }

    /// Frames published on the event bus so far, as (length, bytes)
    pub fn received(&self) -> Vec<(u16, Vec<u8>)> {
        self.bus
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                Event::Receive(receive) => (receive.length, receive.packet.clone()),
            })
            .collect()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.nic.shutdown();
        if let Some(thread) = self.device_thread.take() {
            let _ = thread.join();
        }
    }
}
