mod shared_nic;

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use kernel::drivers::e1000::regs::*;
use kernel::drivers::e1000::variant::INTEL_82540EM;
use kernel::drivers::e1000::{DriverConfig, LinkSpeed, MacAddress};
use kernel::interrupts::{irq_vector, InterruptFrame, InterruptHandler};
use log::{LevelFilter, Log, Metadata, Record};
use shared_nic::{Harness, SimulatedNic, IRQ_LINE, MAC};

thread_local! {
    /// Causes to latch the next time the top half reports the link state
    static RAISE_ON_LINK_REPORT: RefCell<Option<(Arc<SimulatedNic>, u32)>> = RefCell::new(None);
}

/// Logger that lets a test latch new causes partway through `trigger`
struct LinkReportHook;

impl Log for LinkReportHook {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !record.args().to_string().starts_with("E1000: Link") {
            return;
        }
        RAISE_ON_LINK_REPORT.with(|slot| {
            if let Some((nic, causes)) = slot.borrow_mut().take() {
                nic.raise(causes);
            }
        });
    }

    fn flush(&self) {}
}

static LOGGER: LinkReportHook = LinkReportHook;

fn install_logger() {
    // every test in this binary installs the same logger
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Info);
}

/// Test that causes latched while the top half runs are cleared, not handled
#[test]
fn test_late_causes_cleared_by_final_read() {
    install_logger();

    let harness = Harness::new(&INTEL_82540EM);
    let driver = harness.bring_up();
    harness.nic.inject(&[0xAB; 64], true, 0);

    let late = ICR_RXT0 | ICR_RXO | (1 << 20);
    RAISE_ON_LINK_REPORT.with(|slot| *slot.borrow_mut() = Some((harness.nic.clone(), late)));
    harness.interrupt(&driver, ICR_LSC);

    // the hook fired between the two reads of ICR
    assert!(RAISE_ON_LINK_REPORT.with(|slot| slot.borrow().is_none()));
    // the closing read saw the late causes
    assert_eq!(driver.interrupts() & late, late);
    // and only the first snapshot was dispatched
    assert!(!driver.has_interrupt_data());
    let stats = driver.statistics();
    assert_eq!(stats.received, 0);
    assert_eq!(stats.overruns, 0);
    assert_eq!(stats.unhandled_interrupts, 0);

    // the next interrupt starts from a fresh snapshot
    harness.interrupt(&driver, ICR_RXT0);
    assert!(driver.has_interrupt_data());
    assert_eq!(driver.statistics().received, 1);
}

/// Test that an interrupt pending at unmask time runs inside `initialize`
#[test]
fn test_interrupt_during_initialize() {
    install_logger();

    let (done, finished) = mpsc::channel();
    thread::spawn(move || {
        let harness = Harness::new(&INTEL_82540EM);
        let nic = harness.nic.clone();
        *harness.dispatcher.pending.lock().unwrap() = Some(Box::new(move |handler: &dyn InterruptHandler| {
            nic.write(REG_STATUS, STATUS_LU | STATUS_FD | (0b10 << STATUS_SPEED_SHIFT));
            nic.raise(ICR_LSC | ICR_RXO);
            handler.trigger(&InterruptFrame {
                vector: irq_vector(IRQ_LINE),
            });
        }));

        let driver = harness
            .try_bring_up(DriverConfig::default())
            .expect("driver failed to initialize");

        assert_eq!(driver.statistics().overruns, 1);
        assert!(driver.link_up());
        assert_eq!(driver.link_speed(), LinkSpeed::Mbps1000);
        // setup's own acknowledge still ran after the handler
        assert_eq!(driver.interrupts() & (ICR_LSC | ICR_RXO), ICR_LSC | ICR_RXO);
        assert!(harness.filesystem.read_node("/dev/network/intel82540EM_").is_some());
        let _ = done.send(());
    });

    finished
        .recv_timeout(Duration::from_secs(5))
        .expect("initialize did not finish with an interrupt pending");
}

/// Test the top half alongside thread code reading link state
#[test]
fn test_top_half_alongside_link_queries() {
    install_logger();

    let harness = Harness::new(&INTEL_82540EM);
    let driver = harness.bring_up();
    harness
        .nic
        .write(REG_STATUS, STATUS_LU | STATUS_FD | (0b01 << STATUS_SPEED_SHIFT));

    let stop = AtomicBool::new(false);
    thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut queries = 0u64;
            loop {
                assert!(driver.link_up());
                assert!(driver.full_duplex());
                assert_eq!(driver.link_speed(), LinkSpeed::Mbps100);
                assert_eq!(driver.mac(), MacAddress::new(MAC));
                let _ = driver.interrupts();
                queries += 1;
                if stop.load(Ordering::SeqCst) {
                    return queries;
                }
            }
        });

        for _ in 0..500 {
            harness.interrupt(&driver, ICR_LSC | ICR_RXO);
        }
        stop.store(true, Ordering::SeqCst);
        assert!(reader.join().expect("link queries panicked") > 0);
    });

    assert_eq!(driver.statistics().overruns, 500);
}
