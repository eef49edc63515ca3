//! `log` facade wiring.
//!
//! A single process-wide logger writes formatted records to the serial
//! port. Call sites across the core use `log::{trace,debug,info,warn,error}`
//! rather than ad hoc `println!`, matching the `log` crate the teacher
//! declares as a workspace dependency.

use core::fmt::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

use crate::arch::x86::serial::SerialPort;

struct KernelLogger {
    port: Mutex<SerialPort>,
}

static LOGGER: KernelLogger = KernelLogger {
    port: Mutex::new(SerialPort::com1()),
};

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= level_filter().to_level().unwrap_or(Level::Error)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut port = self.port.lock();
        let _ = writeln!(port, "[{:>5} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

fn level_filter() -> LevelFilter {
    match crate::config::DEFAULT_LOG_LEVEL {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Install the kernel logger as the `log` crate's global logger.
///
/// Must be called exactly once, early in boot, before any interrupt
/// handler or subsystem init runs `log::info!`/etc.
pub fn init() {
    // SAFETY-free: `set_logger` only fails if called twice; harmless to
    // ignore here since a double-init would be a kernel bug caught by the
    // returned error being unused (intentional -- there is nothing
    // meaningful to do with it this early in boot).
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_filter());
}
