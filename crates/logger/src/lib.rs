//! Secure-world logger
//!
//! A `log` backend for firmware running without an operating system. The firmware hands a console
//! sink at initialization time, typically the `_print` function of its debug UART.
#![cfg_attr(not(test), no_std)]

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use log::{LevelFilter, Metadata, Record};
use spin::Mutex;

/// A console sink, receives already formatted log lines.
pub type Sink = fn(fmt::Arguments);

static LOGGER: LockedLogger = LockedLogger(Mutex::new(Logger { sink: None }));
static IS_INITIALIZED: AtomicBool = AtomicBool::new(false);

struct LockedLogger(Mutex<Logger>);

struct Logger {
    sink: Option<Sink>,
}

impl log::Log for LockedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.0.lock().enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.0.lock().log(record)
    }

    fn flush(&self) {}
}

impl Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        self.sink.is_some()
    }

    fn log(&self, record: &Record) {
        if let Some(sink) = self.sink {
            sink(format_args!(
                "[{} | {}] {}\n",
                record.level(),
                record.target(),
                record.args()
            ))
        }
    }
}

/// Install the logger, writing every record up to `level` to `sink`.
///
/// Only the first call has an effect, later calls keep the first sink.
pub fn init(level: LevelFilter, sink: Sink) {
    match IS_INITIALIZED.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst) {
        Ok(_) => {
            LOGGER.0.lock().sink = Some(sink);
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(level);
            }
        }
        Err(_) => {
            log::warn!("Logger is already initialized, skipping init");
        }
    };
}

pub fn is_initialized() -> bool {
    IS_INITIALIZED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    static CAPTURED: Mutex<String> = Mutex::new(String::new());

    fn capture(args: fmt::Arguments) {
        CAPTURED.lock().write_fmt(args).unwrap();
    }

    fn discard(_args: fmt::Arguments) {}

    #[test]
    fn init_once_and_format() {
        assert!(!is_initialized());
        init(LevelFilter::Debug, capture);
        assert!(is_initialized());

        log::info!(target: "psci", "core {} is on", 2);
        log::trace!(target: "psci", "filtered out");
        assert_eq!(CAPTURED.lock().as_str(), "[INFO | psci] core 2 is on\n");

        // The second sink is ignored, the warning goes to the first one.
        init(LevelFilter::Trace, discard);
        assert!(CAPTURED
            .lock()
            .ends_with("Logger is already initialized, skipping init\n"));
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
