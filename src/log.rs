// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal textual tracing, gated to a no-op unless a [`Logger`] is
//! installed.
//!
//! Mirrors `kernel::debug!`, which in Tock routes to whatever UART console
//! the board wired up. There is no global/static sink here: `#![forbid(
//! unsafe_code)]` rules out the raw-pointer tricks a `static dyn Logger`
//! would need, so instead each owning component (the netif aggregate, or a
//! standalone test harness) holds a [`LogSink`] field and passes it to the
//! `debug!`/`warn!` macros explicitly, the same way it already threads a
//! `&dyn Radio` or `&dyn Config` through its constructor.

use crate::cells::OptionalCell;
use core::fmt::Arguments;

/// A sink for log lines. Levels mirror the granularity the stack actually
/// needs: `Debug` for per-packet tracing, `Warn` for conditions an operator
/// should notice (CSMA exhaustion, reassembly timeout, key rollover).
pub trait Logger {
    fn log(&self, level: Level, args: Arguments<'_>);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    Debug,
    Warn,
}

/// Holds an optional reference to an installed [`Logger`]; a no-op sink
/// until one is set. Embed one of these in any component that wants to
/// trace its own state transitions.
#[derive(Default)]
pub struct LogSink {
    logger: OptionalCell<&'static dyn Logger>,
}

impl LogSink {
    pub const fn new() -> Self {
        LogSink {
            logger: OptionalCell::empty(),
        }
    }

    pub fn install(&self, logger: &'static dyn Logger) {
        self.logger.set(logger);
    }

    #[doc(hidden)]
    pub fn log(&self, level: Level, args: Arguments<'_>) {
        self.logger.map(|l| l.log(level, args));
    }
}

#[macro_export]
macro_rules! debug {
    ($sink:expr, $($arg:tt)*) => {
        $sink.log($crate::log::Level::Debug, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($sink:expr, $($arg:tt)*) => {
        $sink.log($crate::log::Level::Warn, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    struct CountingLogger {
        calls: AtomicU32,
    }

    impl Logger for CountingLogger {
        fn log(&self, _level: Level, _args: Arguments<'_>) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn noop_sink_does_not_panic() {
        let sink = LogSink::new();
        crate::debug!(sink, "unreachable, level={}", 1);
    }

    #[test]
    fn installed_logger_receives_calls() {
        static LOGGER: CountingLogger = CountingLogger {
            calls: AtomicU32::new(0),
        };
        let sink = LogSink::new();
        sink.install(&LOGGER);
        crate::debug!(sink, "hello {}", 1);
        crate::warn!(sink, "world");
        assert_eq!(LOGGER.calls.load(Ordering::Relaxed), 2);
    }
}
