// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide diagnostic channel for the sink itself.
//!
//! The sink cannot report its own failures through the logging pipeline it is
//! part of, so configuration and queue errors are written here instead. The
//! channel is disabled until [`enable`] is called, and can only be enabled once
//! per process.

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

use chrono::{SecondsFormat, Utc};
use tracing::debug;

static OUTPUT: OnceLock<Mutex<Box<dyn Write + Send>>> = OnceLock::new();

/// Directs diagnostic lines to `writer`. Returns `false` if the channel was
/// already enabled, in which case `writer` is dropped.
pub fn enable<W: Write + Send + 'static>(writer: W) -> bool {
    OUTPUT.set(Mutex::new(Box::new(writer))).is_ok()
}

pub fn is_enabled() -> bool {
    OUTPUT.get().is_some()
}

pub fn write_line(args: fmt::Arguments<'_>) {
    debug!("{args}");

    let Some(output) = OUTPUT.get() else {
        return;
    };
    // Keep writing after a panic in another writer.
    let mut output = output.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let _ = writeln!(output, "{timestamp} {args}");
    let _ = output.flush();
}

/// Writes a formatted line to the diagnostic channel.
#[macro_export]
macro_rules! self_log {
    ($($arg:tt)*) => {
        $crate::self_log::write_line(format_args!($($arg)*))
    };
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Write;
    use std::sync::{Arc, Mutex, OnceLock};

    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Enables the channel for the whole test binary and returns its buffer.
    pub(crate) fn capture() -> SharedBuffer {
        static BUFFER: OnceLock<SharedBuffer> = OnceLock::new();
        BUFFER
            .get_or_init(|| {
                let buffer = SharedBuffer::default();
                assert!(super::enable(buffer.clone()));
                buffer
            })
            .clone()
    }
}
