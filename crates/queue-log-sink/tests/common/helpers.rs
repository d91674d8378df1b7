// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helpers shared by the integration tests

use queue_log_sink::{self_log, QueueConnection, QueueTransport, StorageAccount};
use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};

/// Connection to the development storage account through `transport`.
pub fn connection(transport: Arc<dyn QueueTransport>) -> QueueConnection {
    QueueConnection::with_transport(StorageAccount::development_storage(), transport)
}

#[derive(Clone, Default)]
pub struct SelfLogBuffer(Arc<Mutex<Vec<u8>>>);

impl SelfLogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SelfLogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Enables the self log for this test binary and returns its contents buffer.
#[allow(dead_code)]
pub fn capture_self_log() -> SelfLogBuffer {
    static BUFFER: OnceLock<SelfLogBuffer> = OnceLock::new();
    BUFFER
        .get_or_init(|| {
            let buffer = SelfLogBuffer::default();
            assert!(self_log::enable(buffer.clone()));
            buffer
        })
        .clone()
}
