// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock queue transports for testing

use queue_log_sink::{QueueMessage, QueueTransport, TransportError};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Put { queue: String, text: String },
}

/// Records every call in order. Queues are created on first request.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    queues: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created_queues(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create(queue) => Some(queue),
                Call::Put { .. } => None,
            })
            .collect()
    }

    pub fn published(&self, queue: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Put { queue: q, text } if q == queue => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl QueueTransport for RecordingTransport {
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<bool, TransportError> {
        self.calls.lock().unwrap().push(Call::Create(queue.to_string()));
        Ok(self.queues.lock().unwrap().insert(queue.to_string()))
    }

    async fn put_message(&self, queue: &str, message: &QueueMessage) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::Put {
            queue: queue.to_string(),
            text: message.text().to_string(),
        });
        Ok(())
    }
}

/// Refuses queue creation with 403 but accepts publishing, like a SAS that
/// may only add messages.
#[derive(Default)]
#[allow(dead_code)]
pub struct AddOnlyTransport {
    pub inner: RecordingTransport,
}

#[async_trait::async_trait]
impl QueueTransport for AddOnlyTransport {
    async fn create_queue_if_not_exists(&self, _queue: &str) -> Result<bool, TransportError> {
        Err(TransportError::Status {
            status: 403,
            body: "AuthorizationPermissionMismatch".to_string(),
        })
    }

    async fn put_message(&self, queue: &str, message: &QueueMessage) -> Result<(), TransportError> {
        self.inner.put_message(queue, message).await
    }
}

/// Publishing never completes.
#[allow(dead_code)]
pub struct HangingTransport;

#[async_trait::async_trait]
impl QueueTransport for HangingTransport {
    async fn create_queue_if_not_exists(&self, _queue: &str) -> Result<bool, TransportError> {
        Ok(true)
    }

    async fn put_message(&self, _queue: &str, _message: &QueueMessage) -> Result<(), TransportError> {
        std::future::pending().await
    }
}
