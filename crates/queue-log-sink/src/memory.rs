// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-process queue service, for tests and local runs without a storage account.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::transport::{QueueMessage, QueueTransport};

#[derive(Debug, Default)]
pub struct InMemoryQueueTransport {
    queues: Mutex<BTreeMap<String, Vec<QueueMessage>>>,
}

impl InMemoryQueueTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Messages published to `queue`, oldest first. Empty if the queue does not exist.
    pub fn messages(&self, queue: &str) -> Vec<QueueMessage> {
        self.lock().get(queue).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<QueueMessage>>> {
        self.queues
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueueTransport {
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<bool, TransportError> {
        let mut queues = self.lock();
        if queues.contains_key(queue) {
            return Ok(false);
        }
        queues.insert(queue.to_string(), Vec::new());
        Ok(true)
    }

    async fn put_message(&self, queue: &str, message: &QueueMessage) -> Result<(), TransportError> {
        match self.lock().get_mut(queue) {
            Some(messages) => {
                messages.push(message.clone());
                Ok(())
            }
            None => Err(TransportError::Status {
                status: 404,
                body: format!("QueueNotFound: {queue}"),
            }),
        }
    }
}
