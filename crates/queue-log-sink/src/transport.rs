// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::TransportError;

/// Text payload of a single queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    text: String,
}

impl QueueMessage {
    pub fn new(text: impl Into<String>) -> Self {
        QueueMessage { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// The queue service as seen by the sink. Implementations must be safe for
/// concurrent use from several emitting threads.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Creates `queue` if it does not exist yet. Returns `true` when the queue
    /// was created by this call.
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<bool, TransportError>;

    async fn put_message(&self, queue: &str, message: &QueueMessage) -> Result<(), TransportError>;
}

/// Entry point for obtaining queue references from a connection.
#[derive(Clone)]
pub struct QueueClient {
    transport: Arc<dyn QueueTransport>,
}

impl QueueClient {
    pub(crate) fn new(transport: Arc<dyn QueueTransport>) -> Self {
        QueueClient { transport }
    }

    /// Reference to `name`. No request is made; the queue may not exist.
    pub fn queue_reference(&self, name: &str) -> QueueHandle {
        QueueHandle {
            name: Arc::from(name),
            transport: Arc::clone(&self.transport),
        }
    }
}

/// Reference to a named queue, ready for publishing.
#[derive(Clone)]
pub struct QueueHandle {
    name: Arc<str>,
    transport: Arc<dyn QueueTransport>,
}

impl QueueHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether both handles address the same queue through the same transport.
    pub fn same_queue(&self, other: &QueueHandle) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.transport, &other.transport)
    }

    pub async fn create_if_not_exists(&self) -> Result<bool, TransportError> {
        self.transport.create_queue_if_not_exists(&self.name).await
    }

    pub async fn add_message(&self, message: QueueMessage) -> Result<(), TransportError> {
        self.transport.put_message(&self.name, &message).await
    }
}

impl Debug for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
