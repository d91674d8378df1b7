// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use tracing::debug;

use crate::blocking;
use crate::connection::QueueConnection;
use crate::errors::SinkError;
use crate::transport::QueueHandle;

/// Resolves a queue name into a handle that is ready for publishing.
pub trait QueueHandleProvider: Send + Sync {
    /// Returns a handle to `queue_name`, creating the queue if it does not
    /// exist. With `bypass_queue_creation_validation`, a failed creation is
    /// reported to the self log and the handle is returned regardless.
    fn get_queue(
        &self,
        connection: &QueueConnection,
        queue_name: &str,
        bypass_queue_creation_validation: bool,
    ) -> Result<QueueHandle, SinkError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQueueHandleProvider {
    /// How long to wait for queue creation. `None` waits forever.
    wait_timeout: Option<Duration>,
}

impl DefaultQueueHandleProvider {
    #[must_use]
    pub fn new(wait_timeout: Option<Duration>) -> Self {
        DefaultQueueHandleProvider { wait_timeout }
    }
}

impl QueueHandleProvider for DefaultQueueHandleProvider {
    fn get_queue(
        &self,
        connection: &QueueConnection,
        queue_name: &str,
        bypass_queue_creation_validation: bool,
    ) -> Result<QueueHandle, SinkError> {
        let queue = connection.create_queue_client().queue_reference(queue_name);

        // Restricted credentials (a SAS scoped to one queue, for instance) may be
        // allowed to enqueue but not to create, hence the bypass.
        let creating = queue.clone();
        let created = blocking::wait(
            async move { Ok(creating.create_if_not_exists().await?) },
            self.wait_timeout,
        );

        match created {
            Ok(true) => debug!("Created queue {queue_name}"),
            Ok(false) => debug!("Queue {queue_name} already exists"),
            Err(e) => {
                crate::self_log!("Failed to create queue: {e}");
                if !bypass_queue_creation_validation {
                    return Err(SinkError::QueueCreation {
                        queue: queue_name.to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(queue)
    }
}
