// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Errors raised by the queue transport while talking to the queue service.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Queue service responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Queue IO runtime unavailable: {0}")]
    Runtime(String),

    #[error("Queue operation was aborted before completing")]
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A required construction argument is missing or malformed.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to create queue {queue}: {source}")]
    QueueCreation {
        queue: String,
        #[source]
        source: Box<SinkError>,
    },

    #[error("Operation failed to complete within allotted time ({0:?})")]
    PublishTimeout(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unsupported log level: {0}")]
    UnsupportedLevel(String),

    #[error("Failed to format log event: {0}")]
    Format(String),
}
