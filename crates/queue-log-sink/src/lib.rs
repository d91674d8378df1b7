// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Queue Log Sink
//!
//! Forwards structured log events to Azure Queue Storage, one queue message per
//! event.
//!
//! ## Overview
//!
//! - [`sink`]: the sink itself. Renders each event, picks its queue and
//!   publishes it, holding the caller until the queue service answers.
//! - [`routing`]: optional per-level queues (`{base}-information`,
//!   `{base}-error`, ...), resolved lazily and cached.
//! - [`provider`]: resolves a queue name into a handle, creating the queue if
//!   needed.
//! - [`blocking`]: the synchronous wait on asynchronous queue operations.
//! - [`connection`], [`transport`], [`http_transport`]: storage accounts,
//!   connection strings and the queue service REST client.
//! - [`configure`]: options, environment loading and the entry points that
//!   fall back to a disabled sink on misconfiguration.
//! - [`layer`]: a `tracing_subscriber` layer feeding `tracing` events to a sink.
//! - [`self_log`]: diagnostics about the sink itself.

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]

pub mod blocking;
pub mod configure;
pub mod connection;
pub mod errors;
pub mod event;
pub mod formatter;
pub mod http_transport;
pub mod layer;
pub mod memory;
pub mod provider;
pub mod routing;
pub mod self_log;
pub mod sink;
pub mod transport;

pub use configure::{SinkOptions, DEFAULT_QUEUE_NAME};
pub use connection::{QueueConnection, StorageAccount, StorageCredentials};
pub use errors::{SinkError, TransportError};
pub use event::{LogEvent, LogLevel};
pub use formatter::{JsonFormatter, PlainTextFormatter, TextFormatter};
pub use layer::QueueSinkLayer;
pub use provider::{DefaultQueueHandleProvider, QueueHandleProvider};
pub use routing::{log_level_suffix, LevelRoutingCache, MONITOR_PROPERTY};
pub use sink::{QueueSink, QueueSinkBuilder};
pub use transport::{QueueClient, QueueHandle, QueueMessage, QueueTransport};
