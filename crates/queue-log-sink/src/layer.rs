// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `tracing` integration.
//!
//! [`QueueSinkLayer`] turns every `tracing` event into a [`LogEvent`] and hands
//! it to a [`QueueSink`]:
//!
//! ```rust,ignore
//! use queue_log_sink::{configure, QueueSinkLayer, SinkOptions};
//! use tracing_subscriber::prelude::*;
//!
//! let options = SinkOptions::from_env();
//! let sink = configure::with_connection_string(&connection_string, &options);
//! tracing_subscriber::registry()
//!     .with(QueueSinkLayer::new(sink).with_minimum_level(options.minimum_level))
//!     .init();
//!
//! tracing::info!(order_id = 42, "Order {{order_id}} placed");
//! ```
//!
//! The event message becomes the message template and the other fields become
//! properties. Events raised while the sink itself is working, and events from
//! this crate, are never forwarded.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing_core::field::{Field, Visit};
use tracing_core::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::blocking;
use crate::event::{LogEvent, LogLevel};
use crate::sink::QueueSink;

const INTERNAL_TARGET: &str = "queue_log_sink";
const MESSAGE_FIELD: &str = "message";
pub const SOURCE_CONTEXT_PROPERTY: &str = "SourceContext";

pub struct QueueSinkLayer {
    sink: Arc<QueueSink>,
    minimum_level: LogLevel,
}

impl QueueSinkLayer {
    pub fn new(sink: QueueSink) -> Self {
        QueueSinkLayer::from_shared(Arc::new(sink))
    }

    pub fn from_shared(sink: Arc<QueueSink>) -> Self {
        QueueSinkLayer {
            sink,
            minimum_level: LogLevel::Verbose,
        }
    }

    /// Drops events less severe than `minimum_level`.
    #[must_use]
    pub fn with_minimum_level(mut self, minimum_level: LogLevel) -> Self {
        self.minimum_level = minimum_level;
        self
    }
}

impl<S> Layer<S> for QueueSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if blocking::in_sink_context() || is_internal_target(metadata.target()) {
            return;
        }
        let level = LogLevel::from(*metadata.level());
        if level < self.minimum_level {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let log_event = visitor.into_log_event(level, metadata.target());

        if let Err(e) = self.sink.emit(&log_event) {
            crate::self_log!("Failed to emit event to queue: {e}");
        }
    }
}

fn is_internal_target(target: &str) -> bool {
    target
        .strip_prefix(INTERNAL_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    exception: Option<String>,
    properties: BTreeMap<String, Value>,
}

impl EventVisitor {
    fn record_value(&mut self, field: &Field, value: Value) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.properties.insert(field.name().to_string(), value);
        }
    }

    fn into_log_event(self, level: LogLevel, target: &str) -> LogEvent {
        let mut event = LogEvent::new(level, self.message.unwrap_or_default())
            .with_property(SOURCE_CONTEXT_PROPERTY, target);
        for (name, value) in self.properties {
            event = event.with_property(name, value);
        }
        match self.exception {
            Some(exception) => event.with_exception(exception),
            None => event,
        }
    }
}

impl Visit for EventVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let mut chain = value.to_string();
        let mut source = value.source();
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        self.exception.get_or_insert_with(|| chain.clone());
        self.record_value(field, Value::from(chain));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, Value::from(format!("{value:?}")));
    }
}
