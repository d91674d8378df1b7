// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-level queue routing.
//!
//! With routing enabled every event goes to `{base}-{suffix}`, where the suffix
//! is derived from the event level:
//!
//! | level       | suffix                                     |
//! |-------------|--------------------------------------------|
//! | Verbose     | `trace`                                    |
//! | Debug       | `debug`                                    |
//! | Information | `information`                              |
//! | Warning     | `warning`, or `monitor` with a `Monitor` property |
//! | Error       | `error`                                    |
//! | Fatal       | `critical`                                 |
//!
//! Only the presence of the `Monitor` property matters, not its value.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::connection::QueueConnection;
use crate::errors::SinkError;
use crate::event::LogLevel;
use crate::provider::QueueHandleProvider;
use crate::transport::QueueHandle;

/// Property that reroutes warnings to the `monitor` queue.
pub const MONITOR_PROPERTY: &str = "Monitor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Trace,
    Debug,
    Information,
    Warning,
    Monitor,
    Error,
    Critical,
}

impl Route {
    const COUNT: usize = 7;

    fn for_event(level: LogLevel, properties: &BTreeMap<String, Value>) -> Route {
        match level {
            LogLevel::Verbose => Route::Trace,
            LogLevel::Debug => Route::Debug,
            LogLevel::Information => Route::Information,
            LogLevel::Warning if properties.contains_key(MONITOR_PROPERTY) => Route::Monitor,
            LogLevel::Warning => Route::Warning,
            LogLevel::Error => Route::Error,
            LogLevel::Fatal => Route::Critical,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Route::Trace => "trace",
            Route::Debug => "debug",
            Route::Information => "information",
            Route::Warning => "warning",
            Route::Monitor => "monitor",
            Route::Error => "error",
            Route::Critical => "critical",
        }
    }
}

/// Queue name suffix for an event of `level` carrying `properties`.
pub fn log_level_suffix(level: LogLevel, properties: &BTreeMap<String, Value>) -> &'static str {
    Route::for_event(level, properties).suffix()
}

/// Lazily resolved queue handle per routing destination.
///
/// Each destination owns its own slot, so first uses of different levels never
/// wait on each other. Concurrent first uses of the same destination may both
/// resolve the queue; the first handle stored wins and is returned to everyone.
pub struct LevelRoutingCache {
    base_name: String,
    connection: QueueConnection,
    provider: Arc<dyn QueueHandleProvider>,
    bypass_queue_creation_validation: bool,
    slots: [OnceLock<QueueHandle>; Route::COUNT],
}

impl LevelRoutingCache {
    pub fn new(
        base_name: &str,
        connection: QueueConnection,
        provider: Arc<dyn QueueHandleProvider>,
        bypass_queue_creation_validation: bool,
    ) -> Self {
        LevelRoutingCache {
            base_name: base_name.to_string(),
            connection,
            provider,
            bypass_queue_creation_validation,
            slots: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    pub fn get_or_create(
        &self,
        level: LogLevel,
        properties: &BTreeMap<String, Value>,
    ) -> Result<QueueHandle, SinkError> {
        let route = Route::for_event(level, properties);
        let slot = &self.slots[route as usize];
        if let Some(queue) = slot.get() {
            return Ok(queue.clone());
        }

        let queue_name = format!("{}-{}", self.base_name, route.suffix());
        let queue = self.provider.get_queue(
            &self.connection,
            &queue_name,
            self.bypass_queue_creation_validation,
        )?;
        Ok(slot.get_or_init(|| queue).clone())
    }

    /// Names of the queues resolved so far.
    pub fn resolved_queue_names(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter_map(OnceLock::get)
            .map(|queue| queue.name().to_string())
            .collect()
    }
}
