// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Rendering of log events into queue message text.

use std::fmt::{self, Write};

use chrono::{DateTime, Timelike, Utc};

use crate::errors::SinkError;
use crate::event::LogEvent;

/// Renders a [`LogEvent`] into text.
///
/// Implementations must be deterministic for a given event and free of side
/// effects; the sink calls them on every emission.
pub trait TextFormatter: Send + Sync {
    fn format(&self, event: &LogEvent, output: &mut dyn Write) -> fmt::Result;

    fn render(&self, event: &LogEvent) -> Result<String, SinkError> {
        let mut output = String::new();
        self.format(event, &mut output)
            .map_err(|e| SinkError::Format(e.to_string()))?;
        Ok(output)
    }
}

/// JSON rendering of an event, one object per event with no closing delimiter:
///
/// ```text
/// {"Timestamp":"2024-05-01T10:00:00.0000000+00:00","Level":"Information","MessageTemplate":"...","Properties":{...}}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    render_message: bool,
}

impl JsonFormatter {
    #[must_use]
    pub fn new(render_message: bool) -> Self {
        JsonFormatter { render_message }
    }
}

impl TextFormatter for JsonFormatter {
    fn format(&self, event: &LogEvent, output: &mut dyn Write) -> fmt::Result {
        // Field order is part of the output contract, so the object is written
        // by hand instead of going through a (sorted) serde_json::Map.
        output.write_str("{\"Timestamp\":\"")?;
        write_round_trip_timestamp(event.timestamp(), output)?;
        output.write_char('"')?;
        write!(output, ",\"Level\":\"{}\"", event.level())?;
        write!(
            output,
            ",\"MessageTemplate\":{}",
            json_string(event.message_template())
        )?;
        if self.render_message {
            write!(
                output,
                ",\"RenderedMessage\":{}",
                json_string(&event.render_message())
            )?;
        }
        if let Some(exception) = event.exception() {
            write!(output, ",\"Exception\":{}", json_string(exception))?;
        }
        if !event.properties().is_empty() {
            let properties = serde_json::to_string(event.properties()).map_err(|_| fmt::Error)?;
            write!(output, ",\"Properties\":{properties}")?;
        }
        output.write_char('}')
    }
}

/// Seconds carry seven fractional digits (100ns ticks). chrono has no `%.7f`.
fn write_round_trip_timestamp(timestamp: DateTime<Utc>, output: &mut dyn Write) -> fmt::Result {
    // Leap seconds are reported as nanoseconds past one billion.
    let ticks = (timestamp.nanosecond() % 1_000_000_000) / 100;
    write!(
        output,
        "{}.{ticks:07}{}",
        timestamp.format("%Y-%m-%dT%H:%M:%S"),
        timestamp.format("%:z")
    )
}

fn json_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Single line rendering: `{timestamp} [{LVL}] {rendered message}`, followed by
/// the exception on its own line when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn format(&self, event: &LogEvent, output: &mut dyn Write) -> fmt::Result {
        write!(
            output,
            "{} [{}] {}",
            event.timestamp().format("%Y-%m-%d %H:%M:%S%.3f %:z"),
            event.level().short_code(),
            event.render_message()
        )?;
        if let Some(exception) = event.exception() {
            write!(output, "\n{exception}")?;
        }
        Ok(())
    }
}
