// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured log events as seen by the sink.
//!
//! A [`LogEvent`] carries a severity, a timestamp, a message template such as
//! `"User {UserId} signed in"` and the property values captured alongside it.
//! Events are read-only to the sink: they are rendered by a
//! [`TextFormatter`](crate::formatter::TextFormatter) and routed by level.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::SinkError;

/// Severity of a log event, ordered from least to most important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Verbose,
        LogLevel::Debug,
        LogLevel::Information,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Verbose => "Verbose",
            LogLevel::Debug => "Debug",
            LogLevel::Information => "Information",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        }
    }

    /// Three letter code used by the plain text formatter.
    #[must_use]
    pub fn short_code(self) -> &'static str {
        match self {
            LogLevel::Verbose => "VRB",
            LogLevel::Debug => "DBG",
            LogLevel::Information => "INF",
            LogLevel::Warning => "WRN",
            LogLevel::Error => "ERR",
            LogLevel::Fatal => "FTL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" | "trace" => Ok(LogLevel::Verbose),
            "debug" => Ok(LogLevel::Debug),
            "information" | "info" => Ok(LogLevel::Information),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "fatal" | "critical" => Ok(LogLevel::Fatal),
            _ => Err(SinkError::UnsupportedLevel(s.to_string())),
        }
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = SinkError;

    fn try_from(value: u8) -> Result<Self, SinkError> {
        LogLevel::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| SinkError::UnsupportedLevel(value.to_string()))
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => LogLevel::Verbose,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Information,
            tracing::Level::WARN => LogLevel::Warning,
            _ => LogLevel::Error,
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single structured log event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEvent {
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    level: LogLevel,
    message_template: String,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exception: Option<String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message_template: impl Into<String>) -> Self {
        LogEvent {
            timestamp: Utc::now(),
            level,
            message_template: message_template.into(),
            properties: BTreeMap::new(),
            exception: None,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }

    /// Renders the message template, replacing each `{Name}` hole with the
    /// matching property value. `{{` and `}}` are literal braces. Holes with
    /// no matching property are kept verbatim.
    ///
    /// String values are quoted unless the hole carries the `:l` format, e.g.
    /// `{Name:l}`. Capture hints (`@`, `$`) and alignment are ignored.
    #[must_use]
    pub fn render_message(&self) -> String {
        let template = self.message_template.as_str();
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['{', '}']) {
            rendered.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                rendered.push('{');
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with("}}") {
                rendered.push('}');
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with('}') {
                rendered.push('}');
                rest = &tail[1..];
                continue;
            }

            let Some(end) = tail.find('}') else {
                rendered.push_str(tail);
                rest = "";
                break;
            };
            let hole = &tail[1..end];
            match self.render_hole(hole) {
                Some(value) => rendered.push_str(&value),
                None => rendered.push_str(&tail[..=end]),
            }
            rest = &tail[end + 1..];
        }
        rendered.push_str(rest);
        rendered
    }

    fn render_hole(&self, hole: &str) -> Option<String> {
        let hole = hole.trim_start_matches(['@', '$']);
        let (name, format) = match hole.split_once(':') {
            Some((name, format)) => (name, Some(format)),
            None => (hole, None),
        };
        let name = name.split(',').next().unwrap_or(name);
        let value = self.properties.get(name)?;

        Some(match value {
            Value::String(s) if format == Some("l") => s.clone(),
            other => other.to_string(),
        })
    }
}
