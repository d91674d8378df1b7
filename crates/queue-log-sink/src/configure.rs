// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sink options and the configuration entry points.
//!
//! The entry points never fail. A sink that cannot be configured is reported
//! to the [`self_log`](crate::self_log) channel and replaced by a disabled
//! sink, so a logging misconfiguration never takes the application down.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::connection::{QueueConnection, StorageAccount};
use crate::errors::SinkError;
use crate::event::LogLevel;
use crate::formatter::{JsonFormatter, TextFormatter};
use crate::provider::QueueHandleProvider;
use crate::sink::{QueueSink, QueueSinkBuilder};

pub const DEFAULT_QUEUE_NAME: &str = "logevententity";

const MIN_QUEUE_NAME_LENGTH: usize = 3;
const MAX_QUEUE_NAME_LENGTH: usize = 63;
// Longest per-level suffix.
const LONGEST_ROUTED_SUFFIX: &str = "information";

pub const CONNECTION_STRING_ENV: &str = "QUEUE_SINK_CONNECTION_STRING";
pub const SAS_TOKEN_ENV: &str = "QUEUE_SINK_SAS_TOKEN";
pub const ACCOUNT_NAME_ENV: &str = "QUEUE_SINK_ACCOUNT_NAME";
pub const QUEUE_NAME_ENV: &str = "QUEUE_SINK_QUEUE_NAME";
pub const BYPASS_QUEUE_CREATION_VALIDATION_ENV: &str =
    "QUEUE_SINK_BYPASS_QUEUE_CREATION_VALIDATION";
pub const SEPARATE_QUEUES_BY_LEVEL_ENV: &str = "QUEUE_SINK_SEPARATE_QUEUES_BY_LEVEL";
pub const MINIMUM_LEVEL_ENV: &str = "QUEUE_SINK_MINIMUM_LEVEL";
pub const WAIT_TIMEOUT_MS_ENV: &str = "QUEUE_SINK_WAIT_TIMEOUT_MS";
pub const RENDER_MESSAGE_ENV: &str = "QUEUE_SINK_RENDER_MESSAGE";

#[derive(Clone)]
pub struct SinkOptions {
    /// Queue to publish to, or the base name of the per-level queues.
    pub queue_name: String,
    /// Keep going when the queue cannot be created, e.g. with credentials that
    /// may enqueue but not create.
    pub bypass_queue_creation_validation: bool,
    /// Route each level to `{queue_name}-{level}`.
    pub separate_queues_by_level: bool,
    /// Least severe level forwarded by the tracing layer.
    pub minimum_level: LogLevel,
    /// Bound on each queue operation. `None` waits forever.
    pub wait_timeout: Option<Duration>,
    /// Include the rendered message in the JSON payload. Ignored when a
    /// `formatter` is given.
    pub render_message: bool,
    /// Replaces the JSON formatter.
    pub formatter: Option<Arc<dyn TextFormatter>>,
    /// Replaces the provider that resolves and creates queues.
    pub queue_handle_provider: Option<Arc<dyn QueueHandleProvider>>,
}

impl Default for SinkOptions {
    fn default() -> Self {
        SinkOptions {
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            bypass_queue_creation_validation: false,
            separate_queues_by_level: false,
            minimum_level: LogLevel::Verbose,
            wait_timeout: None,
            render_message: false,
            formatter: None,
            queue_handle_provider: None,
        }
    }
}

impl fmt::Debug for SinkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkOptions")
            .field("queue_name", &self.queue_name)
            .field(
                "bypass_queue_creation_validation",
                &self.bypass_queue_creation_validation,
            )
            .field("separate_queues_by_level", &self.separate_queues_by_level)
            .field("minimum_level", &self.minimum_level)
            .field("wait_timeout", &self.wait_timeout)
            .field("render_message", &self.render_message)
            .field("custom_formatter", &self.formatter.is_some())
            .field(
                "custom_queue_handle_provider",
                &self.queue_handle_provider.is_some(),
            )
            .finish()
    }
}

impl SinkOptions {
    /// Options from `QUEUE_SINK_*` environment variables. Unset or unparsable
    /// variables keep their defaults.
    pub fn from_env() -> SinkOptions {
        let defaults = SinkOptions::default();
        SinkOptions {
            queue_name: env::var(QUEUE_NAME_ENV)
                .ok()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.queue_name),
            bypass_queue_creation_validation: env_flag(BYPASS_QUEUE_CREATION_VALIDATION_ENV)
                .unwrap_or(defaults.bypass_queue_creation_validation),
            separate_queues_by_level: env_flag(SEPARATE_QUEUES_BY_LEVEL_ENV)
                .unwrap_or(defaults.separate_queues_by_level),
            minimum_level: env::var(MINIMUM_LEVEL_ENV)
                .ok()
                .and_then(|level| level.parse::<LogLevel>().ok())
                .unwrap_or(defaults.minimum_level),
            wait_timeout: env::var(WAIT_TIMEOUT_MS_ENV)
                .ok()
                .and_then(|ms| ms.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .or(defaults.wait_timeout),
            render_message: env_flag(RENDER_MESSAGE_ENV).unwrap_or(defaults.render_message),
            formatter: None,
            queue_handle_provider: None,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Checks `queue_name` against the queue service naming rules: 3 to 63
/// characters, lowercase letters, digits and single hyphens, starting and
/// ending with a letter or digit. With per-level routing the derived names
/// must be valid too.
pub fn validate_queue_name(queue_name: &str, separate_queues_by_level: bool) -> Result<(), SinkError> {
    check_queue_name(queue_name)?;
    if separate_queues_by_level {
        check_queue_name(&format!("{queue_name}-{LONGEST_ROUTED_SUFFIX}"))?;
    }
    Ok(())
}

fn check_queue_name(name: &str) -> Result<(), SinkError> {
    let invalid = |reason: &str| {
        Err::<(), _>(SinkError::Configuration(format!(
            "invalid queue name '{name}': {reason}"
        )))
    };

    if name.len() < MIN_QUEUE_NAME_LENGTH || name.len() > MAX_QUEUE_NAME_LENGTH {
        return invalid("must be between 3 and 63 characters long");
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return invalid("only lowercase letters, digits and hyphens are allowed");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return invalid("must start and end with a letter or digit");
    }
    if name.contains("--") {
        return invalid("consecutive hyphens are not allowed");
    }
    Ok(())
}

/// Sink over an existing connection.
pub fn with_connection(connection: QueueConnection, options: &SinkOptions) -> QueueSink {
    let mut builder = QueueSink::builder(connection)
        .queue_name(options.queue_name.clone())
        .bypass_queue_creation_validation(options.bypass_queue_creation_validation)
        .separate_queues_by_level(options.separate_queues_by_level)
        .wait_timeout(options.wait_timeout);
    builder = match &options.formatter {
        Some(formatter) => builder.shared_formatter(Arc::clone(formatter)),
        None => builder.formatter(JsonFormatter::new(options.render_message)),
    };
    if let Some(provider) = &options.queue_handle_provider {
        builder = builder.shared_provider(Arc::clone(provider));
    }
    build(builder)
}

/// Builds a sink from a hand-assembled builder, falling back to a disabled
/// sink when building fails.
pub fn build(builder: QueueSinkBuilder) -> QueueSink {
    enabled_or_disabled(builder.build())
}

pub fn with_account(account: StorageAccount, options: &SinkOptions) -> QueueSink {
    match QueueConnection::new(account) {
        Ok(connection) => with_connection(connection, options),
        Err(e) => enabled_or_disabled(Err(e)),
    }
}

pub fn with_connection_string(connection_string: &str, options: &SinkOptions) -> QueueSink {
    match StorageAccount::parse(connection_string) {
        Ok(account) => with_account(account, options),
        Err(e) => enabled_or_disabled(Err(e)),
    }
}

/// Sink authenticated with a shared access signature.
///
/// A SAS is typically scoped to a single existing queue, so queue creation
/// failures are always bypassed and per-level routing is always off,
/// whatever `options` says.
pub fn with_sas(shared_access_signature: &str, account_name: &str, options: &SinkOptions) -> QueueSink {
    let options = sas_options(options);
    match StorageAccount::from_sas(shared_access_signature, account_name) {
        Ok(account) => with_account(account, &options),
        Err(e) => enabled_or_disabled(Err(e)),
    }
}

fn sas_options(options: &SinkOptions) -> SinkOptions {
    SinkOptions {
        bypass_queue_creation_validation: true,
        separate_queues_by_level: false,
        ..options.clone()
    }
}

/// Sink configured from `QUEUE_SINK_*` environment variables. A connection
/// string takes precedence over a SAS token and account name.
pub fn from_env() -> QueueSink {
    let options = SinkOptions::from_env();
    if let Ok(connection_string) = env::var(CONNECTION_STRING_ENV) {
        return with_connection_string(&connection_string, &options);
    }
    match (env::var(SAS_TOKEN_ENV), env::var(ACCOUNT_NAME_ENV)) {
        (Ok(sas), Ok(account_name)) => with_sas(&sas, &account_name, &options),
        _ => enabled_or_disabled(Err(SinkError::Configuration(format!(
            "{CONNECTION_STRING_ENV}, or {SAS_TOKEN_ENV} and {ACCOUNT_NAME_ENV}, must be set"
        )))),
    }
}

fn enabled_or_disabled(sink: Result<QueueSink, SinkError>) -> QueueSink {
    match sink {
        Ok(sink) => {
            debug!("Configured {sink:?}");
            sink
        }
        Err(e) => {
            crate::self_log!("Error configuring AzureQueueStorage: {e}");
            QueueSink::disabled()
        }
    }
}
