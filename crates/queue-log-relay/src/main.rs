// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::io::{self, BufRead};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use queue_log_sink::{configure, self_log, LogEvent, SinkOptions};

const LOG_LEVEL_ENV: &str = "QUEUE_SINK_LOG_LEVEL";

pub fn main() {
    let log_level = env::var(LOG_LEVEL_ENV)
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,reqwest=off,rustls=off,{log_level}");

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    self_log::enable(io::stderr());

    let options = SinkOptions::from_env();
    let sink = configure::from_env();
    if !sink.is_enabled() {
        error!("Queue sink could not be configured. Shutting down relay.");
        return;
    }
    info!(
        "Forwarding events from stdin (minimum level {})",
        options.minimum_level
    );

    let mut forwarded = 0u64;
    let mut failed = 0u64;
    for (index, line) in io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read from stdin: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let event: LogEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping line {}: not a log event: {e}", index + 1);
                failed += 1;
                continue;
            }
        };
        if event.level() < options.minimum_level {
            continue;
        }

        match sink.emit(&event) {
            Ok(()) => forwarded += 1,
            Err(e) => {
                error!("Failed to forward line {}: {e}", index + 1);
                failed += 1;
            }
        }
    }

    info!("Relay finished: {forwarded} events forwarded, {failed} failed");
}
