// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::blocking;
use crate::configure::{validate_queue_name, DEFAULT_QUEUE_NAME};
use crate::connection::QueueConnection;
use crate::errors::SinkError;
use crate::event::LogEvent;
use crate::formatter::{JsonFormatter, TextFormatter};
use crate::provider::{DefaultQueueHandleProvider, QueueHandleProvider};
use crate::routing::LevelRoutingCache;
use crate::transport::{QueueHandle, QueueMessage};

enum Destination {
    /// Every event goes to one queue, resolved when the sink is built.
    Shared(QueueHandle),
    PerLevel(LevelRoutingCache),
    Disabled,
}

/// Publishes each log event as one message on a queue.
///
/// Emission is synchronous: [`QueueSink::emit`] returns once the queue service
/// has accepted the message, the wait timeout has elapsed, or publishing failed.
/// The sink may be shared between threads.
pub struct QueueSink {
    formatter: Arc<dyn TextFormatter>,
    destination: Destination,
    wait_timeout: Option<Duration>,
}

impl QueueSink {
    pub fn builder(connection: QueueConnection) -> QueueSinkBuilder {
        QueueSinkBuilder::new(connection)
    }

    /// A sink that accepts and discards every event.
    pub fn disabled() -> Self {
        QueueSink {
            formatter: Arc::new(JsonFormatter::default()),
            destination: Destination::Disabled,
            wait_timeout: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.destination, Destination::Disabled)
    }

    pub fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        if let Destination::Disabled = self.destination {
            return Ok(());
        }

        let payload = self.formatter.render(event)?;
        let queue = match &self.destination {
            Destination::Shared(queue) => queue.clone(),
            Destination::PerLevel(cache) => {
                cache.get_or_create(event.level(), event.properties())?
            }
            Destination::Disabled => return Ok(()),
        };

        blocking::wait(
            async move { Ok(queue.add_message(QueueMessage::new(payload)).await?) },
            self.wait_timeout,
        )
    }
}

impl Debug for QueueSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let destination = match &self.destination {
            Destination::Shared(queue) => queue.name().to_string(),
            Destination::PerLevel(cache) => format!("per level {:?}", cache.resolved_queue_names()),
            Destination::Disabled => "disabled".to_string(),
        };
        f.debug_struct("QueueSink")
            .field("destination", &destination)
            .field("wait_timeout", &self.wait_timeout)
            .finish_non_exhaustive()
    }
}

pub struct QueueSinkBuilder {
    connection: QueueConnection,
    queue_name: String,
    bypass_queue_creation_validation: bool,
    separate_queues_by_level: bool,
    wait_timeout: Option<Duration>,
    formatter: Option<Arc<dyn TextFormatter>>,
    provider: Option<Arc<dyn QueueHandleProvider>>,
}

impl QueueSinkBuilder {
    fn new(connection: QueueConnection) -> Self {
        QueueSinkBuilder {
            connection,
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            bypass_queue_creation_validation: false,
            separate_queues_by_level: false,
            wait_timeout: None,
            formatter: None,
            provider: None,
        }
    }

    /// Queue to publish to, or the base of the per-level queue names.
    #[must_use]
    pub fn queue_name(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = queue_name.into();
        self
    }

    #[must_use]
    pub fn bypass_queue_creation_validation(mut self, bypass: bool) -> Self {
        self.bypass_queue_creation_validation = bypass;
        self
    }

    #[must_use]
    pub fn separate_queues_by_level(mut self, separate: bool) -> Self {
        self.separate_queues_by_level = separate;
        self
    }

    /// Bound on every queue operation. `None`, the default, waits forever.
    #[must_use]
    pub fn wait_timeout(mut self, wait_timeout: Option<Duration>) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    #[must_use]
    pub fn formatter(mut self, formatter: impl TextFormatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: impl QueueHandleProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn shared_formatter(mut self, formatter: Arc<dyn TextFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    #[must_use]
    pub fn shared_provider(mut self, provider: Arc<dyn QueueHandleProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Builds the sink. Without per-level routing the queue is resolved (and
    /// created if needed) here; per-level queues are resolved on first use.
    pub fn build(self) -> Result<QueueSink, SinkError> {
        validate_queue_name(&self.queue_name, self.separate_queues_by_level)?;

        let wait_timeout = self.wait_timeout;
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(DefaultQueueHandleProvider::new(wait_timeout)));
        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::new(JsonFormatter::default()));

        let destination = if self.separate_queues_by_level {
            debug!("Routing events to {}-<level> queues", self.queue_name);
            Destination::PerLevel(LevelRoutingCache::new(
                &self.queue_name,
                self.connection,
                provider,
                self.bypass_queue_creation_validation,
            ))
        } else {
            let queue = provider.get_queue(
                &self.connection,
                &self.queue_name,
                self.bypass_queue_creation_validation,
            )?;
            debug!("Routing events to queue {}", queue.name());
            Destination::Shared(queue)
        };

        Ok(QueueSink {
            formatter,
            destination,
            wait_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::StorageAccount;
    use crate::errors::TransportError;
    use crate::event::LogLevel;
    use crate::formatter::PlainTextFormatter;
    use crate::memory::InMemoryQueueTransport;
    use crate::routing::MONITOR_PROPERTY;
    use crate::transport::QueueTransport;
    use async_trait::async_trait;
    use std::time::Instant;
    use tracing_test::traced_test;

    fn memory_connection() -> (Arc<InMemoryQueueTransport>, QueueConnection) {
        let transport = Arc::new(InMemoryQueueTransport::new());
        let connection = QueueConnection::with_transport(
            StorageAccount::development_storage(),
            transport.clone(),
        );
        (transport, connection)
    }

    fn texts(transport: &InMemoryQueueTransport, queue: &str) -> Vec<String> {
        transport
            .messages(queue)
            .into_iter()
            .map(QueueMessage::into_text)
            .collect()
    }

    #[test]
    fn test_shared_queue_resolved_at_build() {
        let (transport, connection) = memory_connection();
        let sink = QueueSink::builder(connection)
            .queue_name("applogs")
            .build()
            .unwrap();

        assert!(sink.is_enabled());
        assert_eq!(transport.queue_names(), vec!["applogs".to_string()]);
    }

    #[test]
    #[traced_test]
    fn test_build_logs_destination() {
        let (_, connection) = memory_connection();
        QueueSink::builder(connection.clone())
            .queue_name("tracedlogs")
            .build()
            .unwrap();
        QueueSink::builder(connection)
            .queue_name("tracedlogs")
            .separate_queues_by_level(true)
            .build()
            .unwrap();

        assert!(logs_contain("Created queue tracedlogs"));
        assert!(logs_contain("Routing events to queue tracedlogs"));
        assert!(logs_contain("Routing events to tracedlogs-<level> queues"));
    }

    #[test]
    fn test_default_queue_name() {
        let (transport, connection) = memory_connection();
        QueueSink::builder(connection).build().unwrap();
        assert_eq!(transport.queue_names(), vec![DEFAULT_QUEUE_NAME.to_string()]);
    }

    #[test]
    fn test_shared_queue_receives_events_in_order() {
        let (transport, connection) = memory_connection();
        let sink = QueueSink::builder(connection)
            .queue_name("applogs")
            .formatter(PlainTextFormatter)
            .build()
            .unwrap();

        for (level, text) in [
            (LogLevel::Information, "first"),
            (LogLevel::Error, "second"),
            (LogLevel::Debug, "third"),
        ] {
            sink.emit(&LogEvent::new(level, text)).unwrap();
        }

        let messages = texts(&transport, "applogs");
        assert_eq!(messages.len(), 3);
        assert!(messages[0].ends_with("[INF] first"));
        assert!(messages[1].ends_with("[ERR] second"));
        assert!(messages[2].ends_with("[DBG] third"));
    }

    #[test]
    fn test_per_level_routing() {
        let (transport, connection) = memory_connection();
        let sink = QueueSink::builder(connection)
            .queue_name("applogs")
            .separate_queues_by_level(true)
            .build()
            .unwrap();
        assert!(transport.queue_names().is_empty());

        sink.emit(&LogEvent::new(LogLevel::Information, "hello"))
            .unwrap();
        sink.emit(&LogEvent::new(LogLevel::Error, "failed")).unwrap();
        sink.emit(&LogEvent::new(LogLevel::Information, "again"))
            .unwrap();

        assert_eq!(
            transport.queue_names(),
            vec![
                "applogs-error".to_string(),
                "applogs-information".to_string()
            ]
        );
        assert_eq!(transport.messages("applogs-information").len(), 2);
        assert_eq!(transport.messages("applogs-error").len(), 1);

        let payload: serde_json::Value =
            serde_json::from_str(&texts(&transport, "applogs-error")[0]).unwrap();
        assert_eq!(payload["Level"], "Error");
        assert_eq!(payload["MessageTemplate"], "failed");
    }

    #[test]
    fn test_monitor_warnings_get_their_own_queue() {
        let (transport, connection) = memory_connection();
        let sink = QueueSink::builder(connection)
            .queue_name("applogs")
            .separate_queues_by_level(true)
            .build()
            .unwrap();

        sink.emit(&LogEvent::new(LogLevel::Warning, "slow")).unwrap();
        sink.emit(&LogEvent::new(LogLevel::Warning, "disk").with_property(MONITOR_PROPERTY, false))
            .unwrap();

        assert_eq!(transport.messages("applogs-warning").len(), 1);
        assert_eq!(transport.messages("applogs-monitor").len(), 1);
    }

    #[test]
    fn test_invalid_queue_name_is_rejected() {
        let (_, connection) = memory_connection();
        let err = QueueSink::builder(connection)
            .queue_name("Bad_Name")
            .build()
            .unwrap_err();
        assert!(matches!(err, SinkError::Configuration(_)));
    }

    #[test]
    fn test_disabled_sink_discards_events() {
        let sink = QueueSink::disabled();
        assert!(!sink.is_enabled());
        sink.emit(&LogEvent::new(LogLevel::Fatal, "dropped")).unwrap();
    }

    struct DenyingTransport;

    #[async_trait]
    impl QueueTransport for DenyingTransport {
        async fn create_queue_if_not_exists(&self, _queue: &str) -> Result<bool, TransportError> {
            Err(TransportError::Status {
                status: 403,
                body: "AuthorizationPermissionMismatch".to_string(),
            })
        }

        async fn put_message(
            &self,
            _queue: &str,
            _message: &QueueMessage,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[test]
    fn test_creation_failure_fails_build_unless_bypassed() {
        let connection = QueueConnection::with_transport(
            StorageAccount::development_storage(),
            Arc::new(DenyingTransport),
        );

        let err = QueueSink::builder(connection.clone())
            .queue_name("applogs")
            .build()
            .unwrap_err();
        assert!(matches!(err, SinkError::QueueCreation { .. }));

        let sink = QueueSink::builder(connection)
            .queue_name("applogs")
            .bypass_queue_creation_validation(true)
            .build()
            .unwrap();
        sink.emit(&LogEvent::new(LogLevel::Information, "still sent"))
            .unwrap();
    }

    struct StalledTransport;

    #[async_trait]
    impl QueueTransport for StalledTransport {
        async fn create_queue_if_not_exists(&self, _queue: &str) -> Result<bool, TransportError> {
            Ok(false)
        }

        async fn put_message(
            &self,
            _queue: &str,
            _message: &QueueMessage,
        ) -> Result<(), TransportError> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_emit_times_out() {
        let connection = QueueConnection::with_transport(
            StorageAccount::development_storage(),
            Arc::new(StalledTransport),
        );
        let sink = QueueSink::builder(connection)
            .queue_name("applogs")
            .wait_timeout(Some(Duration::from_millis(50)))
            .build()
            .unwrap();

        let started = Instant::now();
        let err = sink
            .emit(&LogEvent::new(LogLevel::Information, "stuck"))
            .unwrap_err();
        assert!(matches!(err, SinkError::PublishTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
