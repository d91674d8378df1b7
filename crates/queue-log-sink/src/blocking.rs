// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Synchronous waits on asynchronous queue operations.
//!
//! Emission is synchronous: the thread that logs is held until the queue
//! operation completes. The operation itself never runs on that thread, nor on
//! any runtime the thread may belong to. It is spawned on a dedicated IO
//! runtime shared by every sink in the process, and the caller parks on a
//! channel until the result (or the timeout) arrives. A caller that is itself a
//! runtime worker therefore cannot starve the operation it waits for.
//!
//! While waiting, the calling thread is marked as being inside a sink wait.
//! IO runtime threads carry the same mark permanently. Pipelines use
//! [`in_sink_context`] to drop events raised from inside the sink instead of
//! re-entering it.

use std::cell::Cell;
use std::future::Future;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::LazyLock;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tracing::error;

use crate::errors::{SinkError, TransportError};

const IO_THREAD_NAME: &str = "queue-sink-io";
const IO_WORKER_THREADS: usize = 2;

thread_local! {
    static IN_SINK_CONTEXT: Cell<bool> = const { Cell::new(false) };
}

static IO_RUNTIME: LazyLock<Result<Runtime, String>> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(IO_WORKER_THREADS)
        .thread_name(IO_THREAD_NAME)
        .on_thread_start(|| IN_SINK_CONTEXT.with(|flag| flag.set(true)))
        .enable_all()
        .build()
        .map_err(|e| {
            error!("Failed to start queue sink IO runtime: {e}");
            e.to_string()
        })
});

/// Whether the current thread is running sink work: an IO runtime thread, or a
/// thread blocked in [`wait`].
pub fn in_sink_context() -> bool {
    IN_SINK_CONTEXT.with(Cell::get)
}

/// Marks the current thread for the lifetime of the guard and restores the
/// previous mark on drop, whichever way the wait ends.
pub(crate) struct SinkContextGuard {
    previous: bool,
}

impl SinkContextGuard {
    pub(crate) fn enter() -> Self {
        let previous = IN_SINK_CONTEXT.with(|flag| flag.replace(true));
        SinkContextGuard { previous }
    }
}

impl Drop for SinkContextGuard {
    fn drop(&mut self) {
        let previous = self.previous;
        IN_SINK_CONTEXT.with(|flag| flag.set(previous));
    }
}

/// Runs `operation` on the IO runtime and blocks the calling thread until it
/// completes. `None` waits forever.
///
/// On timeout the operation is aborted and [`SinkError::PublishTimeout`] is
/// returned.
pub fn wait<F, T>(operation: F, timeout: Option<Duration>) -> Result<T, SinkError>
where
    F: Future<Output = Result<T, SinkError>> + Send + 'static,
    T: Send + 'static,
{
    let _guard = SinkContextGuard::enter();
    let runtime = IO_RUNTIME
        .as_ref()
        .map_err(|e| SinkError::Transport(TransportError::Runtime(e.clone())))?;

    let (tx, rx) = mpsc::sync_channel(1);
    let task = runtime.spawn(async move {
        // The receiver is gone only if the waiter timed out.
        let _ = tx.send(operation.await);
    });

    let received = match timeout {
        Some(timeout) => rx.recv_timeout(timeout),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };

    match received {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            task.abort();
            Err(SinkError::PublishTimeout(timeout.unwrap_or_default()))
        }
        // The task panicked or the runtime is shutting down.
        Err(RecvTimeoutError::Disconnected) => Err(SinkError::Transport(TransportError::Aborted)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    async fn explode() -> Result<(), SinkError> {
        panic!("operation panicked")
    }

    #[test]
    fn test_wait_returns_operation_result() {
        let value = wait(async { Ok::<_, SinkError>(42) }, None).unwrap();
        assert_eq!(value, 42);

        let err = wait(
            async { Err::<(), _>(SinkError::UnsupportedLevel("x".to_string())) },
            Some(Duration::from_secs(5)),
        )
        .unwrap_err();
        assert!(matches!(err, SinkError::UnsupportedLevel(_)));
    }

    #[test]
    fn test_wait_times_out_on_pending_operation() {
        let started = Instant::now();
        let err = wait(
            std::future::pending::<Result<(), SinkError>>(),
            Some(Duration::from_millis(50)),
        )
        .unwrap_err();

        assert!(matches!(err, SinkError::PublishTimeout(d) if d == Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_operation_runs_in_sink_context() {
        assert!(!in_sink_context());
        let inside = wait(async { Ok::<_, SinkError>(in_sink_context()) }, None).unwrap();
        assert!(inside);
    }

    #[test]
    fn test_context_restored_on_every_exit() {
        assert!(!in_sink_context());
        let _ = wait(async { Ok::<_, SinkError>(()) }, None);
        assert!(!in_sink_context());
        let _ = wait(
            std::future::pending::<Result<(), SinkError>>(),
            Some(Duration::from_millis(10)),
        );
        assert!(!in_sink_context());
        let _ = wait(explode(), None);
        assert!(!in_sink_context());
    }

    #[test]
    fn test_panicking_operation_is_reported_as_aborted() {
        let err = wait(explode(), None).unwrap_err();
        assert!(matches!(err, SinkError::Transport(TransportError::Aborted)));
    }

    #[tokio::test]
    async fn test_wait_from_current_thread_runtime_does_not_deadlock() {
        // The caller's single-threaded runtime is blocked for the whole wait;
        // the operation must still make progress elsewhere.
        let value = wait(
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, SinkError>("done")
            },
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(value, "done");
    }
}
