//! Timeout isolation for fallible pipeline stages.
//!
//! Every OCR, summarization and reasoning call runs on its own worker thread.
//! The caller waits at most `timeout` for the answer and then moves on. A worker
//! that misses its deadline is abandoned, not cancelled: it keeps running until
//! the stage returns on its own, and only then are its resources released.
//! `in_flight()` exposes how many workers (finished-but-unreported and abandoned
//! ones included) are still alive, so operators can see leaks from stuck stages.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of one timeout-bounded stage invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Success(T),
    TimedOut,
    Failed(String),
}

impl<T> StageOutcome<T> {
    /// The value on success, `None` for timeouts and failures.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::TimedOut | Self::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::TimedOut => "timed_out",
            Self::Failed(_) => "failed",
        }
    }
}

/// Runs stages on dedicated worker threads under a wall-clock deadline.
///
/// Cloning is cheap; clones share the in-flight gauge.
#[derive(Debug, Clone, Default)]
pub struct StageExecutor {
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the gauge when the worker closure is dropped, whether it ran or not.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StageExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stage workers currently alive.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Invoke `stage` exactly once on a fresh worker and wait up to `timeout`.
    ///
    /// `Err` results and panics inside the stage come back as `Failed`; a missed
    /// deadline comes back as `TimedOut`. Nothing is retried.
    pub fn run<T, E, F>(&self, name: &'static str, timeout: Duration, stage: F) -> StageOutcome<T>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let guard = InFlightGuard::enter(&self.in_flight);
        let started = Instant::now();

        let spawned = thread::Builder::new()
            .name(format!("stage-{name}"))
            .spawn(move || {
                let _guard = guard;
                let result = panic::catch_unwind(AssertUnwindSafe(stage));
                // The receiver is gone when the caller already gave up on us.
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            tracing::error!(stage = name, error = %e, "Failed to spawn stage worker");
            return StageOutcome::Failed(format!("worker spawn failed: {e}"));
        }

        let outcome = match rx.recv_timeout(timeout) {
            Ok(Ok(Ok(value))) => StageOutcome::Success(value),
            Ok(Ok(Err(e))) => StageOutcome::Failed(e.to_string()),
            Ok(Err(payload)) => StageOutcome::Failed(panic_message(payload.as_ref())),
            Err(RecvTimeoutError::Timeout) => StageOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => {
                StageOutcome::Failed("worker exited without reporting".into())
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            StageOutcome::Success(_) => {
                tracing::debug!(stage = name, elapsed_ms, "Stage completed");
            }
            StageOutcome::TimedOut => {
                tracing::warn!(
                    stage = name,
                    timeout_ms = timeout.as_millis() as u64,
                    in_flight = self.in_flight(),
                    "Stage timed out, worker abandoned"
                );
            }
            StageOutcome::Failed(reason) => {
                tracing::warn!(stage = name, elapsed_ms, reason = %reason, "Stage failed");
            }
        }

        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("stage panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("stage panicked: {s}")
    } else {
        "stage panicked".into()
    }
}
