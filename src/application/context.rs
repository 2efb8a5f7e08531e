//! Request-scoped deadline and cancellation.
//!
//! Every suspension point in a validation races its work against
//! [`RequestContext::done`], so that a request never outlives its budget and
//! no task it spawned is left behind.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("cancelled")]
    Cancelled,
}

/// Caller-side handle that cancels every context derived from it.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationHandle {
    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Deadline plus cancellation signal, cheap to clone into spawned tasks.
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Instant,
    cancelled: watch::Receiver<bool>,
    // Keeps the channel open for as long as any context exists, so a closed
    // channel is never mistaken for a cancellation.
    _sender: Arc<watch::Sender<bool>>,
}

impl RequestContext {
    /// New root context expiring after `timeout`.
    pub fn with_timeout(timeout: Duration) -> (Self, CancellationHandle) {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// New root context expiring at `deadline`.
    pub fn with_deadline(deadline: Instant) -> (Self, CancellationHandle) {
        let (sender, cancelled) = watch::channel(false);
        let sender = Arc::new(sender);
        let ctx = Self {
            deadline,
            cancelled,
            _sender: sender.clone(),
        };
        (ctx, CancellationHandle { sender })
    }

    /// Derived context sharing this one's cancellation, with a deadline no
    /// later than `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let mut child = self.clone();
        child.deadline = self.deadline.min(Instant::now() + timeout);
        child
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline (zero once passed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Non-blocking check. Cancellation takes precedence over the deadline.
    pub fn check(&self) -> Option<ContextError> {
        if *self.cancelled.borrow() {
            Some(ContextError::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&mut self) -> ContextError {
        if let Some(reason) = self.check() {
            return reason;
        }
        tokio::select! {
            biased;
            _ = self.cancelled.wait_for(|cancelled| *cancelled) => ContextError::Cancelled,
            _ = tokio::time::sleep_until(self.deadline) => ContextError::DeadlineExceeded,
        }
    }

    /// Runs `fut` unless the context finishes first, in which case `fut` is
    /// dropped.
    pub async fn run<F>(&mut self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(reason) = self.check() {
            return Err(reason);
        }
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            output = fut => Ok(output),
        }
    }
}
