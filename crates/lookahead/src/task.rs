//! A cancelable, one-shot asynchronous computation.
//!
//! [`Task`] wraps a closure that is started on the current tokio runtime as
//! soon as the task is constructed. Its outcome is delivered through a
//! single-slot channel and can be retrieved exactly once with
//! [`Task::get`], which waits at most a caller-supplied timeout.
//!
//! ## Lifecycle
//!
//! ```text
//!            closure returns            get() observes outcome
//! Running ──────────────────▶ Completed ─────────────────────▶ closed
//!    │
//!    │ cancel()
//!    ▼
//! Canceled (closed)
//! ```
//!
//! A timed out [`Task::get`] leaves the task open so the caller may wait again.
//! Closing the task's [`CancellationToken`] from outside (a parent scope) ends
//! the computation and the next `get` reports [`Error::ContextClosed`].

use crate::Error;
use core::{fmt, time::Duration};
use portable_atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, oneshot},
    time::{Instant, sleep_until, timeout_at},
};
use tokio_util::sync::CancellationToken;

const RUNNING: u8 = 0;
const COMPLETED: u8 = 1;
const CANCELED: u8 = 2;

type Slot<R, E> = Option<oneshot::Receiver<core::result::Result<R, E>>>;

/// A handle to a single background computation producing `R` or failing
/// with `E`.
///
/// The handle is the only way to interact with the computation. Dropping it
/// does not stop the computation; call [`Task::cancel`] for that.
pub struct Task<R, E> {
    scope: CancellationToken,
    state: Arc<AtomicU8>,
    closed: AtomicBool,
    outcome: Mutex<Slot<R, E>>,
}

impl<R, E> Task<R, E>
where
    R: Send + 'static,
    E: Send + 'static,
{
    /// Starts `computation` immediately under a fresh cancellation scope.
    ///
    /// The closure receives the task's [`CancellationToken`] and should stop
    /// promptly once it is cancelled. Regardless of that, the future it
    /// returns is dropped as soon as the scope closes.
    ///
    /// # Panics
    ///
    /// Panics when called outside the context of a tokio runtime.
    pub fn spawn<F, Fut>(computation: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = core::result::Result<R, E>> + Send + 'static,
    {
        Self::spawn_scoped(CancellationToken::new(), computation)
    }

    /// Starts `computation` under a child of `parent`.
    ///
    /// Cancelling `parent` closes this task's scope; cancelling this task
    /// never affects `parent` or its other children.
    pub fn spawn_with_parent<F, Fut>(parent: &CancellationToken, computation: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = core::result::Result<R, E>> + Send + 'static,
    {
        Self::spawn_scoped(parent.child_token(), computation)
    }

    fn spawn_scoped<F, Fut>(scope: CancellationToken, computation: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = core::result::Result<R, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(AtomicU8::new(RUNNING));

        let fut = computation(scope.clone());
        let runner_scope = scope.clone();
        let runner_state = Arc::clone(&state);

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = runner_scope.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Task scope closed before the computation finished");
                    return;
                }
                outcome = fut => outcome,
            };

            // Losing this race means `cancel` got there first and the outcome
            // must not be observable.
            if runner_state
                .compare_exchange(RUNNING, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
                && tx.send(outcome).is_err()
            {
                #[cfg(feature = "tracing")]
                tracing::trace!("Task outcome dropped, receiver already closed");
            }
        });

        Self {
            scope,
            state,
            closed: AtomicBool::new(false),
            outcome: Mutex::new(Some(rx)),
        }
    }
}

impl<R, E> Task<R, E> {
    /// Waits up to `timeout` for the computation's outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::Canceled`] if [`Task::cancel`] ran before completion.
    /// - [`Error::AlreadyCompleted`] if a previous call already consumed the
    ///   outcome.
    /// - [`Error::TimeoutExpired`] if nothing arrived in time. The task stays
    ///   open and the computation keeps running.
    /// - [`Error::ContextClosed`] if the cancellation scope closed from
    ///   outside.
    /// - [`Error::Task`] if the computation returned an error.
    pub async fn get(&self, timeout: Duration) -> Result<R, Error<E>> {
        if self.is_cancelled() {
            return Err(Error::Canceled);
        }
        if self.is_closed() {
            return Err(Error::AlreadyCompleted);
        }

        // Waiting behind another `get` counts against this caller's timeout.
        let deadline = Instant::now() + timeout;
        let Ok(mut slot) = timeout_at(deadline, self.outcome.lock()).await else {
            return Err(Error::TimeoutExpired);
        };

        // A concurrent `get` or `cancel` may have finalized the task while we
        // waited for the slot.
        if self.is_cancelled() {
            return Err(Error::Canceled);
        }
        let Some(rx) = slot.as_mut() else {
            return Err(Error::AlreadyCompleted);
        };

        let delivered = tokio::select! {
            biased;
            delivered = rx => delivered.ok(),
            () = self.scope.cancelled() => None,
            () = sleep_until(deadline) => return Err(Error::TimeoutExpired),
        };

        slot.take();
        self.closed.store(true, Ordering::Release);

        match delivered {
            Some(Ok(value)) => Ok(value),
            Some(Err(cause)) => Err(Error::Task(cause)),
            None if self.is_cancelled() => Err(Error::Canceled),
            None => Err(Error::ContextClosed),
        }
    }

    /// Cancels the computation unless it already completed, was canceled or
    /// was closed by a previous [`Task::get`].
    ///
    /// Cancellation closes the task: every later [`Task::get`] returns
    /// [`Error::Canceled`].
    pub fn cancel(&self) {
        if self.is_closed()
            || self
                .state
                .compare_exchange(RUNNING, CANCELED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return;
        }

        self.scope.cancel();
        self.closed.store(true, Ordering::Release);

        // A `get` in flight holds the slot and releases it itself once it sees
        // the scope close.
        if let Ok(mut slot) = self.outcome.try_lock() {
            slot.take();
        }
    }

    /// Returns `true` once the computation has returned, whether or not its
    /// outcome was retrieved.
    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETED
    }

    /// Returns `true` if [`Task::cancel`] took effect.
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELED
    }

    /// Returns `true` once the task can no longer deliver an outcome.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The task's cancellation scope.
    ///
    /// Useful for deriving child scopes that should end with this task.
    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }
}

impl<R, E> fmt::Debug for Task<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("completed", &self.is_completed())
            .field("canceled", &self.is_cancelled())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
