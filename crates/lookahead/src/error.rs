//! Error types for tasks and the prefetcher.
//!
//! This module defines the central [`Error`] enum, which separates the three
//! ways a caller can fail to obtain a task's value:
//!
//! - the computation itself failed ([`Error::Task`], cause preserved);
//! - the value was not available in time ([`Error::TimeoutExpired`]);
//! - the task's scope ended ([`Error::ContextClosed`], [`Error::Canceled`]).
//!
//! It also carries the caller-protocol error [`Error::AlreadyCompleted`] and the
//! construction errors raised by [`crate::Cards::new`].

use core::convert::Infallible;

/// A result type whose error defaults to an [`Error`] without a computation
/// cause.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All possible errors that `lookahead` can produce.
///
/// The generic parameter `E` is the error type of the task's computation and
/// only appears in the [`Error::Task`] variant. Errors that can never carry a
/// computation cause use the default `Infallible`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error<E = Infallible> {
    /// The task's cancellation scope closed before an outcome arrived, for
    /// example because a parent scope was torn down.
    #[error("task context closed")]
    ContextClosed,

    /// The caller's wait elapsed. The computation keeps running and a later
    /// `get` may still observe its outcome.
    #[error("timeout expired")]
    TimeoutExpired,

    /// The computation returned an error.
    #[error("task failed: {0}")]
    Task(#[source] E),

    /// The task's single outcome was already retrieved.
    #[error("task is completed")]
    AlreadyCompleted,

    /// The task was canceled before it completed.
    #[error("task is canceled")]
    Canceled,

    /// A tokio runtime is required but none is running on this thread.
    #[error("no tokio runtime available: {reason}")]
    NoRuntime { reason: String },

    /// The supplied configuration was rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl<E> Error<E> {
    /// Returns `true` when retrying the same call later can still succeed.
    ///
    /// Only [`Error::TimeoutExpired`] leaves the task open.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TimeoutExpired)
    }

    /// Returns the computation's error if this is [`Error::Task`].
    pub const fn cause(&self) -> Option<&E> {
        match self {
            Self::Task(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the error and returns the computation's error, if any.
    pub fn into_cause(self) -> Option<E> {
        match self {
            Self::Task(e) => Some(e),
            _ => None,
        }
    }
}

impl Error {
    /// Lifts a cause-free error into any `Error<E>`.
    pub fn widen<E>(self) -> Error<E> {
        match self {
            Self::ContextClosed => Error::ContextClosed,
            Self::TimeoutExpired => Error::TimeoutExpired,
            Self::Task(never) => match never {},
            Self::AlreadyCompleted => Error::AlreadyCompleted,
            Self::Canceled => Error::Canceled,
            Self::NoRuntime { reason } => Error::NoRuntime { reason },
            Self::InvalidConfig { reason } => Error::InvalidConfig { reason },
        }
    }
}

/// A failed call to a [`crate::SentenceSource`].
///
/// Fetch failures are retried inside a word's task and only the last one
/// surfaces, wrapped in [`Error::Task`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("fetching sentences for `{word}` failed: {message}")]
pub struct FetchError {
    /// The word whose sentences were requested.
    pub word: String,
    /// Human readable description from the remote collaborator.
    pub message: String,
    /// Hint from the source that the failure is likely to clear up on its
    /// own (network blip, rate limit).
    pub transient: bool,
}

impl FetchError {
    pub fn transient(word: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            message: message.into(),
            transient: true,
        }
    }

    pub fn permanent(word: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            message: message.into(),
            transient: false,
        }
    }
}
