//! Cancellation-aware execution context.
//!
//! A [`Context`] is handed to every operation the executor runs. It carries a
//! cancellation signal and an optional deadline. The executor only polls it
//! between attempts; an operation that wants to stop mid-flight must watch the
//! context itself.
//!
//! # Example
//!
//! ```rust
//! use connretry::{Context, ContextError};
//!
//! let (ctx, cancel) = Context::background().with_cancel();
//! assert!(ctx.err().is_none());
//!
//! cancel.cancel();
//! assert_eq!(ctx.err(), Some(ContextError::Canceled));
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Why a [`Context`] is no longer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextError {
    /// The context, or one of its parents, was cancelled.
    Canceled,
    /// The context's deadline has passed.
    DeadlineExceeded,
}

impl ContextError {
    /// Returns true if this is an explicit cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns true if this is a deadline expiry.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => write!(f, "context canceled"),
            Self::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

impl std::error::Error for ContextError {}

/// A cancellation scope with an optional deadline.
///
/// Contexts form a tree: children derived with [`with_cancel`](Self::with_cancel)
/// observe their parent's cancellation, and children derived with
/// [`with_deadline`](Self::with_deadline) keep the earlier of the two deadlines.
/// Cloning is cheap and clones share the same signal.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

/// Cancels the [`Context`] it was created with.
///
/// Dropping the handle does not cancel anything.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Cancel the associated context and all of its descendants.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once [`cancel`](Self::cancel) has been called, or the
    /// parent context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. a server's shutdown token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a child context together with a handle that cancels it.
    ///
    /// Cancelling the child leaves the parent untouched.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token = self.token.child_token();
        let child = Self {
            token: token.clone(),
            deadline: self.deadline,
        };
        (child, CancelHandle { token })
    }

    /// Derive a child context that expires at `deadline`.
    ///
    /// If the parent already expires earlier, the parent's deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent <= deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.clone(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    /// The instant after which this context reports
    /// [`ContextError::DeadlineExceeded`], if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why this context is done, or `None` while it is still live.
    ///
    /// Cancellation wins over deadline expiry when both apply.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns true once the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Wait until the context is done and report why.
    ///
    /// Long-running async operations can race their work against this to
    /// honor cancellation that fires mid-attempt.
    #[cfg(feature = "async")]
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                let deadline = tokio::time::Instant::from_std(deadline);
                tokio::select! {
                    _ = self.token.cancelled() => ContextError::Canceled,
                    _ = tokio::time::sleep_until(deadline) => {
                        self.err().unwrap_or(ContextError::DeadlineExceeded)
                    }
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }
}
