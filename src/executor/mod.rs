//! The reconnect-and-retry executor.
//!
//! [`RetryExecutor`] owns exactly one live connection. Operations run against
//! it; when an operation fails with an error the [`Connector`] classifies as
//! connection-level, the executor opens a fresh connection and runs the same
//! operation again, up to the retry limit.
//!
//! # Quick Start
//!
//! ```rust
//! use connretry::testing::{ScriptedConnector, TestError};
//! use connretry::{Context, RetryExecutor};
//!
//! let connector = ScriptedConnector::new();
//! let mut executor = RetryExecutor::new(&connector).unwrap();
//!
//! let mut attempts = 0;
//! let id = executor
//!     .exec_with_retry(&Context::background(), |_, conn| {
//!         attempts += 1;
//!         if attempts < 3 {
//!             Err(TestError::ConnectionLost)
//!         } else {
//!             Ok(conn.id)
//!         }
//!     })
//!     .unwrap();
//!
//! // Construction opened connection 1, two reconnects opened 2 and 3
//! assert_eq!(id, 3);
//! assert_eq!(connector.connect_calls(), 3);
//! ```
//!
//! # Error Surfacing
//!
//! The executor never wraps errors. Whatever failed (the first connect, an
//! operation, a reconnect, or the context) is returned to the caller as is.
//! Only errors the connector affirmatively classifies as connection-level are
//! retried.

use std::num::NonZeroU32;

use crate::config::{clamp_limit, RetryConfig};
use crate::connector::Connector;
use crate::context::Context;

#[cfg(feature = "async")]
mod async_exec;

/// Runs operations against a connection, reconnecting and retrying when the
/// connection breaks.
///
/// `K` is the connector and `C` the connection it produces. Mutating methods
/// take `&mut self`; sharing one executor between tasks requires the caller's
/// own lock.
#[derive(Debug)]
pub struct RetryExecutor<K, C> {
    connector: K,
    conn: C,
    retry_limit: NonZeroU32,
}

impl<K: Connector> RetryExecutor<K, K::Connection> {
    /// Open the first connection and build an executor around it.
    ///
    /// If the connect fails, the error is returned and no executor exists.
    /// The retry limit starts at [`DEFAULT_RETRY_LIMIT`](crate::DEFAULT_RETRY_LIMIT).
    pub fn new(connector: K) -> Result<Self, K::Error> {
        Self::with_config(connector, RetryConfig::default())
    }

    /// Like [`new`](Self::new), taking the retry limit from `config`.
    pub fn with_config(connector: K, config: RetryConfig) -> Result<Self, K::Error> {
        let conn = connector.connect()?;
        Ok(Self::from_parts(connector, conn, config))
    }

    /// Run `op`, reconnecting and retrying on connection-level failures.
    ///
    /// Each iteration first checks `ctx`; once it is cancelled or past its
    /// deadline the loop stops with the context's error, before running the
    /// operation or connecting again. An operation already in flight is not
    /// interrupted.
    ///
    /// Returns:
    /// - the operation's value on the first success
    /// - a non-connection operation error immediately, without retrying
    /// - a reconnect error immediately
    /// - the last operation error once the retry limit is used up
    ///
    /// A connection-level failure on the final attempt still reconnects, so
    /// the executor is left holding a fresh connection.
    ///
    /// # Example
    ///
    /// ```rust
    /// use connretry::testing::{ScriptedConnector, TestError};
    /// use connretry::{Context, RetryExecutor};
    ///
    /// let connector = ScriptedConnector::new();
    /// let mut executor = RetryExecutor::new(&connector).unwrap();
    ///
    /// // Operation-level errors are returned without retrying
    /// let result = executor.exec_with_retry(&Context::background(), |_, _| {
    ///     Err::<(), _>(TestError::Operation("bad query".into()))
    /// });
    ///
    /// assert_eq!(result, Err(TestError::Operation("bad query".into())));
    /// assert_eq!(connector.connect_calls(), 1);
    /// ```
    pub fn exec_with_retry<T, F>(&mut self, ctx: &Context, mut op: F) -> Result<T, K::Error>
    where
        F: FnMut(&Context, &mut K::Connection) -> Result<T, K::Error>,
    {
        let limit = self.retry_limit.get();
        let mut attempt = 1;

        loop {
            if let Some(err) = ctx.err() {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt, limit, reason = %err, "context done, not retrying");
                return Err(err.into());
            }

            let error = match op(ctx, &mut self.conn) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !self.connector.is_connection_error(&error) {
                return Err(error);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, limit, "connection-level failure, reconnecting");

            match self.connector.connect() {
                Ok(conn) => self.conn = conn,
                Err(reconnect_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt, limit, "reconnect failed");
                    return Err(reconnect_err);
                }
            }

            if attempt >= limit {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempts = attempt, "retry limit exhausted");
                return Err(error);
            }
            attempt += 1;
        }
    }
}

impl<K, C> RetryExecutor<K, C> {
    /// Change the maximum number of attempts per
    /// [`exec_with_retry`](Self::exec_with_retry) call.
    ///
    /// Zero and negative limits reset to the default of 3 instead of being
    /// rejected.
    ///
    /// # Example
    ///
    /// ```rust
    /// use connretry::testing::ScriptedConnector;
    /// use connretry::RetryExecutor;
    ///
    /// let mut executor = RetryExecutor::new(ScriptedConnector::new()).unwrap();
    ///
    /// executor.set_retry_limit(5);
    /// assert_eq!(executor.retry_limit(), 5);
    ///
    /// executor.set_retry_limit(0);
    /// assert_eq!(executor.retry_limit(), 3);
    /// ```
    pub fn set_retry_limit(&mut self, limit: i64) {
        self.retry_limit = clamp_limit(limit);
    }

    /// Builder form of [`set_retry_limit`](Self::set_retry_limit).
    pub fn with_retry_limit(mut self, limit: i64) -> Self {
        self.set_retry_limit(limit);
        self
    }

    /// The current retry limit.
    pub fn retry_limit(&self) -> u32 {
        self.retry_limit.get()
    }

    /// Run `op` once against the current connection.
    ///
    /// No classification, retry, reconnect or context check happens; the
    /// operation's result is returned untouched.
    pub fn exec<T, E, F>(&mut self, ctx: &Context, op: F) -> Result<T, E>
    where
        F: FnOnce(&Context, &mut C) -> Result<T, E>,
    {
        op(ctx, &mut self.conn)
    }

    /// Release the connection with `close_fn` and return its result.
    ///
    /// Consumes the executor, so nothing can run against the connection
    /// afterwards.
    pub fn close<E, F>(self, close_fn: F) -> Result<(), E>
    where
        F: FnOnce(C) -> Result<(), E>,
    {
        close_fn(self.conn)
    }

    /// The connector this executor reconnects with.
    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// The connection currently held.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Take the connector and connection apart without closing anything.
    pub fn into_parts(self) -> (K, C) {
        (self.connector, self.conn)
    }

    pub(crate) fn from_parts(connector: K, conn: C, config: RetryConfig) -> Self {
        Self {
            connector,
            conn,
            retry_limit: config.effective_limit(),
        }
    }
}

#[cfg(test)]
mod tests;
