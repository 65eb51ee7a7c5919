//! Async execution for [`AsyncConnector`]s.
//!
//! Same state machine as the sync executor. Operations are async closures, and
//! the context is still polled only between attempts: racing an attempt
//! against [`Context::done`] is left to the operation.

use super::RetryExecutor;
use crate::config::RetryConfig;
use crate::connector::AsyncConnector;
use crate::context::Context;

impl<K: AsyncConnector> RetryExecutor<K, K::Connection> {
    /// Open the first connection asynchronously and build an executor.
    ///
    /// # Example
    ///
    /// ```rust
    /// use connretry::testing::{ScriptedConnector, TestConnection, TestError};
    /// use connretry::{Context, RetryExecutor};
    ///
    /// # tokio_test::block_on(async {
    /// let connector = ScriptedConnector::new();
    /// let mut executor = RetryExecutor::connect_async(&connector).await.unwrap();
    ///
    /// let id = executor
    ///     .exec_with_retry_async(&Context::background(), async |_: &Context, conn: &mut TestConnection| {
    ///         Ok::<_, TestError>(conn.id)
    ///     })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(id, 1);
    /// # });
    /// ```
    pub async fn connect_async(connector: K) -> Result<Self, K::Error> {
        Self::connect_async_with_config(connector, RetryConfig::default()).await
    }

    /// Like [`connect_async`](Self::connect_async), taking the retry limit
    /// from `config`.
    pub async fn connect_async_with_config(
        connector: K,
        config: RetryConfig,
    ) -> Result<Self, K::Error> {
        let conn = connector.connect().await?;
        Ok(Self::from_parts(connector, conn, config))
    }

    /// Async form of [`exec_with_retry`](RetryExecutor::exec_with_retry).
    pub async fn exec_with_retry_async<T, F>(
        &mut self,
        ctx: &Context,
        mut op: F,
    ) -> Result<T, K::Error>
    where
        F: AsyncFnMut(&Context, &mut K::Connection) -> Result<T, K::Error>,
    {
        let limit = self.retry_limit.get();
        let mut attempt = 1;

        loop {
            if let Some(err) = ctx.err() {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt, limit, reason = %err, "context done, not retrying");
                return Err(err.into());
            }

            let error = match op(ctx, &mut self.conn).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !self.connector.is_connection_error(&error) {
                return Err(error);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, limit, "connection-level failure, reconnecting");

            match self.connector.connect().await {
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
    /// Async form of [`exec`](RetryExecutor::exec).
    pub async fn exec_async<T, E, F>(&mut self, ctx: &Context, op: F) -> Result<T, E>
    where
        F: AsyncFnOnce(&Context, &mut C) -> Result<T, E>,
    {
        op(ctx, &mut self.conn).await
    }

    /// Async form of [`close`](RetryExecutor::close).
    pub async fn close_async<E, F>(self, close_fn: F) -> Result<(), E>
    where
        F: AsyncFnOnce(C) -> Result<(), E>,
    {
        close_fn(self.conn).await
    }
}
