//! # connretry
//!
//! Run operations against a stateful connection, and when the connection
//! itself breaks, reconnect and try again a bounded number of times.
//!
//! The crate owns only the retry/reconnect state machine. What a connection
//! is, how it is opened, and which errors mean it is broken all come from a
//! caller-supplied [`Connector`].
//!
//! ## Quick Example
//!
//! ```rust
//! use connretry::{connector_fn, Context, ContextError, RetryExecutor};
//!
//! #[derive(Debug, PartialEq)]
//! enum DbError {
//!     Disconnected,
//!     NotFound,
//!     Context(ContextError),
//! }
//!
//! impl From<ContextError> for DbError {
//!     fn from(err: ContextError) -> Self {
//!         DbError::Context(err)
//!     }
//! }
//!
//! let connector = connector_fn(
//!     || Ok::<_, DbError>(vec!["row"]),
//!     |err| matches!(err, DbError::Disconnected),
//! );
//! let mut executor = RetryExecutor::new(connector)?;
//! executor.set_retry_limit(5);
//!
//! let ctx = Context::background();
//! let rows = executor.exec_with_retry(&ctx, |_, conn| Ok(conn.len()))?;
//! assert_eq!(rows, 1);
//!
//! // Operation-level errors come back untouched and are never retried
//! let missing = executor.exec_with_retry(&ctx, |_, _| Err::<(), _>(DbError::NotFound));
//! assert_eq!(missing, Err(DbError::NotFound));
//!
//! executor.close(|conn| {
//!     drop(conn);
//!     Ok::<_, DbError>(())
//! })?;
//! # Ok::<(), DbError>(())
//! ```
//!
//! ## Features
//!
//! - `async`: [`AsyncConnector`] and the `*_async` executor methods
//! - `tracing`: debug/warn events for reconnects, exhaustion and cancellation
//! - `serde`: `Serialize`/`Deserialize` for [`RetryConfig`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod connector;
pub mod context;
pub mod executor;
pub mod testing;

// Re-exports
pub use config::{RetryConfig, DEFAULT_RETRY_LIMIT};
#[cfg(feature = "async")]
pub use connector::AsyncConnector;
pub use connector::{connector_fn, Connector, FnConnector};
pub use context::{CancelHandle, Context, ContextError};
pub use executor::RetryExecutor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::RetryConfig;
    #[cfg(feature = "async")]
    pub use crate::connector::AsyncConnector;
    pub use crate::connector::{connector_fn, Connector};
    pub use crate::context::{Context, ContextError};
    pub use crate::executor::RetryExecutor;
}
