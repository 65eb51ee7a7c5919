//! The connection-producing collaborator.
//!
//! A [`Connector`] knows two things: how to open a connection, and whether a
//! given error means the connection it produced is broken. The executor
//! relies on nothing else.
//!
//! Connectors are used only through `&self`, so a shared connector can be
//! passed as `&K`, `Arc<K>` or `Box<K>` without handing ownership to the
//! executor.

use std::sync::Arc;

use crate::context::ContextError;

/// Opens connections and classifies their failures.
///
/// Classification must be deterministic: the same kind of error must always
/// be classified the same way, or retry behavior becomes unpredictable.
///
/// # Example
///
/// ```rust
/// use connretry::{Connector, ContextError};
///
/// #[derive(Debug, PartialEq)]
/// enum DbError {
///     Disconnected,
///     Syntax,
///     Context(ContextError),
/// }
///
/// impl From<ContextError> for DbError {
///     fn from(err: ContextError) -> Self {
///         DbError::Context(err)
///     }
/// }
///
/// struct Db;
///
/// impl Connector for Db {
///     type Connection = u32;
///     type Error = DbError;
///
///     fn connect(&self) -> Result<u32, DbError> {
///         Ok(1)
///     }
///
///     fn is_connection_error(&self, err: &DbError) -> bool {
///         matches!(err, DbError::Disconnected)
///     }
/// }
///
/// assert!(Db.is_connection_error(&DbError::Disconnected));
/// assert!(!Db.is_connection_error(&DbError::Syntax));
/// ```
pub trait Connector {
    /// The connection value handed to operations.
    type Connection;

    /// Error produced by connecting and by operations.
    ///
    /// Context cancellation is surfaced through this type as well.
    type Error: From<ContextError>;

    /// Open a new connection.
    fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Returns true if `err` means the connection must be replaced.
    fn is_connection_error(&self, err: &Self::Error) -> bool;
}

impl<K: Connector + ?Sized> Connector for &K {
    type Connection = K::Connection;
    type Error = K::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        (**self).connect()
    }

    fn is_connection_error(&self, err: &Self::Error) -> bool {
        (**self).is_connection_error(err)
    }
}

impl<K: Connector + ?Sized> Connector for Arc<K> {
    type Connection = K::Connection;
    type Error = K::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        (**self).connect()
    }

    fn is_connection_error(&self, err: &Self::Error) -> bool {
        (**self).is_connection_error(err)
    }
}

impl<K: Connector + ?Sized> Connector for Box<K> {
    type Connection = K::Connection;
    type Error = K::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        (**self).connect()
    }

    fn is_connection_error(&self, err: &Self::Error) -> bool {
        (**self).is_connection_error(err)
    }
}

/// A [`Connector`] built from two closures.
///
/// Created by [`connector_fn`].
#[derive(Clone)]
pub struct FnConnector<F, P> {
    connect: F,
    classify: P,
}

impl<F, P> std::fmt::Debug for FnConnector<F, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnConnector").finish_non_exhaustive()
    }
}

/// Build a connector from a connect function and an error classifier.
///
/// # Example
///
/// ```rust
/// use connretry::{connector_fn, Context, ContextError, RetryExecutor};
///
/// #[derive(Debug, PartialEq)]
/// enum Error {
///     Lost,
///     Context(ContextError),
/// }
///
/// impl From<ContextError> for Error {
///     fn from(err: ContextError) -> Self {
///         Error::Context(err)
///     }
/// }
///
/// let connector = connector_fn(|| Ok::<_, Error>(String::from("conn")), |e| *e == Error::Lost);
/// let mut executor = RetryExecutor::new(connector).unwrap();
///
/// let len = executor
///     .exec_with_retry(&Context::background(), |_, conn| Ok(conn.len()))
///     .unwrap();
/// assert_eq!(len, 4);
/// ```
pub fn connector_fn<F, P, C, E>(connect: F, classify: P) -> FnConnector<F, P>
where
    F: Fn() -> Result<C, E>,
    P: Fn(&E) -> bool,
    E: From<ContextError>,
{
    FnConnector { connect, classify }
}

impl<F, P, C, E> Connector for FnConnector<F, P>
where
    F: Fn() -> Result<C, E>,
    P: Fn(&E) -> bool,
    E: From<ContextError>,
{
    type Connection = C;
    type Error = E;

    fn connect(&self) -> Result<C, E> {
        (self.connect)()
    }

    fn is_connection_error(&self, err: &E) -> bool {
        (self.classify)(err)
    }
}

/// Async counterpart of [`Connector`].
///
/// Available with the `async` feature. Classification stays synchronous;
/// only opening a connection may suspend.
#[cfg(feature = "async")]
pub trait AsyncConnector {
    /// The connection value handed to operations.
    type Connection;

    /// Error produced by connecting and by operations.
    type Error: From<ContextError>;

    /// Open a new connection.
    fn connect(&self) -> impl std::future::Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// Returns true if `err` means the connection must be replaced.
    fn is_connection_error(&self, err: &Self::Error) -> bool;
}

#[cfg(feature = "async")]
impl<K: AsyncConnector + ?Sized> AsyncConnector for &K {
    type Connection = K::Connection;
    type Error = K::Error;

    fn connect(&self) -> impl std::future::Future<Output = Result<Self::Connection, Self::Error>> + Send {
        (**self).connect()
    }

    fn is_connection_error(&self, err: &Self::Error) -> bool {
        (**self).is_connection_error(err)
    }
}

#[cfg(feature = "async")]
impl<K: AsyncConnector + ?Sized> AsyncConnector for Arc<K> {
    type Connection = K::Connection;
    type Error = K::Error;

    fn connect(&self) -> impl std::future::Future<Output = Result<Self::Connection, Self::Error>> + Send {
        (**self).connect()
    }

    fn is_connection_error(&self, err: &Self::Error) -> bool {
        (**self).is_connection_error(err)
    }
}
