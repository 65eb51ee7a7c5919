//! Testing utilities for code built on [`RetryExecutor`](crate::RetryExecutor).
//!
//! [`ScriptedConnector`] is a connector test double: it hands out numbered
//! connections, fails the connect calls you script, and counts every call so
//! tests can assert how many reconnects happened.
//!
//! # Example
//!
//! ```rust
//! use connretry::testing::{ScriptedConnector, TestError};
//! use connretry::{assert_connect_calls, Context, RetryExecutor};
//!
//! // The second connect (the first reconnect) fails
//! let connector = ScriptedConnector::new().fail_on(2);
//! let mut executor = RetryExecutor::new(&connector).unwrap();
//!
//! let result = executor.exec_with_retry(&Context::background(), |_, _| {
//!     Err::<(), _>(TestError::ConnectionLost)
//! });
//!
//! assert_eq!(result, Err(TestError::ConnectFailed(2)));
//! assert_connect_calls!(connector, 2);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::connector::Connector;
use crate::context::ContextError;

/// A connection handed out by [`ScriptedConnector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestConnection {
    /// 1-based number of the connect call that produced this connection.
    pub id: u32,
}

/// Error type used by [`ScriptedConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    /// The connection broke; the only connection-level variant.
    ConnectionLost,
    /// An operation failed for a reason unrelated to the connection.
    Operation(String),
    /// The connect call with this number was scripted to fail.
    ConnectFailed(u32),
    /// The context stopped the executor.
    Context(ContextError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Operation(msg) => write!(f, "operation failed: {}", msg),
            Self::ConnectFailed(call) => write!(f, "connect call {} failed", call),
            Self::Context(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for TestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContextError> for TestError {
    fn from(err: ContextError) -> Self {
        Self::Context(err)
    }
}

/// A scripted [`Connector`] for tests.
///
/// Every connect call is numbered from 1. Calls listed with
/// [`fail_on`](Self::fail_on), and every call from
/// [`fail_from`](Self::fail_from) onwards, return
/// [`TestError::ConnectFailed`]; the rest succeed with a [`TestConnection`]
/// carrying the call number. Only [`TestError::ConnectionLost`] is
/// classified as connection-level.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    calls: AtomicU32,
    failing: Vec<u32>,
    fail_from: Option<u32>,
}

impl ScriptedConnector {
    /// A connector whose connects always succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make connect call number `call` fail.
    pub fn fail_on(mut self, call: u32) -> Self {
        self.failing.push(call);
        self
    }

    /// Make connect call number `call` and every later call fail.
    pub fn fail_from(mut self, call: u32) -> Self {
        self.fail_from = Some(call);
        self
    }

    /// How many times `connect` has been called, construction included.
    pub fn connect_calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_connection(&self) -> Result<TestConnection, TestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted_failure =
            self.failing.contains(&call) || self.fail_from.is_some_and(|from| call >= from);
        if scripted_failure {
            Err(TestError::ConnectFailed(call))
        } else {
            Ok(TestConnection { id: call })
        }
    }
}

impl Connector for ScriptedConnector {
    type Connection = TestConnection;
    type Error = TestError;

    fn connect(&self) -> Result<TestConnection, TestError> {
        self.next_connection()
    }

    fn is_connection_error(&self, err: &TestError) -> bool {
        matches!(err, TestError::ConnectionLost)
    }
}

#[cfg(feature = "async")]
impl crate::connector::AsyncConnector for ScriptedConnector {
    type Connection = TestConnection;
    type Error = TestError;

    fn connect(
        &self,
    ) -> impl std::future::Future<Output = Result<TestConnection, TestError>> + Send {
        std::future::ready(self.next_connection())
    }

    fn is_connection_error(&self, err: &TestError) -> bool {
        matches!(err, TestError::ConnectionLost)
    }
}

/// Assert how many times a [`ScriptedConnector`] has been asked to connect.
///
/// # Example
///
/// ```rust
/// use connretry::testing::ScriptedConnector;
/// use connretry::{assert_connect_calls, RetryExecutor};
///
/// let connector = ScriptedConnector::new();
/// let _executor = RetryExecutor::new(&connector).unwrap();
/// assert_connect_calls!(connector, 1);
/// ```
#[macro_export]
macro_rules! assert_connect_calls {
    ($connector:expr, $expected:expr) => {{
        let actual = $connector.connect_calls();
        let expected: u32 = $expected;
        if actual != expected {
            panic!("Expected {} connect calls, got {}", expected, actual);
        }
    }};
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl Arbitrary for crate::config::RetryConfig {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(crate::config::RetryConfig::default()),
            any::<i64>().prop_map(crate::config::RetryConfig::new),
            (1u32..=32).prop_map(|retry_limit| crate::config::RetryConfig { retry_limit }),
        ]
        .boxed()
    }
}
