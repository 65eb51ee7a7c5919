//! Unit tests for the retry/reconnect state machine.

use super::*;
use crate::testing::{ScriptedConnector, TestConnection, TestError};
use crate::{ContextError, DEFAULT_RETRY_LIMIT};
use std::time::Duration;

fn executor(connector: &ScriptedConnector) -> RetryExecutor<&ScriptedConnector, TestConnection> {
    RetryExecutor::new(connector).unwrap()
}

#[test]
fn test_new_opens_first_connection() {
    let connector = ScriptedConnector::new();
    let executor = executor(&connector);

    assert_eq!(executor.connection().id, 1);
    assert_eq!(executor.retry_limit(), DEFAULT_RETRY_LIMIT);
    assert_eq!(connector.connect_calls(), 1);
}

#[test]
fn test_new_propagates_initial_connect_error() {
    let connector = ScriptedConnector::new().fail_on(1);
    let result = RetryExecutor::new(&connector);

    assert_eq!(result.unwrap_err(), TestError::ConnectFailed(1));
}

#[test]
fn test_with_config_uses_configured_limit() {
    let connector = ScriptedConnector::new();
    let executor = RetryExecutor::with_config(&connector, RetryConfig::new(7)).unwrap();
    assert_eq!(executor.retry_limit(), 7);
}

#[test]
fn test_set_retry_limit_resets_non_positive() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);

    executor.set_retry_limit(10);
    assert_eq!(executor.retry_limit(), 10);

    executor.set_retry_limit(0);
    assert_eq!(executor.retry_limit(), DEFAULT_RETRY_LIMIT);

    executor.set_retry_limit(10);
    executor.set_retry_limit(-4);
    assert_eq!(executor.retry_limit(), DEFAULT_RETRY_LIMIT);
}

#[test]
fn test_succeeds_on_third_attempt_after_two_reconnects() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let mut attempts = 0;

    let result = executor.exec_with_retry(&Context::background(), |_, conn| {
        attempts += 1;
        if attempts < 3 {
            Err(TestError::ConnectionLost)
        } else {
            Ok(conn.id)
        }
    });

    assert_eq!(result, Ok(3));
    assert_eq!(attempts, 3);
    // 1 initial connect + 2 reconnects
    assert_eq!(connector.connect_calls(), 3);
    assert_eq!(executor.connection().id, 3);
}

#[test]
fn test_operation_error_is_not_retried() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let mut attempts = 0;

    let result = executor.exec_with_retry(&Context::background(), |_, _| {
        attempts += 1;
        Err::<(), _>(TestError::Operation("constraint violated".into()))
    });

    assert_eq!(result, Err(TestError::Operation("constraint violated".into())));
    assert_eq!(attempts, 1);
    assert_eq!(connector.connect_calls(), 1);
}

#[test]
fn test_exhaustion_returns_last_operation_error() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let mut attempts = 0;

    let result = executor.exec_with_retry(&Context::background(), |_, _| {
        attempts += 1;
        Err::<(), _>(TestError::ConnectionLost)
    });

    assert_eq!(result, Err(TestError::ConnectionLost));
    assert_eq!(attempts, 3);
    // The final failed attempt still reconnects before the loop ends
    assert_eq!(connector.connect_calls(), 4);
    assert_eq!(executor.connection().id, 4);
}

#[test]
fn test_limit_of_one_reconnects_but_does_not_retry() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector).with_retry_limit(1);
    let mut attempts = 0;

    let result = executor.exec_with_retry(&Context::background(), |_, _| {
        attempts += 1;
        Err::<(), _>(TestError::ConnectionLost)
    });

    assert_eq!(result, Err(TestError::ConnectionLost));
    assert_eq!(attempts, 1);
    assert_eq!(connector.connect_calls(), 2);
}

#[test]
fn test_reconnect_failure_stops_immediately() {
    let connector = ScriptedConnector::new().fail_on(2);
    let mut executor = executor(&connector);
    executor.set_retry_limit(5);
    let mut attempts = 0;

    let result = executor.exec_with_retry(&Context::background(), |_, _| {
        attempts += 1;
        Err::<(), _>(TestError::ConnectionLost)
    });

    assert_eq!(result, Err(TestError::ConnectFailed(2)));
    assert_eq!(attempts, 1);
    assert_eq!(connector.connect_calls(), 2);
    // The old connection is kept when a reconnect fails
    assert_eq!(executor.connection().id, 1);
}

#[test]
fn test_cancelled_context_skips_operation_and_connect() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let (ctx, cancel) = Context::background().with_cancel();
    cancel.cancel();
    let mut attempts = 0;

    let result = executor.exec_with_retry(&ctx, |_, _| {
        attempts += 1;
        Ok::<_, TestError>(())
    });

    assert_eq!(result, Err(TestError::Context(ContextError::Canceled)));
    assert_eq!(attempts, 0);
    assert_eq!(connector.connect_calls(), 1);
}

#[test]
fn test_expired_deadline_is_returned() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let ctx = Context::background().with_timeout(Duration::ZERO);

    let result = executor.exec_with_retry(&ctx, |_, _| Ok::<_, TestError>(()));

    assert_eq!(
        result,
        Err(TestError::Context(ContextError::DeadlineExceeded))
    );
}

#[test]
fn test_cancel_between_attempts_prevents_next_attempt() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let (ctx, cancel) = Context::background().with_cancel();
    let mut attempts = 0;

    let result = executor.exec_with_retry(&ctx, |_, _| {
        attempts += 1;
        // The operation observes the cancel but finishes its attempt
        cancel.cancel();
        Err::<(), _>(TestError::ConnectionLost)
    });

    assert_eq!(result, Err(TestError::Context(ContextError::Canceled)));
    assert_eq!(attempts, 1);
    // The reconnect for the failed attempt happened before the check
    assert_eq!(connector.connect_calls(), 2);
}

#[test]
fn test_operation_receives_context() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let ctx = Context::background().with_timeout(Duration::from_secs(3600));
    let expected = ctx.deadline();

    let seen = executor
        .exec_with_retry(&ctx, |ctx, _| Ok::<_, TestError>(ctx.deadline()))
        .unwrap();

    assert_eq!(seen, expected);
}

#[test]
fn test_exec_never_reconnects() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let mut attempts = 0;

    let result = executor.exec(&Context::background(), |_, _| {
        attempts += 1;
        Err::<(), _>(TestError::ConnectionLost)
    });

    assert_eq!(result, Err(TestError::ConnectionLost));
    assert_eq!(attempts, 1);
    assert_eq!(connector.connect_calls(), 1);
}

#[test]
fn test_exec_ignores_cancellation() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let (ctx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    let id = executor.exec(&ctx, |_, conn| Ok::<_, TestError>(conn.id));
    assert_eq!(id, Ok(1));
}

#[test]
fn test_exec_can_mutate_connection() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);

    executor
        .exec(&Context::background(), |_, conn| {
            conn.id = 42;
            Ok::<_, TestError>(())
        })
        .unwrap();

    assert_eq!(executor.connection().id, 42);
}

#[test]
fn test_close_passes_current_connection() {
    let connector = ScriptedConnector::new();
    let mut executor = executor(&connector);
    let _ = executor.exec_with_retry(&Context::background(), |_, _| {
        Err::<(), _>(TestError::ConnectionLost)
    });

    let mut closed = None;
    let result = executor.close(|conn| {
        closed = Some(conn.id);
        Ok::<_, TestError>(())
    });

    assert_eq!(result, Ok(()));
    assert_eq!(closed, Some(4));
}

#[test]
fn test_close_returns_release_error() {
    let connector = ScriptedConnector::new();
    let executor = executor(&connector);

    let result = executor.close(|_| Err(TestError::Operation("already closed".into())));
    assert_eq!(result, Err(TestError::Operation("already closed".into())));
}

#[test]
fn test_into_parts() {
    let connector = ScriptedConnector::new();
    let executor = executor(&connector);

    let (parts_connector, conn) = executor.into_parts();
    assert_eq!(conn.id, 1);
    assert_eq!(parts_connector.connect_calls(), 1);
}

#[cfg(feature = "tracing")]
mod tracing_events {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logs_reconnect_and_exhaustion() {
        let connector = ScriptedConnector::new();
        let mut executor = executor(&connector).with_retry_limit(2);

        let _ = executor.exec_with_retry(&Context::background(), |_, _| {
            Err::<(), _>(TestError::ConnectionLost)
        });

        assert!(logs_contain("connection-level failure, reconnecting"));
        assert!(logs_contain("retry limit exhausted"));
    }

    #[traced_test]
    #[test]
    fn test_logs_failed_reconnect() {
        let connector = ScriptedConnector::new().fail_on(2);
        let mut executor = executor(&connector);

        let _ = executor.exec_with_retry(&Context::background(), |_, _| {
            Err::<(), _>(TestError::ConnectionLost)
        });

        assert!(logs_contain("reconnect failed"));
    }

    #[traced_test]
    #[test]
    fn test_operation_errors_are_not_logged() {
        let connector = ScriptedConnector::new();
        let mut executor = executor(&connector);

        let _ = executor.exec_with_retry(&Context::background(), |_, _| {
            Err::<(), _>(TestError::Operation("bad input".into()))
        });

        assert!(!logs_contain("reconnecting"));
    }
}
