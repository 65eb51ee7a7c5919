//! Async Reconnect Example
//!
//! Drives an `AsyncConnector` whose sessions time out after a while, and
//! shows an operation racing its work against the context so a deadline can
//! stop it mid-attempt.
//!
//! Run with: cargo run --example async_reconnect --features async,tracing

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use connretry::{AsyncConnector, Context, ContextError, RetryExecutor};

#[derive(Debug)]
enum RpcError {
    SessionExpired,
    Context(ContextError),
}

impl From<ContextError> for RpcError {
    fn from(err: ContextError) -> Self {
        RpcError::Context(err)
    }
}

struct Session {
    id: u32,
    expires: Instant,
}

#[derive(Default)]
struct RpcConnector {
    sessions: AtomicU32,
}

impl AsyncConnector for RpcConnector {
    type Connection = Session;
    type Error = RpcError;

    async fn connect(&self) -> Result<Session, RpcError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let id = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(id, "session established");
        Ok(Session {
            id,
            expires: Instant::now() + Duration::from_millis(30),
        })
    }

    fn is_connection_error(&self, err: &RpcError) -> bool {
        matches!(err, RpcError::SessionExpired)
    }
}

async fn call(ctx: &Context, session: &mut Session, work: Duration) -> Result<u32, RpcError> {
    if Instant::now() >= session.expires {
        return Err(RpcError::SessionExpired);
    }
    tokio::select! {
        reason = ctx.done() => Err(reason.into()),
        _ = tokio::time::sleep(work) => Ok(session.id),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let connector = RpcConnector::default();
    let mut executor = match RetryExecutor::connect_async(&connector).await {
        Ok(executor) => executor,
        Err(e) => {
            tracing::error!("initial connect failed: {:?}", e);
            return;
        }
    };

    println!("\n=== Example 1: Expired Session Is Replaced ===");
    tokio::time::sleep(Duration::from_millis(40)).await;
    let ctx = Context::background();
    let result = executor
        .exec_with_retry_async(&ctx, async |ctx: &Context, session: &mut Session| {
            call(ctx, session, Duration::from_millis(1)).await
        })
        .await;
    println!("  served by session {:?}", result);

    println!("\n=== Example 2: Deadline Stops A Slow Call ===");
    let ctx = Context::background().with_timeout(Duration::from_millis(10));
    let result = executor
        .exec_with_retry_async(&ctx, async |ctx: &Context, session: &mut Session| {
            call(ctx, session, Duration::from_secs(5)).await
        })
        .await;
    println!("  result: {:?}", result);

    let closed = executor
        .close_async(async |session: Session| {
            tracing::info!(id = session.id, "session closed");
            Ok::<_, RpcError>(())
        })
        .await;
    println!("\n  closed: {}", closed.is_ok());
}
