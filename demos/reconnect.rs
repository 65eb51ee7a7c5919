//! Reconnect Example
//!
//! Wires a flaky in-memory key/value "client" through `RetryExecutor`.
//! Shows:
//! - transparent reconnects when the link drops
//! - operation errors returned without retrying
//! - a cancelled context stopping the loop
//!
//! Run with: cargo run --example reconnect --features tracing

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;

use connretry::{Connector, Context, ContextError, RetryExecutor};

#[derive(Debug)]
enum KvError {
    LinkDown,
    Missing(String),
    Context(ContextError),
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvError::LinkDown => write!(f, "link down"),
            KvError::Missing(key) => write!(f, "no such key: {}", key),
            KvError::Context(err) => write!(f, "{}", err),
        }
    }
}

impl From<ContextError> for KvError {
    fn from(err: ContextError) -> Self {
        KvError::Context(err)
    }
}

struct KvClient {
    link: u32,
    served: u32,
    store: HashMap<String, String>,
}

impl KvClient {
    /// Each link serves two requests before it drops.
    fn get(&mut self, key: &str) -> Result<String, KvError> {
        self.served += 1;
        if self.served > 2 {
            return Err(KvError::LinkDown);
        }
        self.store
            .get(key)
            .cloned()
            .ok_or_else(|| KvError::Missing(key.to_string()))
    }
}

#[derive(Default)]
struct FlakyKv {
    opened: Cell<u32>,
}

impl Connector for FlakyKv {
    type Connection = KvClient;
    type Error = KvError;

    fn connect(&self) -> Result<KvClient, KvError> {
        let link = self.opened.get() + 1;
        self.opened.set(link);
        tracing::info!(link, "opened link");
        let store = HashMap::from([("greeting".to_string(), "hello".to_string())]);
        Ok(KvClient {
            link,
            served: 0,
            store,
        })
    }

    fn is_connection_error(&self, err: &KvError) -> bool {
        matches!(err, KvError::LinkDown)
    }
}

// ==================== Transparent Reconnect ====================

fn example_reconnect(executor: &mut RetryExecutor<&FlakyKv, KvClient>) {
    println!("\n=== Example 1: Transparent Reconnect ===");

    for _ in 0..5 {
        let result =
            executor.exec_with_retry(&Context::background(), |_, client| client.get("greeting"));
        match result {
            Ok(value) => println!("  got {:?} on link {}", value, executor.connection().link),
            Err(e) => println!("  failed: {}", e),
        }
    }
}

// ==================== Operation Errors ====================

fn example_operation_error(executor: &mut RetryExecutor<&FlakyKv, KvClient>) {
    println!("\n=== Example 2: Operation Errors Are Not Retried ===");

    let result = executor.exec_with_retry(&Context::background(), |_, client| client.get("missing"));
    println!("  result: {:?}", result.map_err(|e| e.to_string()));
}

// ==================== Cancellation ====================

fn example_cancellation(executor: &mut RetryExecutor<&FlakyKv, KvClient>) {
    println!("\n=== Example 3: Cancelled Context ===");

    let (ctx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    let result = executor.exec_with_retry(&ctx, |_, client| Ok(client.link));
    println!("  result: {:?}", result.map_err(|e| e.to_string()));
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("======================================");
    println!("          Reconnect Example           ");
    println!("======================================");

    let kv = FlakyKv::default();
    let mut executor = match RetryExecutor::new(&kv) {
        Ok(executor) => executor,
        Err(e) => {
            tracing::error!("initial connect failed: {}", e);
            return;
        }
    };
    executor.set_retry_limit(2);

    example_reconnect(&mut executor);
    example_operation_error(&mut executor);
    example_cancellation(&mut executor);

    let closed = executor.close(|client| {
        tracing::info!(link = client.link, "closing link");
        Ok::<_, KvError>(())
    });
    println!("\n  closed: {}", closed.is_ok());

    println!("\n======================================");
    println!("           Examples Complete           ");
    println!("======================================");
}
