use rpcstress_common::RpcError;
use rpcstress_harness::worker::{Connection, Connector};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Responder = dyn Fn(u64) -> Result<Value, RpcError> + Send + Sync;

/// In-memory connector whose connections answer after a fixed latency.
/// Clones share counters, so a test can keep one clone and hand the other to a runner.
#[derive(Clone)]
pub struct FakeConnector {
    inner: Arc<Inner>,
}

struct Inner {
    latency: Duration,
    failing_connects: AtomicUsize,
    responder: Box<Responder>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    calls: AtomicU64,
}

#[allow(dead_code)]
impl FakeConnector {
    /// Every call succeeds with the product of the default payload (5 * 3).
    pub fn new() -> Self {
        Self::build(Duration::ZERO, 0, Box::new(|_| Ok(json!({ "result": 15 }))))
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        let inner = Arc::into_inner(self.inner).expect("configure before sharing");
        Self::build(latency, inner.failing_connects.into_inner(), inner.responder)
    }

    /// The first `n` connection attempts fail.
    pub fn failing_first(self, n: usize) -> Self {
        let inner = Arc::into_inner(self.inner).expect("configure before sharing");
        Self::build(inner.latency, n, inner.responder)
    }

    /// Answer call number `i` (0-based, counted across all connections) with `f(i)`.
    pub fn responding(self, f: impl Fn(u64) -> Result<Value, RpcError> + Send + Sync + 'static) -> Self {
        let inner = Arc::into_inner(self.inner).expect("configure before sharing");
        Self::build(inner.latency, inner.failing_connects.into_inner(), Box::new(f))
    }

    fn build(latency: Duration, failing_connects: usize, responder: Box<Responder>) -> Self {
        Self {
            inner: Arc::new(Inner {
                latency,
                failing_connects: AtomicUsize::new(failing_connects),
                responder,
                connects: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                calls: AtomicU64::new(0),
            }),
        }
    }

    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> u64 {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

pub struct FakeConnection {
    inner: Arc<Inner>,
}

impl Connector for FakeConnector {
    type Connection = FakeConnection;

    async fn connect(&self) -> Result<FakeConnection, RpcError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let refuse = self
            .inner
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refuse {
            return Err(RpcError::Connection("connection refused".to_string()));
        }
        Ok(FakeConnection { inner: Arc::clone(&self.inner) })
    }
}

impl Connection for FakeConnection {
    async fn call(&mut self, _method: &str, _request: &Value) -> Result<Value, RpcError> {
        let n = self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if !self.inner.latency.is_zero() {
            tokio::time::sleep(self.inner.latency).await;
        }
        (self.inner.responder)(n)
    }

    fn close(self) {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
    }
}
