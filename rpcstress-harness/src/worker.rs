use rpcstress_client::{Client, ClientConfig};
use rpcstress_common::RpcError;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::metrics::Outcome;
use crate::payload::Payload;

/// Opens the connection each worker owns for its whole lifetime.
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection, RpcError>> + Send;
}

/// A connection used by exactly one worker, one call at a time.
pub trait Connection: Send + 'static {
    fn call(&mut self, method: &str, request: &Value) -> impl Future<Output = Result<Value, RpcError>> + Send;

    fn close(self);
}

/// Connects real RPC [`Client`]s.
#[derive(Debug, Clone)]
pub struct ClientConnector {
    config: ClientConfig,
}

impl ClientConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Connector for ClientConnector {
    type Connection = Client;

    async fn connect(&self) -> Result<Client, RpcError> {
        Client::connect(self.config.clone()).await
    }
}

impl Connection for Client {
    async fn call(&mut self, method: &str, request: &Value) -> Result<Value, RpcError> {
        let reply: Value = Client::call(&*self, method, request).await?;
        Ok(reply)
    }

    fn close(self) {
        Client::close(self)
    }
}

/// Issues `requests` sequential calls over one connection.
pub struct Worker<C: Connector> {
    pub id: usize,
    pub requests: u64,
    pub connector: Arc<C>,
    pub method: Arc<str>,
    pub payload: Arc<Payload>,
}

impl<C: Connector> Worker<C> {
    /// Run every assigned call and send one [`Outcome`] per call to `results`.
    ///
    /// If the connection cannot be established, every assigned request is
    /// reported as a connection failure instead. Returns the number of outcomes sent.
    pub async fn run(self, results: mpsc::Sender<Outcome>) -> u64 {
        if self.requests == 0 {
            return 0;
        }

        let mut connection = match self.connector.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(worker = self.id, requests = self.requests, error = %e, "connection failed");
                return self.report_connection_failure(connection_error(e), &results).await;
            }
        };

        let mut sent = 0;
        for _ in 0..self.requests {
            let start = Instant::now();
            let result = connection.call(&self.method, self.payload.request()).await;
            let duration = start.elapsed();

            let error = result.and_then(|reply| self.payload.verify(&reply)).err();
            if let Some(e) = &error {
                debug!(worker = self.id, error = %e, "call failed");
            }

            if results.send(Outcome { duration, error }).await.is_err() {
                warn!(worker = self.id, "result channel closed; stopping early");
                break;
            }
            sent += 1;
        }

        connection.close();
        debug!(worker = self.id, sent, "worker finished");
        sent
    }

    async fn report_connection_failure(&self, error: RpcError, results: &mpsc::Sender<Outcome>) -> u64 {
        let mut sent = 0;
        for _ in 0..self.requests {
            if results.send(Outcome::failure(Duration::ZERO, error.clone())).await.is_err() {
                warn!(worker = self.id, "result channel closed; stopping early");
                break;
            }
            sent += 1;
        }
        sent
    }
}

/// Failures while connecting are always classified as connection failures.
fn connection_error(e: RpcError) -> RpcError {
    match e {
        RpcError::Connection(_) => e,
        other => RpcError::Connection(other.to_string()),
    }
}
