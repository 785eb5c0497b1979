use rpcstress_common::{Result, RpcError, RpcRequest, RpcResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// An abandoned attempt gives up its socket after this many call timeouts.
pub const ABANDONED_ATTEMPT_FACTOR: u32 = 4;

/// RpcStress client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Target node as a bare `host:port`.
    pub address: String,
    /// Bound on connection establishment and on every individual call.
    pub timeout: Duration,
}

/// One connection to an RPC service.
///
/// The underlying pool keeps at most one idle keep-alive connection, so a
/// `Client` driven sequentially behaves like a single long-lived duplex
/// connection.
pub struct Client {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl Client {
    /// Connect to `config.address`, failing with `RpcError::Connection` if the
    /// remote is unreachable or does not answer the health probe within
    /// `config.timeout`.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| RpcError::Connection(e.to_string()))?;

        let client = Self { config, http_client };
        client.handshake().await?;
        debug!(address = %client.config.address, "connected");
        Ok(client)
    }

    /// Build the URL for `path` against the configured address.
    pub fn build_url(&self, path: &str) -> String {
        format!("http://{}{}", self.config.address, path)
    }

    async fn handshake(&self) -> Result<()> {
        let url = self.build_url("/health");

        let response = tokio::time::timeout(self.config.timeout, self.http_client.get(&url).send())
            .await
            .map_err(|_| {
                RpcError::Connection(format!(
                    "timed out after {:?} connecting to {}",
                    self.config.timeout, self.config.address
                ))
            })?
            .map_err(|e| RpcError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Connection(format!("health check returned status: {}", status)));
        }
        Ok(())
    }

    /// Invoke `method` with `request` and decode the reply.
    ///
    /// The exchange runs on its own task and is raced against the configured
    /// timeout. When the deadline wins the attempt is abandoned, not cancelled:
    /// it may still reach the server, but its reply lands in storage owned by the
    /// abandoned task and is never observed by the caller. The attempt carries
    /// its own deadline of [`ABANDONED_ATTEMPT_FACTOR`] timeouts, after which the
    /// transport drops its connection.
    pub async fn call<Req, Rep>(&self, method: &str, request: &Req) -> Result<Rep>
    where
        Req: Serialize + ?Sized,
        Rep: DeserializeOwned,
    {
        let params = serde_json::to_value(request)
            .map_err(|e| RpcError::Application(format!("cannot encode request: {e}")))?;
        let envelope = RpcRequest { id: Uuid::new_v4().to_string(), method: method.to_string(), params };

        let attempt = tokio::spawn(send_request(
            self.http_client.clone(),
            self.build_url("/rpc"),
            envelope,
            self.config.timeout,
        ));

        let result = match tokio::time::timeout(self.config.timeout, attempt).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(RpcError::Network(format!("call task failed: {e}"))),
            Err(_) => {
                debug!(method, timeout = ?self.config.timeout, "call abandoned at deadline");
                return Err(RpcError::Timeout(self.config.timeout));
            }
        };

        serde_json::from_value(result).map_err(|e| RpcError::Application(format!("invalid reply: {e}")))
    }

    /// Release the connection. Consumes the client, so it can only happen once.
    pub fn close(self) {
        debug!(address = %self.config.address, "connection released");
        drop(self.http_client);
    }
}

async fn send_request(
    http_client: reqwest::Client,
    url: String,
    envelope: RpcRequest,
    timeout: Duration,
) -> Result<serde_json::Value> {
    let response = http_client
        .post(&url)
        .timeout(timeout.saturating_mul(ABANDONED_ATTEMPT_FACTOR))
        .json(&envelope)
        .send()
        .await
        .map_err(|e| classify_transport_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RpcError::Network(format!("server returned status: {}", status)));
    }

    let reply: RpcResponse = response
        .json()
        .await
        .map_err(|e| classify_transport_error(e, timeout))?;

    match reply.error {
        Some(error) => Err(RpcError::Application(error)),
        None => Ok(reply.result.unwrap_or(serde_json::Value::Null)),
    }
}

/// Map a transport failure onto the error taxonomy.
fn classify_transport_error(e: reqwest::Error, timeout: Duration) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout(timeout)
    } else if e.is_decode() {
        RpcError::Application(format!("invalid reply: {e}"))
    } else {
        RpcError::Network(e.to_string())
    }
}
