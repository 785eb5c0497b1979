use rpcstress_client::ClientConfig;
use rpcstress_common::DEFAULT_METHOD;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:1234";
pub const DEFAULT_TOTAL_REQUESTS: u64 = 1_000;
pub const DEFAULT_CONCURRENCY: usize = 50;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on workers, and on the timed-mode spawn rate per second.
pub const MAX_CONCURRENCY: usize = 100_000;

/// A bound violated by a [`Config`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("total requests must be at least 1")]
    NoRequests,

    #[error("concurrency must be at least 1")]
    NoWorkers,

    #[error("concurrency must be at most {}", MAX_CONCURRENCY)]
    TooManyWorkers,

    #[error("server address must not be empty")]
    EmptyAddress,

    #[error("RPC method must not be empty")]
    EmptyMethod,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("run duration must be greater than zero when set")]
    ZeroDuration,
}

/// Parameters of one stress run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Target node as `host:port`.
    pub server_address: String,
    /// Calls to issue across all workers. Ignored when `duration` is set.
    pub total_requests: u64,
    /// Number of workers, each holding one connection.
    pub concurrency: usize,
    pub method: String,
    /// Bound on connection establishment and on each call.
    pub timeout: Duration,
    /// Run for this long instead of a fixed number of requests.
    pub duration: Option<Duration>,
    /// JSON file replacing the default request.
    pub payload_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            total_requests: DEFAULT_TOTAL_REQUESTS,
            concurrency: DEFAULT_CONCURRENCY,
            method: DEFAULT_METHOD.to_string(),
            timeout: DEFAULT_TIMEOUT,
            duration: None,
            payload_file: None,
        }
    }
}

impl Config {
    /// Check every bound; the first violation wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_requests < 1 {
            return Err(ConfigError::NoRequests);
        }
        if self.concurrency < 1 {
            return Err(ConfigError::NoWorkers);
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::TooManyWorkers);
        }
        if self.server_address.trim().is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        if self.method.trim().is_empty() {
            return Err(ConfigError::EmptyMethod);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.duration.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroDuration);
        }
        Ok(())
    }

    /// Connection settings handed to every worker's client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig { address: self.server_address.clone(), timeout: self.timeout }
    }
}
