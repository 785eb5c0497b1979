use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Method served by the reference server and called by default.
pub const DEFAULT_METHOD: &str = "Arithmetic.Multiply";

/// Error types surfaced by a single RPC attempt
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Application error: {0}")]
    Application(String),
}

/// Coarse classification of an [`RpcError`], used to break error counts down by cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Connection,
    Timeout,
    Network,
    Application,
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Connection(_) => ErrorKind::Connection,
            RpcError::Timeout(_) => ErrorKind::Timeout,
            RpcError::Network(_) => ErrorKind::Network,
            RpcError::Application(_) => ErrorKind::Application,
        }
    }
}

impl ErrorKind {
    pub fn as_name(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::Application => "application",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_name())
    }
}

/// Operands of the default `Arithmetic.Multiply` call.
///
/// Accepts the capitalised `A`/`B` field names as well, so payload files written
/// for other RPC stress tools decode unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Args {
    #[serde(alias = "A")]
    pub a: i64,
    #[serde(alias = "B")]
    pub b: i64,
}

/// Reply of the default `Arithmetic.Multiply` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(alias = "Result")]
    pub result: i64,
}

/// JSON envelope sent as the body of `POST /rpc`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON envelope returned by the server for every `POST /rpc`.
/// Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self { id: id.into(), result: Some(result), error: None }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self { id: id.into(), result: None, error: Some(error.into()) }
    }
}

/// Result type for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;
