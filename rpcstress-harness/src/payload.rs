use rpcstress_common::{Args, Reply, RpcError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("cannot read payload file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in payload file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The request every call sends, plus the product the reply must carry when
/// the request has the `Args` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    request: Value,
    expected: Option<i64>,
}

impl Default for Payload {
    fn default() -> Self {
        Self::from_args(Self::DEFAULT_ARGS)
    }
}

impl Payload {
    /// Operands used when no payload file is given; match the reference server.
    pub const DEFAULT_ARGS: Args = Args { a: 5, b: 3 };

    pub fn from_args(args: Args) -> Self {
        Self {
            request: serde_json::json!({ "a": args.a, "b": args.b }),
            expected: args.a.checked_mul(args.b),
        }
    }

    /// Wrap an arbitrary request. Replies are only verified when `request` decodes as [`Args`].
    pub fn from_value(request: Value) -> Self {
        let expected = serde_json::from_value::<Args>(request.clone())
            .ok()
            .and_then(|args| args.a.checked_mul(args.b));
        Self { request, expected }
    }

    /// Load a request from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, PayloadError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| PayloadError::Io { path: path.to_path_buf(), source })?;
        let request = serde_json::from_str(&text)
            .map_err(|source| PayloadError::Json { path: path.to_path_buf(), source })?;
        Ok(Self::from_value(request))
    }

    pub fn request(&self) -> &Value {
        &self.request
    }

    pub fn expected(&self) -> Option<i64> {
        self.expected
    }

    /// Check a reply against the expected product, if there is one.
    pub fn verify(&self, reply: &Value) -> Result<(), RpcError> {
        let Some(expected) = self.expected else {
            return Ok(());
        };
        let reply: Reply = serde_json::from_value(reply.clone())
            .map_err(|e| RpcError::Application(format!("invalid reply: {e}")))?;
        if reply.result != expected {
            return Err(RpcError::Application(format!(
                "wrong result: expected {}, got {}",
                expected, reply.result
            )));
        }
        Ok(())
    }
}
