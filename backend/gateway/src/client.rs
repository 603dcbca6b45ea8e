//! Gateway RPC client — single request/response calls to the agent runtime.
//!
//! Every call carries a method name, a parameter object, and an explicit
//! timeout. Failures split into transport errors (gateway unreachable, call
//! timed out, malformed body) and remote errors (the gateway answered with an
//! error of its own); callers branch on that split.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("gateway transport error: {message}")]
    Transport { message: String },

    #[error("gateway remote error: {message}")]
    Remote { message: String },
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        GatewayError::Transport {
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        GatewayError::Remote {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GatewayError::Transport { message } | GatewayError::Remote { message } => message,
        }
    }

    /// Whether this is a transport failure whose text indicates the gateway
    /// itself timed out, as opposed to being unreachable or answering badly.
    pub fn is_gateway_timeout(&self) -> bool {
        matches!(self, GatewayError::Transport { message } if message.contains("gateway timeout"))
    }
}

/// RPC surface of the agent runtime.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Issue one `method` call with `params`, bounded by `timeout`.
    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError>;
}

/// Response envelope the gateway wraps every result in.
#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP implementation of [`Gateway`].
pub struct HttpGateway {
    url: String,
    token: Option<String>,
    http: Client,
}

impl HttpGateway {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        let mut request = self
            .http
            .post(&self.url)
            .timeout(timeout)
            .json(&serde_json::json!({ "method": method, "params": params }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                GatewayError::transport(format!(
                    "gateway timeout after {}ms calling {method}",
                    timeout.as_millis()
                ))
            } else {
                GatewayError::transport(format!("gateway call {method} failed: {err}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::remote(format!(
                "gateway call {method} returned HTTP {status}"
            )));
        }

        let envelope: RpcEnvelope = response.json().await.map_err(|err| {
            GatewayError::transport(format!("gateway call {method} returned malformed body: {err}"))
        })?;

        if !envelope.ok {
            return Err(GatewayError::remote(
                envelope
                    .error
                    .unwrap_or_else(|| format!("gateway call {method} failed")),
            ));
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}
