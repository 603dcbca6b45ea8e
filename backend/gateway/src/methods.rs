//! Typed wrappers over the gateway methods this runtime consumes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use nestforge_core::Lane;

use crate::client::{Gateway, GatewayError};

/// Fixed budget for short administrative calls (submission, patch, history,
/// delete, send).
pub const RPC_CALL_TIMEOUT_MS: u64 = 10_000;

/// Extra transport headroom granted to `agent.wait` above the wait budget,
/// so "gateway unreachable" stays distinguishable from "run still pending".
pub const WAIT_TIMEOUT_MARGIN_MS: u64 = 2_000;

/// How many transcript entries a latest-reply read pages through.
pub const HISTORY_READ_LIMIT: usize = 50;

fn short_timeout() -> Duration {
    Duration::from_millis(RPC_CALL_TIMEOUT_MS)
}

// ---------------------------------------------------------------------------
// sessions.patch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch<'a> {
    pub key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawned_by: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

impl SessionPatch<'_> {
    /// A patch with neither ownership nor model metadata changes nothing and
    /// is not worth a round trip.
    pub fn is_empty(&self) -> bool {
        self.spawned_by.is_none() && self.model.is_none()
    }
}

pub async fn sessions_patch(
    gateway: &dyn Gateway,
    patch: &SessionPatch<'_>,
) -> Result<(), GatewayError> {
    let params = serde_json::to_value(patch)
        .map_err(|err| GatewayError::transport(format!("encode sessions.patch: {err}")))?;
    gateway.call("sessions.patch", params, short_timeout()).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunParams<'a> {
    pub message: &'a str,
    pub session_key: &'a str,
    pub idempotency_key: &'a str,
    pub deliver: bool,
    pub lane: Lane,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_system_prompt: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunResponse {
    #[serde(default)]
    pub run_id: Option<String>,
}

/// Submit one run (non-blocking on the remote side).
pub async fn agent_run(
    gateway: &dyn Gateway,
    params: &AgentRunParams<'_>,
) -> Result<AgentRunResponse, GatewayError> {
    let params = serde_json::to_value(params)
        .map_err(|err| GatewayError::transport(format!("encode agent: {err}")))?;
    let result = gateway.call("agent", params, short_timeout()).await?;
    serde_json::from_value(result)
        .map_err(|err| GatewayError::transport(format!("decode agent response: {err}")))
}

// ---------------------------------------------------------------------------
// agent.wait
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStatus {
    Ok,
    Timeout,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct AgentWaitResponse {
    pub status: WaitStatus,
    #[serde(default)]
    pub error: Option<String>,
}

/// Bounded poll for a run's completion. The RPC timeout sits slightly above
/// the wait budget itself.
pub async fn agent_wait(
    gateway: &dyn Gateway,
    run_id: &str,
    timeout_ms: u64,
) -> Result<AgentWaitResponse, GatewayError> {
    let result = gateway
        .call(
            "agent.wait",
            serde_json::json!({ "runId": run_id, "timeoutMs": timeout_ms }),
            Duration::from_millis(timeout_ms + WAIT_TIMEOUT_MARGIN_MS),
        )
        .await?;
    serde_json::from_value(result)
        .map_err(|err| GatewayError::transport(format!("decode agent.wait response: {err}")))
}

// ---------------------------------------------------------------------------
// sessions.history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryResponse {
    #[serde(default)]
    pub entries: Vec<TranscriptEntry>,
}

/// Read the tail of a session transcript, oldest first.
pub async fn sessions_history(
    gateway: &dyn Gateway,
    key: &str,
    limit: usize,
) -> Result<SessionHistoryResponse, GatewayError> {
    let result = gateway
        .call(
            "sessions.history",
            serde_json::json!({ "key": key, "limit": limit }),
            short_timeout(),
        )
        .await?;
    serde_json::from_value(result)
        .map_err(|err| GatewayError::transport(format!("decode sessions.history response: {err}")))
}

// ---------------------------------------------------------------------------
// sessions.delete
// ---------------------------------------------------------------------------

pub async fn sessions_delete(
    gateway: &dyn Gateway,
    key: &str,
    delete_transcript: bool,
) -> Result<(), GatewayError> {
    gateway
        .call(
            "sessions.delete",
            serde_json::json!({ "key": key, "deleteTranscript": delete_transcript }),
            short_timeout(),
        )
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// send
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams<'a> {
    pub to: &'a str,
    pub message: &'a str,
    pub provider: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<&'a str>,
    pub idempotency_key: &'a str,
}

/// Deliver one outbound chat message through the gateway.
pub async fn send_message(
    gateway: &dyn Gateway,
    params: &SendParams<'_>,
) -> Result<(), GatewayError> {
    let params = serde_json::to_value(params)
        .map_err(|err| GatewayError::transport(format!("encode send: {err}")))?;
    gateway.call("send", params, short_timeout()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_run_params_use_gateway_wire_names() {
        let params = AgentRunParams {
            message: "do the thing",
            session_key: "agent:ops:subagent:abc",
            idempotency_key: "idem-1",
            deliver: false,
            lane: Lane::Subagent,
            extra_system_prompt: None,
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["sessionKey"], "agent:ops:subagent:abc");
        assert_eq!(value["idempotencyKey"], "idem-1");
        assert_eq!(value["lane"], "subagent");
        assert_eq!(value["deliver"], false);
        assert!(value.get("extraSystemPrompt").is_none());
    }

    #[test]
    fn wait_status_tolerates_unknown_values() {
        let response: AgentWaitResponse =
            serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(response.status, WaitStatus::Unknown);

        let response: AgentWaitResponse =
            serde_json::from_str(r#"{"status":"error","error":"boom"}"#).unwrap();
        assert_eq!(response.status, WaitStatus::Error);
        assert_eq!(response.error.as_deref(), Some("boom"));
    }

    #[test]
    fn empty_patch_is_detected() {
        let patch = SessionPatch { key: "agent:ops:subagent:abc", spawned_by: None, model: None };
        assert!(patch.is_empty());
        let patch = SessionPatch { key: "agent:ops:subagent:abc", spawned_by: None, model: Some("fast") };
        assert!(!patch.is_empty());
    }
}
