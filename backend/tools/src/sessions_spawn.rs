//! `sessions_spawn` — delegate a task to a fresh, isolated sub-agent session.
//!
//! Creates the child session, optionally waits for its first run up to a
//! caller-chosen budget, and always detaches a background announce flow that
//! posts the child's eventual result back to the requester's chat channel
//! and (by default) tears the session down. The caller never blocks on the
//! announce flow; every returned result carries the child key and run id so
//! later announce activity can be correlated.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use nestforge_core::{new_idempotency_key, CleanupMode, NestError, Tool};
use nestforge_gateway::{
    agent_run, agent_wait, sessions_patch, AgentRunParams, Gateway, SessionPatch, WaitStatus,
};
use nestforge_routing::{
    is_subagent_session_key, new_subagent_session_key, normalize_agent_id,
    parse_agent_session_key, resolve_display_session_key, resolve_internal_session_key,
    MainSessionAlias,
};

use crate::agent_step::read_latest_assistant_reply;
use crate::announce::{run_announce_flow, AnnounceFlowParams};
use crate::announce_target::AnnounceTargetResolver;
use crate::prompts::{build_subagent_system_prompt, SubagentPromptContext};

/// Fixed budget handed to the background announce flow, independent of how
/// long the caller chose to wait.
pub const BACKGROUND_ANNOUNCE_BUDGET_MS: u64 = 30_000;

/// Inputs to one spawn. Immutable once accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    pub task: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// 0 means "do not wait": return as soon as the child run is submitted.
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub cleanup: CleanupMode,
}

/// Identity of the session the spawn request originated from.
#[derive(Debug, Clone, Default)]
pub struct RequesterContext {
    pub agent_session_key: Option<String>,
    pub agent_provider: Option<String>,
    /// Sandboxed deployments attach ownership metadata to the child so the
    /// runtime can scope what it may touch.
    pub sandboxed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnStatus {
    Forbidden,
    Error,
    Accepted,
    Timeout,
    Ok,
}

/// Caller-visible outcome of one spawn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnResult {
    pub status: SpawnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_session_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl SpawnResult {
    fn forbidden(error: impl Into<String>) -> Self {
        Self {
            status: SpawnStatus::Forbidden,
            error: Some(error.into()),
            child_session_key: None,
            run_id: None,
            reply: None,
        }
    }

    fn for_child(status: SpawnStatus, child_session_key: &str, run_id: &str) -> Self {
        Self {
            status,
            error: None,
            child_session_key: Some(child_session_key.to_string()),
            run_id: Some(run_id.to_string()),
            reply: None,
        }
    }
}

/// The spawn-wait-announce orchestrator, exposed to agents as the
/// `sessions_spawn` tool. One instance is bound to one requester session.
pub struct SessionsSpawnTool {
    gateway: Arc<dyn Gateway>,
    announce_targets: Arc<dyn AnnounceTargetResolver>,
    main: MainSessionAlias,
    requester: RequesterContext,
}

impl SessionsSpawnTool {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        announce_targets: Arc<dyn AnnounceTargetResolver>,
        main: MainSessionAlias,
        requester: RequesterContext,
    ) -> Self {
        Self {
            gateway,
            announce_targets,
            main,
            requester,
        }
    }

    /// Turn one request into exactly one caller-visible result, scheduling
    /// the background announce flow on every path where the child run was
    /// durably started and its reply was not consumed here in full.
    pub async fn spawn(&self, request: SpawnRequest) -> Result<SpawnResult, NestError> {
        let task = request.task.trim();
        if task.is_empty() {
            return Err(NestError::InvalidArgument(
                "task is required and must not be blank".into(),
            ));
        }

        // Sub-agents may not recursively spawn.
        if let Some(raw_key) = &self.requester.agent_session_key {
            if is_subagent_session_key(raw_key) {
                return Ok(SpawnResult::forbidden(
                    "sessions_spawn is not allowed from sub-agent sessions",
                ));
            }
        }

        let requester_internal_key = match &self.requester.agent_session_key {
            Some(key) => resolve_internal_session_key(key, &self.main),
            None => self.main.alias.clone(),
        };
        let requester_display_key = resolve_display_session_key(&requester_internal_key, &self.main);
        let requester_agent_id = normalize_agent_id(
            parse_agent_session_key(&requester_internal_key)
                .map(|parsed| parsed.agent_id)
                .as_deref(),
        );

        let child_session_key = new_subagent_session_key(&requester_agent_id);

        // Ownership/model metadata is advisory: the run works without it.
        let patch = SessionPatch {
            key: &child_session_key,
            spawned_by: self
                .requester
                .sandboxed
                .then_some(requester_internal_key.as_str()),
            model: request.model.as_deref().filter(|m| !m.trim().is_empty()),
        };
        if !patch.is_empty() {
            if let Err(err) = sessions_patch(self.gateway.as_ref(), &patch).await {
                warn!(
                    target: "sessions_spawn",
                    child = %child_session_key,
                    error = %err,
                    "session patch failed; continuing without metadata"
                );
            }
        }

        let label = request.label.as_deref().map(str::trim).filter(|l| !l.is_empty());
        let child_system_prompt = build_subagent_system_prompt(&SubagentPromptContext {
            requester_session_key: self.requester.agent_session_key.as_deref(),
            requester_provider: self.requester.agent_provider.as_deref(),
            child_session_key: &child_session_key,
            label,
        });

        // The local idempotency key doubles as the run-id fallback so the
        // caller always gets a handle, even when submission fails.
        let child_idem = new_idempotency_key();
        let mut child_run_id = child_idem.clone();
        match agent_run(
            self.gateway.as_ref(),
            &AgentRunParams {
                message: task,
                session_key: &child_session_key,
                idempotency_key: &child_idem,
                deliver: false,
                lane: nestforge_core::Lane::Subagent,
                extra_system_prompt: Some(&child_system_prompt),
            },
        )
        .await
        {
            Ok(response) => {
                if let Some(run_id) = response.run_id.filter(|id| !id.is_empty()) {
                    child_run_id = run_id;
                }
            }
            Err(err) => {
                let mut result =
                    SpawnResult::for_child(SpawnStatus::Error, &child_session_key, &child_run_id);
                result.error = Some(err.message().to_string());
                return Ok(result);
            }
        }

        let timeout_ms = request.timeout_seconds * 1000;

        if request.timeout_seconds == 0 {
            self.schedule_announce(
                &child_session_key,
                &child_run_id,
                &requester_internal_key,
                &requester_display_key,
                task,
                request.cleanup,
                None,
            );
            return Ok(SpawnResult::for_child(
                SpawnStatus::Accepted,
                &child_session_key,
                &child_run_id,
            ));
        }

        let wait = match agent_wait(self.gateway.as_ref(), &child_run_id, timeout_ms).await {
            Ok(wait) => wait,
            Err(err) => {
                // Transport failure: the child's state is unknown, so no
                // announce flow is scheduled (see design notes).
                let status = if err.is_gateway_timeout() {
                    SpawnStatus::Timeout
                } else {
                    SpawnStatus::Error
                };
                let mut result =
                    SpawnResult::for_child(status, &child_session_key, &child_run_id);
                result.error = Some(err.message().to_string());
                return Ok(result);
            }
        };

        match wait.status {
            WaitStatus::Timeout => {
                self.schedule_announce(
                    &child_session_key,
                    &child_run_id,
                    &requester_internal_key,
                    &requester_display_key,
                    task,
                    request.cleanup,
                    None,
                );
                let mut result = SpawnResult::for_child(
                    SpawnStatus::Timeout,
                    &child_session_key,
                    &child_run_id,
                );
                result.error = wait.error;
                Ok(result)
            }
            WaitStatus::Error | WaitStatus::Unknown => {
                self.schedule_announce(
                    &child_session_key,
                    &child_run_id,
                    &requester_internal_key,
                    &requester_display_key,
                    task,
                    request.cleanup,
                    None,
                );
                let mut result =
                    SpawnResult::for_child(SpawnStatus::Error, &child_session_key, &child_run_id);
                result.error = Some(wait.error.unwrap_or_else(|| "agent error".into()));
                Ok(result)
            }
            WaitStatus::Ok => {
                match read_latest_assistant_reply(self.gateway.as_ref(), &child_session_key).await
                {
                    Ok(reply) => {
                        let round_one_reply = reply.clone().filter(|r| !r.is_empty());
                        self.schedule_announce(
                            &child_session_key,
                            &child_run_id,
                            &requester_internal_key,
                            &requester_display_key,
                            task,
                            request.cleanup,
                            round_one_reply,
                        );
                        let mut result = SpawnResult::for_child(
                            SpawnStatus::Ok,
                            &child_session_key,
                            &child_run_id,
                        );
                        result.reply = reply;
                        Ok(result)
                    }
                    Err(err) => {
                        // The run finished; only the read failed. Let the
                        // background flow fetch the reply itself.
                        self.schedule_announce(
                            &child_session_key,
                            &child_run_id,
                            &requester_internal_key,
                            &requester_display_key,
                            task,
                            request.cleanup,
                            None,
                        );
                        let mut result = SpawnResult::for_child(
                            SpawnStatus::Error,
                            &child_session_key,
                            &child_run_id,
                        );
                        result.error = Some(err.message().to_string());
                        Ok(result)
                    }
                }
            }
        }
    }

    /// Detach the background announce flow. Called immediately before each
    /// return on the paths that schedule it; the caller never joins it.
    #[allow(clippy::too_many_arguments)]
    fn schedule_announce(
        &self,
        child_session_key: &str,
        child_run_id: &str,
        requester_internal_key: &str,
        requester_display_key: &str,
        task: &str,
        cleanup: CleanupMode,
        round_one_reply: Option<String>,
    ) {
        let params = AnnounceFlowParams {
            child_session_key: child_session_key.to_string(),
            child_run_id: child_run_id.to_string(),
            requester_session_key: requester_internal_key.to_string(),
            requester_provider: self.requester.agent_provider.clone(),
            requester_display_key: requester_display_key.to_string(),
            task: task.to_string(),
            timeout_ms: BACKGROUND_ANNOUNCE_BUDGET_MS,
            cleanup,
            round_one_reply,
        };
        let gateway = Arc::clone(&self.gateway);
        let resolver = Arc::clone(&self.announce_targets);
        tokio::spawn(run_announce_flow(gateway, resolver, params));
    }
}

#[async_trait]
impl Tool for SessionsSpawnTool {
    fn name(&self) -> &str {
        "sessions_spawn"
    }

    fn description(&self) -> &str {
        "Spawn a background sub-agent run in an isolated session and announce the result back to the requester chat."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "task": { "type": "string", "description": "Task for the sub-agent to run." },
                "label": { "type": "string", "description": "Optional label shown in the child's context." },
                "model": { "type": "string", "description": "Optional model override for the child session." },
                "timeoutSeconds": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "How long to wait for the child before returning. 0 = do not wait."
                },
                "cleanup": {
                    "type": "string",
                    "enum": ["delete", "keep"],
                    "description": "Whether to delete the child session after the announce flow."
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, anyhow::Error> {
        let request: SpawnRequest = serde_json::from_value(args)
            .map_err(|err| NestError::InvalidArgument(format!("bad sessions_spawn args: {err}")))?;
        let result = self.spawn(request).await?;
        Ok(serde_json::to_string(&result)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::announce_target::StaticAnnounceTargets;
    use crate::testing::MockGateway;
    use nestforge_core::AnnounceTarget;
    use nestforge_gateway::GatewayError;
    use nestforge_routing::resolve_main_session_alias;
    use serde_json::json;

    fn seatalk_target() -> AnnounceTarget {
        AnnounceTarget {
            provider: "seatalk".into(),
            to: "emp-1".into(),
            account_id: None,
        }
    }

    fn bound_targets() -> HashMap<String, AnnounceTarget> {
        let mut bindings = HashMap::new();
        bindings.insert("agent:ops:main".to_string(), seatalk_target());
        bindings
    }

    fn main_requester() -> RequesterContext {
        RequesterContext {
            agent_session_key: Some("agent:ops:main".into()),
            agent_provider: Some("seatalk".into()),
            sandboxed: false,
        }
    }

    fn tool_with(
        gateway: Arc<MockGateway>,
        targets: HashMap<String, AnnounceTarget>,
        requester: RequesterContext,
    ) -> SessionsSpawnTool {
        SessionsSpawnTool::new(
            gateway,
            Arc::new(StaticAnnounceTargets::new(targets)),
            resolve_main_session_alias(Some("ops")),
            requester,
        )
    }

    fn request(task: &str, timeout_seconds: u64) -> SpawnRequest {
        SpawnRequest {
            task: task.into(),
            label: None,
            model: None,
            timeout_seconds,
            cleanup: CleanupMode::Delete,
        }
    }

    #[tokio::test]
    async fn blank_task_fails_without_rpc() {
        let gateway = Arc::new(MockGateway::new());
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let err = tool.spawn(request("   ", 0)).await.unwrap_err();
        assert!(matches!(err, NestError::InvalidArgument(_)));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn subagent_requester_is_forbidden_without_rpc() {
        let gateway = Arc::new(MockGateway::new());
        let requester = RequesterContext {
            agent_session_key: Some("agent:ops:subagent:existing".into()),
            agent_provider: None,
            sandboxed: false,
        };
        let tool = tool_with(gateway.clone(), bound_targets(), requester);

        let result = tool.spawn(request("nested spawn", 5)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Forbidden);
        assert!(result.error.is_some());
        assert!(result.child_session_key.is_none());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn fire_and_forget_returns_accepted_then_cleans_up() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        gateway.script("agent.wait", Ok(json!({ "status": "timeout" })));
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let result = tool.spawn(request("summarize doc", 0)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Accepted);
        assert_eq!(result.run_id.as_deref(), Some("run-1"));
        let child = result.child_session_key.unwrap();
        assert!(child.starts_with("agent:ops:subagent:"));

        // The synchronous phase issued only the submission.
        assert_eq!(gateway.calls_for("agent").len(), 1);
        let submit = &gateway.calls_for("agent")[0];
        assert_eq!(submit.params["deliver"], false);
        assert_eq!(submit.params["lane"], "subagent");
        assert_eq!(submit.params["sessionKey"], child.as_str());

        // Background flow: child never finished, so no send, but cleanup runs.
        gateway.wait_for_call("sessions.delete").await;
        gateway.settle().await;
        assert_eq!(gateway.calls_for("send").len(), 0);
        assert_eq!(gateway.calls_for("sessions.delete").len(), 1);
        // The background wait uses the fixed secondary budget.
        assert_eq!(gateway.calls_for("agent.wait")[0].params["timeoutMs"], 30_000);
    }

    #[tokio::test]
    async fn ok_path_returns_reply_and_background_skips_refetch() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        gateway.script("agent.wait", Ok(json!({ "status": "ok" })));
        gateway.script(
            "sessions.history",
            Ok(json!({ "entries": [
                { "role": "user", "content": "quick calc" },
                { "role": "assistant", "content": "42" }
            ]})),
        );
        // Announce drafting turn.
        gateway.script("agent", Ok(json!({ "runId": "run-2" })));
        gateway.script("agent.wait", Ok(json!({ "status": "ok" })));
        gateway.script(
            "sessions.history",
            Ok(json!({ "entries": [
                { "role": "assistant", "content": "Done: 42" }
            ]})),
        );
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let result = tool.spawn(request("quick calc", 5)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Ok);
        assert_eq!(result.reply.as_deref(), Some("42"));
        assert_eq!(result.run_id.as_deref(), Some("run-1"));

        let send = gateway.wait_for_call("send").await;
        assert_eq!(send.params["message"], "Done: 42");
        assert_eq!(send.params["provider"], "seatalk");
        assert_eq!(send.params["to"], "emp-1");
        assert!(send.params["idempotencyKey"].as_str().unwrap().len() > 0);

        gateway.wait_for_call("sessions.delete").await;
        gateway.settle().await;

        // Exactly two waits: the synchronous one and the announce step's.
        // The background flow reused the already-fetched reply.
        let waits = gateway.calls_for("agent.wait");
        assert_eq!(waits.len(), 2);
        assert_eq!(waits[0].params["timeoutMs"], 5_000);
        assert_eq!(waits[0].timeout, std::time::Duration::from_millis(7_000));

        // The announce turn carried the nested lane and the drafting prompt.
        let runs = gateway.calls_for("agent");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].params["lane"], "nested");
        let announce_prompt = runs[1].params["extraSystemPrompt"].as_str().unwrap();
        assert!(announce_prompt.contains("Post target provider: seatalk."));
        assert!(announce_prompt.contains("Sub-agent result: 42"));
    }

    #[tokio::test]
    async fn remote_timeout_schedules_background_flow() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        gateway.script("agent.wait", Ok(json!({ "status": "timeout" })));
        gateway.script("agent.wait", Ok(json!({ "status": "timeout" })));
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let result = tool.spawn(request("long job", 2)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Timeout);

        gateway.wait_for_call("sessions.delete").await;
        gateway.settle().await;
        // The background flow re-waited since no reply was handed over.
        assert_eq!(gateway.calls_for("agent.wait").len(), 2);
        assert_eq!(gateway.calls_for("send").len(), 0);
    }

    #[tokio::test]
    async fn remote_run_error_surfaces_error_text() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        gateway.script(
            "agent.wait",
            Ok(json!({ "status": "error", "error": "model refused" })),
        );
        gateway.script("agent.wait", Ok(json!({ "status": "error" })));
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let result = tool.spawn(request("doomed job", 2)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Error);
        assert_eq!(result.error.as_deref(), Some("model refused"));

        gateway.wait_for_call("sessions.delete").await;
    }

    #[tokio::test]
    async fn wait_transport_timeout_maps_to_timeout_and_skips_announce() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        gateway.script(
            "agent.wait",
            Err(GatewayError::transport(
                "gateway timeout after 2000ms calling agent.wait",
            )),
        );
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let result = tool.spawn(request("long job", 2)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Timeout);
        assert!(result.error.unwrap().contains("gateway timeout"));

        // Child state unknown: no background flow, so no cleanup either.
        gateway.settle().await;
        assert_eq!(gateway.calls_for("sessions.delete").len(), 0);
        assert_eq!(gateway.calls_for("agent.wait").len(), 1);
    }

    #[tokio::test]
    async fn wait_transport_failure_maps_to_error() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        gateway.script(
            "agent.wait",
            Err(GatewayError::transport("gateway call agent.wait failed: connection refused")),
        );
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let result = tool.spawn(request("long job", 2)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Error);
        gateway.settle().await;
        assert_eq!(gateway.calls_for("sessions.delete").len(), 0);
    }

    #[tokio::test]
    async fn submission_failure_returns_error_with_fallback_run_id() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Err(GatewayError::remote("no such agent")));
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let result = tool.spawn(request("summarize doc", 0)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Error);
        assert_eq!(result.error.as_deref(), Some("no such agent"));
        assert!(result.child_session_key.is_some());
        // The local idempotency key stands in for the never-reported run id.
        assert!(!result.run_id.unwrap().is_empty());

        gateway.settle().await;
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn patch_failure_does_not_abort_spawn() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("sessions.patch", Err(GatewayError::remote("patch rejected")));
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        let requester = RequesterContext {
            sandboxed: true,
            ..main_requester()
        };
        let tool = tool_with(gateway.clone(), bound_targets(), requester);

        let result = tool.spawn(request("summarize doc", 0)).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Accepted);

        let patch = &gateway.calls_for("sessions.patch")[0];
        assert_eq!(patch.params["spawnedBy"], "agent:ops:main");
    }

    #[tokio::test]
    async fn model_override_is_patched_onto_the_child() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        let mut req = request("summarize doc", 0);
        req.model = Some("fast-mini".into());
        let result = tool.spawn(req).await.unwrap();
        assert_eq!(result.status, SpawnStatus::Accepted);

        let patch = &gateway.calls_for("sessions.patch")[0];
        assert_eq!(patch.params["model"], "fast-mini");
        assert!(patch.params.get("spawnedBy").is_none());
    }

    #[tokio::test]
    async fn no_patch_without_metadata() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());

        tool.spawn(request("summarize doc", 0)).await.unwrap();
        assert_eq!(gateway.calls_for("sessions.patch").len(), 0);
    }

    #[tokio::test]
    async fn cleanup_keep_never_deletes() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        gateway.script("agent.wait", Ok(json!({ "status": "timeout" })));
        let tool = tool_with(gateway.clone(), HashMap::new(), main_requester());

        let mut req = request("summarize doc", 0);
        req.cleanup = CleanupMode::Keep;
        tool.spawn(req).await.unwrap();

        gateway.settle().await;
        assert_eq!(gateway.calls_for("sessions.delete").len(), 0);
        assert_eq!(gateway.calls_for("send").len(), 0);
    }

    #[tokio::test]
    async fn tool_surface_round_trips_json() {
        let gateway = Arc::new(MockGateway::new());
        let tool = tool_with(gateway.clone(), bound_targets(), main_requester());
        assert_eq!(tool.name(), "sessions_spawn");

        let err = tool.execute(json!({ "task": "" })).await.unwrap_err();
        assert!(err.to_string().contains("invalid argument"));

        gateway.script("agent", Ok(json!({ "runId": "run-1" })));
        let raw = tool
            .execute(json!({ "task": "summarize doc", "timeoutSeconds": 0 }))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["status"], "accepted");
        assert_eq!(value["runId"], "run-1");
    }
}
