//! Background announce flow — turns a child's raw result into a chat message
//! and delivers it to the requester's channel.
//!
//! Runs detached from the spawn caller, which has already returned by the
//! time this executes. Four gates in sequence (fetch-reply, resolve-target,
//! draft-announce, deliver), each aborting the rest of the flow when it
//! cannot proceed; the child-session cleanup runs on every exit path.

use std::sync::Arc;

use tracing::{debug, warn};

use nestforge_core::{new_idempotency_key, CleanupMode, Lane};
use nestforge_gateway::{
    agent_wait, send_message, sessions_delete, Gateway, GatewayError, SendParams, WaitStatus,
};

use crate::agent_step::{read_latest_assistant_reply, run_agent_step, AgentStepParams};
use crate::announce_target::AnnounceTargetResolver;
use crate::prompts::{build_subagent_announce_prompt, AnnouncePromptContext};

/// Exact reply with which a child declines to announce. Case-sensitive.
pub const ANNOUNCE_SKIP_SENTINEL: &str = "ANNOUNCE_SKIP";

/// Upper bound on how long the background flow waits for a child run that
/// the synchronous phase did not see finish.
pub const ANNOUNCE_WAIT_CAP_MS: u64 = 60_000;

/// Whether a drafted announce reply opts out of posting.
pub fn is_announce_skip(reply: &str) -> bool {
    reply.trim() == ANNOUNCE_SKIP_SENTINEL
}

/// Everything the background flow needs, captured at scheduling time.
#[derive(Debug, Clone)]
pub struct AnnounceFlowParams {
    pub child_session_key: String,
    pub child_run_id: String,
    pub requester_session_key: String,
    pub requester_provider: Option<String>,
    pub requester_display_key: String,
    pub task: String,
    pub timeout_ms: u64,
    pub cleanup: CleanupMode,
    /// Reply already consumed by the synchronous phase, so the flow need not
    /// fetch it again.
    pub round_one_reply: Option<String>,
}

/// Run the announce flow to completion. Never returns an error: failures are
/// logged and swallowed (there is no caller left to report to), and cleanup
/// is attempted regardless of how the steps ended.
pub async fn run_announce_flow(
    gateway: Arc<dyn Gateway>,
    resolver: Arc<dyn AnnounceTargetResolver>,
    params: AnnounceFlowParams,
) {
    if let Err(err) = announce_steps(gateway.as_ref(), resolver.as_ref(), &params).await {
        debug!(
            target: "sessions_spawn",
            child = %params.child_session_key,
            error = %err,
            "announce flow aborted"
        );
    }

    if params.cleanup == CleanupMode::Delete {
        if let Err(err) = sessions_delete(gateway.as_ref(), &params.child_session_key, true).await {
            warn!(
                target: "sessions_spawn",
                child = %params.child_session_key,
                error = %err,
                "child session cleanup failed"
            );
        }
    }
}

async fn announce_steps(
    gateway: &dyn Gateway,
    resolver: &dyn AnnounceTargetResolver,
    params: &AnnounceFlowParams,
) -> Result<(), GatewayError> {
    // Gate 1: obtain the child's reply. Without a finished run there is
    // nothing to announce.
    let reply = match &params.round_one_reply {
        Some(reply) => Some(reply.clone()),
        None => {
            let wait_ms = params.timeout_ms.min(ANNOUNCE_WAIT_CAP_MS);
            let wait = agent_wait(gateway, &params.child_run_id, wait_ms).await?;
            if wait.status != WaitStatus::Ok {
                return Ok(());
            }
            read_latest_assistant_reply(gateway, &params.child_session_key).await?
        }
    };

    // Gate 2: nowhere to post means nothing to do.
    let Some(target) = resolver
        .resolve(&params.requester_session_key, &params.requester_display_key)
        .await
    else {
        return Ok(());
    };

    // Gate 3: ask the child to draft the announce message.
    let announce_prompt = build_subagent_announce_prompt(&AnnouncePromptContext {
        requester_session_key: &params.requester_session_key,
        requester_provider: params.requester_provider.as_deref(),
        announce_channel: &target.provider,
        task: &params.task,
        subagent_reply: reply.as_deref(),
    });

    let announce_reply = run_agent_step(
        gateway,
        &AgentStepParams {
            session_key: &params.child_session_key,
            message: "Sub-agent announce step.",
            extra_system_prompt: Some(&announce_prompt),
            timeout_ms: params.timeout_ms,
            lane: Lane::Nested,
        },
    )
    .await?;

    let Some(announce_reply) = announce_reply else {
        return Ok(());
    };
    if announce_reply.trim().is_empty() || is_announce_skip(&announce_reply) {
        return Ok(());
    }

    // Gate 4: deliver verbatim.
    let idempotency_key = new_idempotency_key();
    send_message(
        gateway,
        &SendParams {
            to: &target.to,
            message: announce_reply.trim(),
            provider: &target.provider,
            account_id: target.account_id.as_deref(),
            idempotency_key: &idempotency_key,
        },
    )
    .await?;
    Ok(())
}
