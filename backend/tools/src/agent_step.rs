//! One bounded turn on an existing session, plus the latest-reply read.
//!
//! Used by the spawn orchestrator (announce drafting), the background flow,
//! and the webhook front end — any caller that needs "send a message, wait
//! for the run, read what the assistant said".

use nestforge_core::{new_idempotency_key, Lane};
use nestforge_gateway::{
    agent_run, agent_wait, sessions_history, AgentRunParams, Gateway, GatewayError, WaitStatus,
    HISTORY_READ_LIMIT,
};

/// Read the newest assistant entry from a session transcript, if any.
pub async fn read_latest_assistant_reply(
    gateway: &dyn Gateway,
    session_key: &str,
) -> Result<Option<String>, GatewayError> {
    let history = sessions_history(gateway, session_key, HISTORY_READ_LIMIT).await?;
    Ok(history
        .entries
        .iter()
        .rev()
        .find(|entry| entry.role == "assistant")
        .map(|entry| entry.content.clone()))
}

#[derive(Debug, Clone)]
pub struct AgentStepParams<'a> {
    pub session_key: &'a str,
    pub message: &'a str,
    pub extra_system_prompt: Option<&'a str>,
    pub timeout_ms: u64,
    pub lane: Lane,
}

/// Run one turn on `session_key` and return the assistant's reply.
///
/// Returns `Ok(None)` when the run did not finish cleanly inside the budget
/// (timed out, failed remotely, or produced no assistant entry) — the caller
/// decides whether that is fatal.
pub async fn run_agent_step(
    gateway: &dyn Gateway,
    params: &AgentStepParams<'_>,
) -> Result<Option<String>, GatewayError> {
    let idempotency_key = new_idempotency_key();
    let submitted = agent_run(
        gateway,
        &AgentRunParams {
            message: params.message,
            session_key: params.session_key,
            idempotency_key: &idempotency_key,
            deliver: false,
            lane: params.lane,
            extra_system_prompt: params.extra_system_prompt,
        },
    )
    .await?;

    let run_id = submitted
        .run_id
        .filter(|id| !id.is_empty())
        .unwrap_or(idempotency_key);

    let wait = agent_wait(gateway, &run_id, params.timeout_ms).await?;
    if wait.status != WaitStatus::Ok {
        return Ok(None);
    }
    read_latest_assistant_reply(gateway, params.session_key).await
}
