//! Prompt construction shared by the spawn orchestrator and the announce flow.

use crate::announce::ANNOUNCE_SKIP_SENTINEL;

/// Context lines for a freshly spawned child's system prompt.
#[derive(Debug, Clone, Default)]
pub struct SubagentPromptContext<'a> {
    pub requester_session_key: Option<&'a str>,
    pub requester_provider: Option<&'a str>,
    pub child_session_key: &'a str,
    pub label: Option<&'a str>,
}

/// System prompt attached to the child's first run: who asked, where the
/// child lives, and that an announce step may follow.
pub fn build_subagent_system_prompt(ctx: &SubagentPromptContext<'_>) -> String {
    let mut lines = vec!["Sub-agent context:".to_string()];
    if let Some(label) = ctx.label {
        lines.push(format!("Label: {label}"));
    }
    if let Some(key) = ctx.requester_session_key {
        lines.push(format!("Requester session: {key}."));
    }
    if let Some(provider) = ctx.requester_provider {
        lines.push(format!("Requester provider: {provider}."));
    }
    lines.push(format!("Your session: {}.", ctx.child_session_key));
    lines.push("Run the task. Provide a clear final answer (plain text).".to_string());
    lines.push(
        "After you finish, you may be asked to produce an \"announce\" message to post back to the requester chat."
            .to_string(),
    );
    lines.join("\n")
}

/// Context lines for the announce-drafting turn.
#[derive(Debug, Clone)]
pub struct AnnouncePromptContext<'a> {
    pub requester_session_key: &'a str,
    pub requester_provider: Option<&'a str>,
    pub announce_channel: &'a str,
    pub task: &'a str,
    pub subagent_reply: Option<&'a str>,
}

/// Prompt for the extra turn that drafts the announce message. The child is
/// told the exact sentinel that keeps it silent; anything else is posted
/// verbatim.
pub fn build_subagent_announce_prompt(ctx: &AnnouncePromptContext<'_>) -> String {
    let mut lines = vec![
        "Sub-agent announce step:".to_string(),
        format!("Requester session: {}.", ctx.requester_session_key),
    ];
    if let Some(provider) = ctx.requester_provider {
        lines.push(format!("Requester provider: {provider}."));
    }
    lines.push(format!("Post target provider: {}.", ctx.announce_channel));
    lines.push(format!("Original task: {}", ctx.task));
    match ctx.subagent_reply {
        Some(reply) => lines.push(format!("Sub-agent result: {reply}")),
        None => lines.push("Sub-agent result: (not available).".to_string()),
    }
    lines.push(format!(
        "Reply exactly \"{ANNOUNCE_SKIP_SENTINEL}\" to stay silent."
    ));
    lines.push("Any other reply will be posted to the requester chat provider.".to_string());
    lines.join("\n")
}
