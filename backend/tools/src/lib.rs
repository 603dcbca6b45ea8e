//! `nestforge-tools` — agent-facing tools for the NestForge runtime.
//!
//! The centerpiece is `sessions_spawn`: delegate a task to a fresh isolated
//! sub-agent session, optionally wait for it, and always announce its result
//! back to the requester's chat channel through a detached background flow.

pub mod agent_step;
pub mod announce;
pub mod announce_target;
pub mod prompts;
pub mod sessions_spawn;

#[cfg(test)]
pub(crate) mod testing;

pub use agent_step::{read_latest_assistant_reply, run_agent_step, AgentStepParams};
pub use announce::{
    is_announce_skip, run_announce_flow, AnnounceFlowParams, ANNOUNCE_SKIP_SENTINEL,
    ANNOUNCE_WAIT_CAP_MS,
};
pub use announce_target::{AnnounceTargetResolver, StaticAnnounceTargets};
pub use prompts::{
    build_subagent_announce_prompt, build_subagent_system_prompt, AnnouncePromptContext,
    SubagentPromptContext,
};
pub use sessions_spawn::{
    RequesterContext, SessionsSpawnTool, SpawnRequest, SpawnResult, SpawnStatus,
    BACKGROUND_ANNOUNCE_BUDGET_MS,
};
