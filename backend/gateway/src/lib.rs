//! `nestforge-gateway` — RPC client to the agent runtime.
//!
//! The runtime is reached through single request/response calls with explicit
//! per-call timeouts. This crate holds the transport (trait + HTTP
//! implementation) and typed wrappers for the methods NestForge consumes.

pub mod client;
pub mod methods;

pub use client::{Gateway, GatewayError, HttpGateway};
pub use methods::{
    agent_run, agent_wait, send_message, sessions_delete, sessions_history, sessions_patch,
    AgentRunParams, AgentRunResponse, AgentWaitResponse, SendParams, SessionHistoryResponse,
    SessionPatch, TranscriptEntry, WaitStatus, HISTORY_READ_LIMIT, RPC_CALL_TIMEOUT_MS,
    WAIT_TIMEOUT_MARGIN_MS,
};
