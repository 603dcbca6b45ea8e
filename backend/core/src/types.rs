use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scheduling lane attached to a run submission, understood by the run
/// scheduler on the gateway side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// First run of a freshly spawned sub-agent session.
    Subagent,
    /// Follow-up turn on an existing session (e.g., the announce draft).
    Nested,
    /// Turn triggered by an external event rather than an interactive caller.
    Cron,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Subagent => "subagent",
            Lane::Nested => "nested",
            Lane::Cron => "cron",
        }
    }
}

/// What to do with a child session once its announce flow has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupMode {
    #[default]
    Delete,
    Keep,
}

/// Resolved destination for a background-posted announce message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceTarget {
    /// Chat platform to deliver through (e.g., "seatalk").
    pub provider: String,
    /// Recipient address understood by that platform.
    pub to: String,
    /// Platform account to send from, when the deployment has several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

/// Generate a fresh idempotency key for a gateway submission.
pub fn new_idempotency_key() -> String {
    Uuid::new_v4().to_string()
}
