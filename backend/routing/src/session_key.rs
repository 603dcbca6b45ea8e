/// Agent session keys — stable identifiers mapping a conversation to a session.
///
/// Fully-qualified keys have the form `agent:<agentId>:main` for an agent's
/// primary session and `agent:<agentId>:subagent:<uuid>` for spawned child
/// sessions. At the tool surface the primary session is addressed through the
/// human-facing alias `main`.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Human-facing alias for the primary session.
pub const MAIN_SESSION_ALIAS: &str = "main";

/// Agent id used when a key carries none that can be resolved.
pub const DEFAULT_AGENT_ID: &str = "main";

/// What kind of session a fully-qualified key addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Main,
    Subagent,
    Other,
}

/// A parsed `agent:<agentId>:…` session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSessionKey {
    pub agent_id: String,
    pub kind: SessionKind,
    /// Remainder after the kind segment (the uuid for sub-agent keys).
    pub suffix: Option<String>,
}

/// Parse a fully-qualified agent session key. Returns `None` for keys that
/// are not in the `agent:` namespace (aliases, channel-scoped keys, …).
pub fn parse_agent_session_key(key: &str) -> Option<ParsedSessionKey> {
    let mut parts = key.trim().splitn(4, ':');
    if parts.next()? != "agent" {
        return None;
    }
    let agent_id = parts.next()?.trim();
    if agent_id.is_empty() {
        return None;
    }
    let kind_segment = parts.next().unwrap_or("");
    let suffix = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    let kind = match kind_segment {
        "main" => SessionKind::Main,
        "subagent" => SessionKind::Subagent,
        _ => SessionKind::Other,
    };
    Some(ParsedSessionKey {
        agent_id: agent_id.to_ascii_lowercase(),
        kind,
        suffix,
    })
}

/// Whether a raw session key addresses a sub-agent session.
pub fn is_subagent_session_key(key: &str) -> bool {
    matches!(
        parse_agent_session_key(key),
        Some(ParsedSessionKey {
            kind: SessionKind::Subagent,
            ..
        })
    )
}

/// Normalize an agent id extracted from a key: trimmed, lowercased, with a
/// stable default when absent or blank.
pub fn normalize_agent_id(agent_id: Option<&str>) -> String {
    match agent_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_ascii_lowercase(),
        _ => DEFAULT_AGENT_ID.to_string(),
    }
}

/// The alias/fully-qualified pair for an agent's primary session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainSessionAlias {
    pub main_key: String,
    pub alias: String,
}

/// Resolve the primary-session alias pair for a configured agent id.
pub fn resolve_main_session_alias(agent_id: Option<&str>) -> MainSessionAlias {
    let agent_id = normalize_agent_id(agent_id);
    MainSessionAlias {
        main_key: format!("agent:{agent_id}:main"),
        alias: MAIN_SESSION_ALIAS.to_string(),
    }
}

/// Map an externally supplied key to its fully-qualified internal form.
/// The alias resolves to the main key; anything else passes through trimmed.
pub fn resolve_internal_session_key(key: &str, main: &MainSessionAlias) -> String {
    let trimmed = key.trim();
    if trimmed.eq_ignore_ascii_case(&main.alias) {
        main.main_key.clone()
    } else {
        trimmed.to_string()
    }
}

/// Map an internal key back to its human-facing form: the main key displays
/// as the alias, everything else as itself.
pub fn resolve_display_session_key(key: &str, main: &MainSessionAlias) -> String {
    if key == main.main_key {
        main.alias.clone()
    } else {
        key.to_string()
    }
}

/// Allocate a globally unique child session key under the given agent id.
pub fn new_subagent_session_key(agent_id: &str) -> String {
    format!("agent:{agent_id}:subagent:{}", Uuid::new_v4())
}
