//! `nestforge-routing` — session-key format, classification, and alias
//! resolution for the NestForge runtime.

pub mod session_key;

pub use session_key::{
    is_subagent_session_key, new_subagent_session_key, normalize_agent_id,
    parse_agent_session_key, resolve_display_session_key, resolve_internal_session_key,
    resolve_main_session_alias, MainSessionAlias, ParsedSessionKey, SessionKind,
    DEFAULT_AGENT_ID, MAIN_SESSION_ALIAS,
};
