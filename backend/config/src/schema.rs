//! NestForge runtime configuration schema.
//!
//! Typed for serde YAML/JSON deserialization; every section is optional and
//! falls back to defaults at load time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestForgeConfig {
    /// Gateway RPC endpoint settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    /// Session defaults and announce bindings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,

    /// Channel-specific configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<ChannelsConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// RPC endpoint URL.
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Bearer token, if the gateway requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            token: None,
        }
    }
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:18789/rpc".to_string()
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Agent id owning the main session. Defaults to "main".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Whether the deployment runs sandboxed (ownership metadata gets
    /// attached to spawned children).
    #[serde(default)]
    pub sandboxed: bool,

    /// Announce bindings: requester session key (internal or display form)
    /// to chat destination.
    #[serde(default)]
    pub announce_targets: HashMap<String, AnnounceTargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceTargetConfig {
    pub provider: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seatalk: Option<SeaTalkChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeaTalkChannelConfig {
    pub app_id: String,
    pub app_secret: String,

    /// Empty means callbacks are accepted unverified.
    #[serde(default)]
    pub signing_secret: String,

    #[serde(default = "default_seatalk_webhook_path")]
    pub webhook_path: String,
}

fn default_seatalk_webhook_path() -> String {
    "/webhooks/seatalk".to_string()
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Directory for rolling log files; unset logs to the console only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Default level filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: NestForgeConfig = serde_json::from_str("{}").unwrap();
        assert!(config.gateway.is_none());
        assert!(config.session.is_none());
        assert_eq!(GatewayConfig::default().url, "http://127.0.0.1:18789/rpc");
    }

    #[test]
    fn seatalk_section_defaults_path_and_secret() {
        let config: SeaTalkChannelConfig =
            serde_json::from_str(r#"{"appId":"a","appSecret":"s"}"#).unwrap();
        assert_eq!(config.webhook_path, "/webhooks/seatalk");
        assert!(config.signing_secret.is_empty());
    }

    #[test]
    fn announce_targets_deserialize_by_session_key() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"announceTargets":{"main":{"provider":"seatalk","to":"emp-1"}}}"#,
        )
        .unwrap();
        let target = config.announce_targets.get("main").unwrap();
        assert_eq!(target.provider, "seatalk");
        assert!(target.account_id.is_none());
    }
}
