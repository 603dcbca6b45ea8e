/// SeaTalk event callbacks — URL verification, signature checking, and
/// single-chat messages routed to an isolated agent turn.
///
/// The handler ACKs fast: verification and signature checks run inline, but
/// the agent turn for an inbound message happens on a detached task that
/// posts its reply back through the SeaTalk client. Failures there are
/// swallowed; worst case the subscriber gets an error notice or nothing.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, warn};

use nestforge_core::Lane;
use nestforge_gateway::Gateway;
use nestforge_tools::{run_agent_step, AgentStepParams};

use crate::seatalk::SeaTalkClient;
use crate::ChannelAdapter;

/// Keys a verification challenge may hide under.
const CHALLENGE_KEYS: [&str; 4] = [
    "seatalk_challenge",
    "seatalkChallenge",
    "challenge",
    "echostr",
];

const MAX_BODY_BYTES: usize = 256 * 1024;
const MAX_CHALLENGE_DEPTH: usize = 5;

/// Budget for the agent turn an inbound message triggers.
const WEBHOOK_TURN_TIMEOUT_MS: u64 = 60_000;

/// How much of an error message gets relayed to the subscriber.
const ERROR_NOTICE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct SeaTalkWebhookConfig {
    pub webhook_path: String,
}

impl Default for SeaTalkWebhookConfig {
    fn default() -> Self {
        Self {
            webhook_path: "/webhooks/seatalk".to_string(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    client: Arc<SeaTalkClient>,
    gateway: Arc<dyn Gateway>,
}

/// SeaTalk channel adapter: mounts the webhook endpoint and replies through
/// the Open Platform client.
pub struct SeaTalkAdapter {
    config: SeaTalkWebhookConfig,
    client: Arc<SeaTalkClient>,
    gateway: Arc<dyn Gateway>,
}

impl SeaTalkAdapter {
    pub fn new(
        config: SeaTalkWebhookConfig,
        client: Arc<SeaTalkClient>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        Self {
            config,
            client,
            gateway,
        }
    }
}

#[async_trait]
impl ChannelAdapter for SeaTalkAdapter {
    fn name(&self) -> &str {
        "seatalk"
    }

    fn build_router(&self) -> Router {
        let state = AppState {
            client: Arc::clone(&self.client),
            gateway: Arc::clone(&self.gateway),
        };
        Router::new()
            .route(
                &self.config.webhook_path,
                get(handle_verification_get).post(handle_event),
            )
            .with_state(state)
    }

    async fn start(&self) -> Result<()> {
        info!(target: "seatalk", path = %self.config.webhook_path, "SeaTalk adapter ready");
        Ok(())
    }
}

/// GET verification: echo the challenge as plain text.
async fn handle_verification_get(Query(query): Query<HashMap<String, String>>) -> Response {
    let challenge = CHALLENGE_KEYS
        .iter()
        .chain(["msg_signature"].iter())
        .find_map(|key| query.get(*key))
        .filter(|value| !value.is_empty());
    match challenge {
        Some(value) => {
            info!(target: "seatalk", length = value.len(), "url verification via GET");
            (StatusCode::OK, value.clone()).into_response()
        }
        None => (
            StatusCode::OK,
            Json(json!({
                "message": "SeaTalk webhook endpoint; use POST for event callback."
            })),
        )
            .into_response(),
    }
}

async fn handle_event(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if body.len() > MAX_BODY_BYTES {
        warn!(target: "seatalk", size = body.len(), "webhook body too large");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": 400, "message": "Body too large" })),
        )
            .into_response();
    }

    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let parsed: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let event_type = parsed
        .get("event_type")
        .and_then(Value::as_str)
        .unwrap_or("");

    // URL verification is answered before any signature check.
    let challenge = parse_challenge(&body, content_type)
        .or_else(|| query.get("seatalk_challenge").cloned())
        .or_else(|| query.get("challenge").cloned())
        .filter(|value| !value.is_empty());
    if let Some(value) = challenge {
        info!(
            target: "seatalk",
            length = value.len(),
            event_type,
            "url verification, echoing challenge"
        );
        return (StatusCode::OK, Json(json!({ "seatalk_challenge": value }))).into_response();
    }
    if event_type == "event_verification" {
        warn!(
            target: "seatalk",
            body_len = body.len(),
            "event_verification without a challenge"
        );
    }

    let signature = headers
        .get("signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if !state.client.verify_signature(&body, signature) {
        warn!(target: "seatalk", "webhook signature verification failed");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "code": 403, "message": "Invalid signature" })),
        )
            .into_response();
    }

    info!(target: "seatalk", event_type, "webhook event received");

    if event_type == "message_from_bot_subscriber" {
        if let Some((employee_code, text)) = extract_subscriber_text(&parsed) {
            tokio::spawn(handle_text_message(state.clone(), employee_code, text));
        }
    }

    (StatusCode::OK, Json(json!({ "code": 0 }))).into_response()
}

/// Pull `(employee_code, text)` out of a subscriber-message event.
fn extract_subscriber_text(body: &Value) -> Option<(String, String)> {
    let event = body.get("event")?;
    let employee_code = event.get("employee_code")?.as_str()?.trim();
    let message = event.get("message")?;
    if message.get("tag")?.as_str()? != "text" {
        return None;
    }
    let text = message.get("text")?.get("content")?.as_str()?.trim();
    if employee_code.is_empty() || text.is_empty() {
        return None;
    }
    Some((employee_code.to_string(), text.to_string()))
}

/// Run one isolated agent turn for an inbound message and post the reply
/// back. Detached from the HTTP handler; never raises.
async fn handle_text_message(state: AppState, employee_code: String, message: String) {
    let session_key = format!("seatalk:{employee_code}");
    let step = run_agent_step(
        state.gateway.as_ref(),
        &AgentStepParams {
            session_key: &session_key,
            message: &message,
            extra_system_prompt: None,
            timeout_ms: WEBHOOK_TURN_TIMEOUT_MS,
            lane: Lane::Cron,
        },
    )
    .await;

    let reply = match step {
        Ok(Some(reply)) if !reply.trim().is_empty() => reply.trim().to_string(),
        Ok(_) => "Task completed.".to_string(),
        Err(err) => {
            warn!(target: "seatalk", error = %err, "agent turn failed for webhook message");
            let notice: String = err.message().chars().take(ERROR_NOTICE_MAX_CHARS).collect();
            format!("Processing failed: {notice}")
        }
    };

    if let Err(err) = state.client.send_single_chat(&employee_code, &reply).await {
        warn!(target: "seatalk", error = %err, "failed to deliver webhook reply");
    }
}

/// Find a verification challenge in a raw POST body: flat JSON keys first,
/// then a bounded-depth nested search, then form-encoded fields.
fn parse_challenge(raw_body: &[u8], content_type: &str) -> Option<String> {
    let text = std::str::from_utf8(raw_body).ok()?;
    let ct = content_type.to_ascii_lowercase();

    if ct.contains("application/json") || text.trim_start().starts_with('{') {
        let body: Value = serde_json::from_str(text).ok()?;
        if let Some(flat) = CHALLENGE_KEYS
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .filter(|value| !value.is_empty())
        {
            return Some(flat.to_string());
        }
        return find_challenge_in_object(&body, 0);
    }

    if ct.contains("application/x-www-form-urlencoded") || text.contains("seatalk_challenge=") {
        return parse_form_challenge(text);
    }

    if let Ok(body) = serde_json::from_str::<Value>(text) {
        if let Some(found) = find_challenge_in_object(&body, 0) {
            return Some(found);
        }
    }
    parse_form_challenge(text)
}

fn parse_form_challenge(text: &str) -> Option<String> {
    url::form_urlencoded::parse(text.as_bytes())
        .find(|(key, value)| CHALLENGE_KEYS.contains(&key.as_ref()) && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Recursively search nested objects for a challenge value.
fn find_challenge_in_object(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_CHALLENGE_DEPTH {
        return None;
    }
    let object = value.as_object()?;
    for key in CHALLENGE_KEYS {
        if let Some(found) = object.get(key).and_then(Value::as_str) {
            if !found.is_empty() {
                return Some(found.to_string());
            }
        }
    }
    for nested in object.values() {
        if nested.is_object() {
            if let Some(found) = find_challenge_in_object(nested, depth + 1) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_flat_json_challenge() {
        let body = br#"{"seatalk_challenge":"abc123"}"#;
        assert_eq!(
            parse_challenge(body, "application/json").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn finds_nested_challenge_within_depth() {
        let body = br#"{"event":{"inner":{"challenge":"deep"}}}"#;
        assert_eq!(
            parse_challenge(body, "application/json").as_deref(),
            Some("deep")
        );
    }

    #[test]
    fn nested_search_is_depth_bounded() {
        let mut body = String::from(r#"{"challenge":"found"}"#);
        for _ in 0..8 {
            body = format!(r#"{{"wrap":{body}}}"#);
        }
        assert_eq!(parse_challenge(body.as_bytes(), "application/json"), None);
    }

    #[test]
    fn finds_form_encoded_challenge() {
        let body = b"foo=bar&seatalk_challenge=form-value";
        assert_eq!(
            parse_challenge(body, "application/x-www-form-urlencoded").as_deref(),
            Some("form-value")
        );
    }

    #[test]
    fn sniffs_json_without_content_type() {
        let body = br#"{"echostr":"sniffed"}"#;
        assert_eq!(parse_challenge(body, "").as_deref(), Some("sniffed"));
    }

    #[test]
    fn extracts_subscriber_text_messages_only() {
        let body: Value = serde_json::from_str(
            r#"{
                "event_type": "message_from_bot_subscriber",
                "event": {
                    "employee_code": "emp-1",
                    "message": { "tag": "text", "text": { "content": " hello " } }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            extract_subscriber_text(&body),
            Some(("emp-1".to_string(), "hello".to_string()))
        );

        let image: Value = serde_json::from_str(
            r#"{"event":{"employee_code":"emp-1","message":{"tag":"image"}}}"#,
        )
        .unwrap();
        assert_eq!(extract_subscriber_text(&image), None);

        let blank: Value = serde_json::from_str(
            r#"{"event":{"employee_code":"","message":{"tag":"text","text":{"content":"hi"}}}}"#,
        )
        .unwrap();
        assert_eq!(extract_subscriber_text(&blank), None);
    }
}
