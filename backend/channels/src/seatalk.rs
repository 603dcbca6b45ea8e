/// SeaTalk Open Platform API client.
///
/// Token acquisition with an explicit in-process cache (init on first use,
/// invalidated when the API reports the token expired), single-chat sends
/// with byte-aware chunking, and callback signature verification.
///
/// Signature scheme: `sha256(raw_body + signing_secret)`, hex-encoded.
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

const OPENAPI_HOST: &str = "https://openapi.seatalk.io";
const API_ACCESS_TOKEN: &str = "/auth/app_access_token";
const API_SINGLE_CHAT: &str = "/messaging/v2/single_chat";

const CODE_OK: i64 = 0;
const CODE_TOKEN_EXPIRED: i64 = 100;

/// Messages above this size are split into `[i/n]`-prefixed parts.
const MAX_SINGLE_CHAT_BYTES: usize = 4000;

/// Refresh slightly before the advertised expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(10);

const DEFAULT_TOKEN_TTL_SECS: u64 = 7200;

#[derive(Debug, Clone)]
pub struct SeaTalkConfig {
    pub app_id: String,
    pub app_secret: String,
    /// Empty means callbacks are accepted unverified.
    pub signing_secret: String,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// HTTP client for the SeaTalk Open Platform.
pub struct SeaTalkClient {
    config: SeaTalkConfig,
    http: Client,
    token: RwLock<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    app_access_token: Option<String>,
    #[serde(default)]
    expire: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    code: Option<i64>,
}

impl SeaTalkClient {
    pub fn new(config: SeaTalkConfig) -> Self {
        Self {
            config,
            http: Client::new(),
            token: RwLock::new(None),
        }
    }

    /// Verify a callback signature. An unset signing secret accepts
    /// everything.
    pub fn verify_signature(&self, raw_body: &[u8], signature: &str) -> bool {
        if self.config.signing_secret.is_empty() {
            return true;
        }
        let mut hasher = Sha256::new();
        hasher.update(raw_body);
        hasher.update(self.config.signing_secret.as_bytes());
        let calculated = hex::encode(hasher.finalize());
        calculated == signature
    }

    /// Cached app access token, fetched on first use.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }
        self.refresh_access_token().await
    }

    async fn refresh_access_token(&self) -> Result<String> {
        if self.config.app_id.is_empty() || self.config.app_secret.is_empty() {
            bail!("SeaTalk app id and app secret are required");
        }
        let response = self
            .http
            .post(format!("{OPENAPI_HOST}{API_ACCESS_TOKEN}"))
            .json(&serde_json::json!({
                "app_id": self.config.app_id,
                "app_secret": self.config.app_secret,
            }))
            .send()
            .await?
            .error_for_status()?;
        let body: TokenResponse = response.json().await?;
        if body.code != Some(CODE_OK) {
            bail!("SeaTalk token error: code {:?}", body.code);
        }
        let token = body
            .app_access_token
            .ok_or_else(|| anyhow!("SeaTalk token response missing app_access_token"))?;
        let ttl = Duration::from_secs(body.expire.unwrap_or(DEFAULT_TOKEN_TTL_SECS));
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.token.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    /// Send a single-chat text message, splitting oversized content into
    /// `[i/n]`-prefixed parts.
    pub async fn send_single_chat(&self, employee_code: &str, content: &str) -> Result<()> {
        if content.len() <= MAX_SINGLE_CHAT_BYTES {
            return self.send_single_chat_one(employee_code, content).await;
        }
        let chunks = split_text_by_bytes(content, MAX_SINGLE_CHAT_BYTES);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            let part = if total > 1 {
                format!("[{}/{}]\n{}", i + 1, total, chunk)
            } else {
                chunk.clone()
            };
            self.send_single_chat_one(employee_code, &part).await?;
        }
        Ok(())
    }

    async fn send_single_chat_one(&self, employee_code: &str, content: &str) -> Result<()> {
        // One retry when the cached token turns out to be expired.
        for attempt in 0..2 {
            let token = self.access_token().await?;
            let response = self
                .http
                .post(format!("{OPENAPI_HOST}{API_SINGLE_CHAT}"))
                .bearer_auth(&token)
                .json(&serde_json::json!({
                    "employee_code": employee_code,
                    "message": { "tag": "text", "text": { "content": content } },
                }))
                .send()
                .await?
                .error_for_status()?;
            let body: ApiResponse = response.json().await?;
            match body.code {
                Some(CODE_OK) => return Ok(()),
                Some(CODE_TOKEN_EXPIRED) if attempt == 0 => {
                    debug!(target: "seatalk", "access token expired, refreshing");
                    self.invalidate_token().await;
                }
                code => bail!("SeaTalk API error: code {code:?}"),
            }
        }
        bail!("SeaTalk send failed after token refresh")
    }
}

/// Split text into chunks of at most `max_bytes` UTF-8 bytes, preferring
/// line boundaries. A single line longer than the limit stays one chunk;
/// degenerate input falls back to a truncated prefix.
fn split_text_by_bytes(text: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for line in text.split('\n') {
        let candidate_len = if current.is_empty() {
            line.len()
        } else {
            current.len() + 1 + line.len()
        };
        if candidate_len > max_bytes && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current.push_str(line);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(text.chars().take(1000).collect());
    }
    chunks
}
