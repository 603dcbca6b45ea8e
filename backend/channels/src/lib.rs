//! `nestforge-channels` — chat-platform adapters for the NestForge runtime.

use async_trait::async_trait;

pub mod seatalk;
pub mod seatalk_events;

pub use seatalk::{SeaTalkClient, SeaTalkConfig};
pub use seatalk_events::{SeaTalkAdapter, SeaTalkWebhookConfig};

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Build an optional Axum sub-router for inbound webhook endpoints.
    /// Adapters without an HTTP surface return an empty router.
    fn build_router(&self) -> axum::Router {
        axum::Router::new()
    }

    /// Start the adapter's background work, if any.
    async fn start(&self) -> anyhow::Result<()>;
}
