//! Announce-target resolution — where a requester's spawn results get posted.

use std::collections::HashMap;

use async_trait::async_trait;

use nestforge_core::AnnounceTarget;

/// Maps a requester session to the chat destination its announce messages
/// should be delivered to. `None` means no channel is bound and the announce
/// flow skips delivery silently.
#[async_trait]
pub trait AnnounceTargetResolver: Send + Sync {
    async fn resolve(&self, session_key: &str, display_key: &str) -> Option<AnnounceTarget>;
}

/// Resolver backed by a fixed binding table (config-driven deployments,
/// tests). Keys may be internal or display session keys.
#[derive(Debug, Default)]
pub struct StaticAnnounceTargets {
    bindings: HashMap<String, AnnounceTarget>,
}

impl StaticAnnounceTargets {
    pub fn new(bindings: HashMap<String, AnnounceTarget>) -> Self {
        Self { bindings }
    }
}

#[async_trait]
impl AnnounceTargetResolver for StaticAnnounceTargets {
    async fn resolve(&self, session_key: &str, display_key: &str) -> Option<AnnounceTarget> {
        self.bindings
            .get(session_key)
            .or_else(|| self.bindings.get(display_key))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(to: &str) -> AnnounceTarget {
        AnnounceTarget {
            provider: "seatalk".into(),
            to: to.into(),
            account_id: None,
        }
    }

    #[tokio::test]
    async fn resolves_by_internal_then_display_key() {
        let mut bindings = HashMap::new();
        bindings.insert("agent:ops:main".to_string(), target("emp-1"));
        bindings.insert("main".to_string(), target("emp-2"));
        let resolver = StaticAnnounceTargets::new(bindings);

        let hit = resolver.resolve("agent:ops:main", "main").await.unwrap();
        assert_eq!(hit.to, "emp-1");

        let fallback = resolver.resolve("agent:other:main", "main").await.unwrap();
        assert_eq!(fallback.to, "emp-2");

        assert!(resolver.resolve("agent:x:main", "x").await.is_none());
    }
}
