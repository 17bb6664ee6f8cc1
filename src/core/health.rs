use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Parts of the daemon that report into `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Marketplace,
    Registry,
    Notifier,
}

impl Component {
    pub const ALL: [Component; 3] = [
        Component::Marketplace,
        Component::Registry,
        Component::Notifier,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: Overall,
    pub version: String,
    pub uptime_seconds: u64,
    pub tracked_collections: usize,
    pub components: BTreeMap<Component, bool>,
}

impl HealthStatus {
    pub fn is_up(&self, component: Component) -> bool {
        self.components.get(&component).copied().unwrap_or(false)
    }
}

/// Shared, cheaply cloned view of daemon health. Only the marketplace decides
/// the overall status; the other components are informational.
#[derive(Clone)]
pub struct HealthChecker {
    started: Instant,
    components: Arc<RwLock<BTreeMap<Component, bool>>>,
    tracked: Arc<AtomicUsize>,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    pub fn new() -> Self {
        let components = Component::ALL.iter().map(|c| (*c, false)).collect();
        Self {
            started: Instant::now(),
            components: Arc::new(RwLock::new(components)),
            tracked: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn report(&self, component: Component, healthy: bool) {
        let previous = self.components.write().await.insert(component, healthy);
        if previous != Some(healthy) {
            tracing::debug!("{:?} is now {}", component, if healthy { "up" } else { "down" });
        }
    }

    pub fn set_tracked(&self, count: usize) {
        self.tracked.store(count, Ordering::Relaxed);
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.components.read().await.clone();
        let status = match components.get(&Component::Marketplace) {
            Some(true) => Overall::Healthy,
            _ => Overall::Degraded,
        };

        HealthStatus {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started.elapsed().as_secs(),
            tracked_collections: self.tracked.load(Ordering::Relaxed),
            components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_follows_marketplace() {
        let checker = HealthChecker::new();
        let status = checker.get_status().await;
        assert_eq!(status.status, Overall::Degraded);
        assert!(Component::ALL.iter().all(|c| !status.is_up(*c)));

        checker.report(Component::Registry, true).await;
        assert_eq!(checker.get_status().await.status, Overall::Degraded);

        checker.report(Component::Marketplace, true).await;
        checker.set_tracked(3);

        let status = checker.get_status().await;
        assert_eq!(status.status, Overall::Healthy);
        assert_eq!(status.tracked_collections, 3);
        assert!(status.is_up(Component::Registry));
        assert!(!status.is_up(Component::Notifier));
    }

    #[tokio::test]
    async fn test_status_serializes_lowercase_names() {
        let checker = HealthChecker::new();
        checker.report(Component::Notifier, true).await;

        let json = serde_json::to_value(checker.get_status().await).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["components"]["notifier"], true);
        assert_eq!(json["components"]["marketplace"], false);
    }
}
