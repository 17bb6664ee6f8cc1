use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::Offer;
use crate::core::{Component, HealthChecker, Result};
use crate::market::{CollectionCache, OfferFeed, OfferSnapshot};
use crate::notify::Notifier;
use crate::storage::{CollectionRegistry, OfferArchive};
use crate::strategy::{decide, Decision, PricingError, PricingPolicy};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub operator_id: i64,
    pub interval: Duration,
    pub startup_delay: Duration,
    pub refresh_interval: Duration,
    pub pricing: PricingPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Own offer already sits at the target price.
    Held { price: Decimal },
    Repriced {
        offer_id: String,
        from: Decimal,
        to: Decimal,
    },
    /// Own offer present but nobody to outbid.
    Unpriceable,
    /// No own offer in the collection.
    Released,
}

impl ReconcileOutcome {
    pub fn holds_offer(&self) -> bool {
        !matches!(self, ReconcileOutcome::Released)
    }
}

/// Side effects of losing an own offer, executed best-effort by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ArchiveOffer(Offer),
    Notify(String),
}

pub fn teardown_effects(collection_id: &str, last_offer: Option<Offer>) -> Vec<Effect> {
    match last_offer {
        Some(offer) => vec![
            Effect::ArchiveOffer(offer),
            Effect::Notify(format!(
                "Offer in collection {} is gone, last offer saved",
                collection_id
            )),
        ],
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Called from the collection's own timer task; the loop exits by itself.
    Timer,
    External,
}

#[derive(Default)]
struct TrackerState {
    timers: HashMap<String, JoinHandle<()>>,
    last_offers: HashMap<String, Offer>,
}

/// Owns one recurring reconcile timer per collection where the operator holds an offer.
pub struct TrackingScheduler {
    feed: Arc<OfferFeed>,
    archive: OfferArchive,
    notifier: Arc<dyn Notifier>,
    health: HealthChecker,
    settings: TrackerSettings,
    state: Mutex<TrackerState>,
    timers_created: AtomicUsize,
}

impl TrackingScheduler {
    pub fn new(
        feed: Arc<OfferFeed>,
        archive: OfferArchive,
        notifier: Arc<dyn Notifier>,
        health: HealthChecker,
        mut settings: TrackerSettings,
    ) -> Self {
        // tokio intervals panic on a zero period
        if settings.interval.is_zero() {
            tracing::warn!(
                "Zero tracking interval, falling back to {:?}",
                DEFAULT_INTERVAL
            );
            settings.interval = DEFAULT_INTERVAL;
        }

        Self {
            feed,
            archive,
            notifier,
            health,
            settings,
            state: Mutex::new(TrackerState::default()),
            timers_created: AtomicUsize::new(0),
        }
    }

    /// Fetches, decides, and applies one pricing cycle for a collection.
    pub async fn reconcile(&self, collection_id: &str) -> Result<ReconcileOutcome> {
        self.reconcile_from(collection_id, Origin::External).await
    }

    async fn reconcile_from(&self, collection_id: &str, origin: Origin) -> Result<ReconcileOutcome> {
        let snapshot = match self.feed.fetch_offers(collection_id).await {
            Ok(snapshot) => {
                self.health.report(Component::Marketplace, true).await;
                snapshot
            }
            Err(e) => {
                self.health.report(Component::Marketplace, false).await;
                return Err(e);
            }
        };

        let operator_id = self.settings.operator_id;

        match decide(&snapshot, operator_id, &self.settings.pricing) {
            Ok(Decision::Stop) => {
                tracing::info!("No own offer in collection {}", collection_id);
                self.teardown(collection_id, origin).await;
                Ok(ReconcileOutcome::Released)
            }
            Ok(Decision::NoAction { quote }) => {
                self.remember(&snapshot).await;
                tracing::debug!(
                    "Prices current for collection {} @ {}",
                    collection_id,
                    quote.target
                );
                Ok(ReconcileOutcome::Held {
                    price: quote.target,
                })
            }
            Ok(Decision::Update {
                offer_id,
                current,
                quote,
            }) => {
                self.remember(&snapshot).await;
                tracing::info!(
                    "💹 Repricing collection {}: {} -> {} (floor {}, ceiling {}, best competitor {})",
                    collection_id,
                    current,
                    quote.target,
                    quote.floor,
                    quote.ceiling,
                    quote.competitor_max
                );

                self.feed.submit_price(&offer_id, quote.target).await?;

                Ok(ReconcileOutcome::Repriced {
                    offer_id,
                    from: current,
                    to: quote.target,
                })
            }
            Err(PricingError::NoCompetitors(_)) => {
                self.remember(&snapshot).await;
                tracing::warn!(
                    "Collection {} has no competing offers, leaving price unchanged",
                    collection_id
                );
                Ok(ReconcileOutcome::Unpriceable)
            }
        }
    }

    async fn remember(&self, snapshot: &OfferSnapshot) {
        if let Some(own) = snapshot.own_offer(self.settings.operator_id) {
            self.state
                .lock()
                .await
                .last_offers
                .insert(snapshot.collection_id.clone(), own.clone());
        }
    }

    async fn teardown(&self, collection_id: &str, origin: Origin) {
        let (handle, last_offer, remaining) = {
            let mut state = self.state.lock().await;
            let handle = state.timers.remove(collection_id);
            let last_offer = state.last_offers.remove(collection_id);
            (handle, last_offer, state.timers.len())
        };

        if let Some(handle) = handle {
            if origin == Origin::External {
                handle.abort();
            }
            self.health.set_tracked(remaining);
            tracing::info!("⏹️  Stopped tracking collection {}", collection_id);
        }

        for effect in teardown_effects(collection_id, last_offer) {
            self.apply(effect).await;
        }
    }

    async fn apply(&self, effect: Effect) {
        match effect {
            Effect::ArchiveOffer(offer) => {
                if let Err(e) = self.archive.save(&offer).await {
                    tracing::error!("❌ Failed to archive offer {}: {}", offer.id, e);
                }
            }
            Effect::Notify(text) => {
                if let Err(e) = self.notifier.send(&text).await {
                    tracing::warn!("Failed to send notification: {}", e);
                }
            }
        }
    }

    /// Starts a recurring reconcile for the collection. Returns `false` if one already exists.
    pub async fn ensure_tracked(self: &Arc<Self>, collection_id: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.timers.contains_key(collection_id) {
            return false;
        }

        let handle = tokio::spawn(Self::run_timer(
            Arc::downgrade(self),
            collection_id.to_string(),
            self.settings.interval,
        ));
        state.timers.insert(collection_id.to_string(), handle);
        self.timers_created.fetch_add(1, Ordering::Relaxed);
        self.health.set_tracked(state.timers.len());

        tracing::info!(
            "⏱️  Tracking collection {} every {:?}",
            collection_id,
            self.settings.interval
        );

        true
    }

    async fn run_timer(scheduler: Weak<Self>, collection_id: String, period: Duration) {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let Some(scheduler) = scheduler.upgrade() else {
                break;
            };

            match scheduler.reconcile_from(&collection_id, Origin::Timer).await {
                Ok(ReconcileOutcome::Released) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Reconcile failed for collection {}: {}", collection_id, e);
                }
            }
        }
    }

    /// Cancels one collection's timer without archiving or notifying.
    pub async fn stop(&self, collection_id: &str) -> bool {
        let mut state = self.state.lock().await;
        state.last_offers.remove(collection_id);

        match state.timers.remove(collection_id) {
            Some(handle) => {
                handle.abort();
                self.health.set_tracked(state.timers.len());
                true
            }
            None => false,
        }
    }

    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        let count = state.timers.len();

        for (_, handle) in state.timers.drain() {
            handle.abort();
        }
        state.last_offers.clear();
        self.health.set_tracked(0);

        tracing::info!("🛑 Stopped {} tracking timers", count);
    }

    pub async fn is_tracked(&self, collection_id: &str) -> bool {
        self.state.lock().await.timers.contains_key(collection_id)
    }

    pub async fn tracked_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().await.timers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn timers_created(&self) -> usize {
        self.timers_created.load(Ordering::Relaxed)
    }

    /// Registry ids first; every known collection when the registry is empty or unreadable.
    pub async fn working_set(
        registry: &dyn CollectionRegistry,
        cache: &CollectionCache,
    ) -> Result<Vec<String>> {
        match registry.list_collection_ids().await {
            Ok(ids) if !ids.is_empty() => return Ok(ids),
            Ok(_) => tracing::info!("Collection registry is empty, using full collection list"),
            Err(e) => tracing::warn!("Failed to read collection registry: {}", e),
        }

        Ok(cache.get_collections().await?.ids())
    }

    /// One startup pass: reconcile each collection, then track those holding an own offer.
    pub async fn bootstrap(
        self: &Arc<Self>,
        registry: &dyn CollectionRegistry,
        cache: &CollectionCache,
    ) -> Result<usize> {
        let ids = Self::working_set(registry, cache).await?;
        tracing::info!("🔄 Reconciling {} collections", ids.len());

        let mut started = 0;
        for collection_id in &ids {
            match self.reconcile(collection_id).await {
                Ok(outcome) if outcome.holds_offer() => {
                    if self.ensure_tracked(collection_id).await {
                        started += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    // Unknown state; let the timer retry the cycle.
                    tracing::warn!("Initial reconcile failed for {}: {}", collection_id, e);
                    if self.ensure_tracked(collection_id).await {
                        started += 1;
                    }
                }
            }

            tokio::time::sleep(self.settings.startup_delay).await;
        }

        tracing::info!(
            "✅ Bootstrap complete: {} new, {} tracked in total",
            started,
            self.tracked_ids().await.len()
        );

        Ok(started)
    }

    /// Runs `bootstrap` now and then on every refresh interval.
    pub fn start(
        self: Arc<Self>,
        registry: Arc<dyn CollectionRegistry>,
        cache: Arc<CollectionCache>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let refresh = self.settings.refresh_interval;

            loop {
                if let Err(e) = self.bootstrap(registry.as_ref(), cache.as_ref()).await {
                    tracing::error!("❌ Tracking bootstrap failed: {}", e);
                }

                if refresh.is_zero() {
                    break;
                }
                tokio::time::sleep(refresh).await;
            }
        })
    }
}
