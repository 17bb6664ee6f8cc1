use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::api::CollectionList;
use crate::core::Result;
use crate::market::{CollectionCache, OfferFeed};
use crate::notify::NotificationGate;
use crate::strategy::{assess_gap, round_price, DiscountPolicy, GapAssessment};
use crate::trading::TrackingScheduler;

/// What to do when a qualifying collection is already tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedConflict {
    /// Abandon the rest of the pass.
    AbortPass,
    SkipCollection,
}

/// What the no-gap retreat does when the collection is also tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedRetreat {
    /// Move the offer to the comfort price anyway.
    Retreat,
    /// Leave the price to the tracking scheduler.
    Leave,
}

const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct ScannerSettings {
    pub operator_id: i64,
    pub policy: DiscountPolicy,
    pub price_step: Decimal,
    pub interval: Duration,
    pub collection_delay: Duration,
    pub on_tracked: TrackedConflict,
    pub on_tracked_retreat: TrackedRetreat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCompetitors,
    UndefinedFloor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanAction {
    Notified { diff_percent: Decimal },
    /// Same alert text as the last one sent.
    Suppressed,
    Undercut { offer_id: String, price: Decimal },
    Retreated { offer_id: String, price: Decimal },
    Unchanged,
    Tracked,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub actions: Vec<(String, ScanAction)>,
    pub failures: usize,
    pub aborted: bool,
}

impl ScanReport {
    pub fn scanned(&self) -> usize {
        self.actions.len() + self.failures
    }

    pub fn action_for(&self, collection_id: &str) -> Option<&ScanAction> {
        self.actions
            .iter()
            .find(|(id, _)| id == collection_id)
            .map(|(_, action)| action)
    }
}

pub fn gap_alert(name: &str, gap: &GapAssessment) -> String {
    format!(
        "Collection {}: best offer {} is {}% below floor {}",
        name, gap.max_offer_price, gap.diff_percent, gap.floor
    )
}

/// Periodic pass over every known collection looking for large floor/offer gaps.
pub struct DiscountScanner {
    feed: Arc<OfferFeed>,
    cache: Arc<CollectionCache>,
    tracker: Arc<TrackingScheduler>,
    gate: Arc<NotificationGate>,
    settings: ScannerSettings,
}

impl DiscountScanner {
    pub fn new(
        feed: Arc<OfferFeed>,
        cache: Arc<CollectionCache>,
        tracker: Arc<TrackingScheduler>,
        gate: Arc<NotificationGate>,
        mut settings: ScannerSettings,
    ) -> Self {
        if settings.interval.is_zero() {
            tracing::warn!(
                "Zero scan interval, falling back to {:?}",
                DEFAULT_SCAN_INTERVAL
            );
            settings.interval = DEFAULT_SCAN_INTERVAL;
        }

        Self {
            feed,
            cache,
            tracker,
            gate,
            settings,
        }
    }

    pub async fn scan_once(&self) -> Result<ScanReport> {
        let collections = self.cache.get_collections().await?;
        let mut report = ScanReport::default();

        tracing::info!(
            "🔍 Discount scan over {} collections",
            collections.collections.len()
        );

        for collection_id in collections.ids() {
            let result = self.scan_collection(&collection_id, &collections).await;

            tokio::time::sleep(self.settings.collection_delay).await;

            match result {
                Ok(ScanAction::Tracked) => {
                    report.actions.push((collection_id.clone(), ScanAction::Tracked));

                    if self.settings.on_tracked == TrackedConflict::AbortPass {
                        tracing::warn!(
                            "Collection {} already tracked, abandoning the rest of this scan",
                            collection_id
                        );
                        report.aborted = true;
                        break;
                    }
                }
                Ok(action) => report.actions.push((collection_id, action)),
                Err(e) => {
                    tracing::warn!("Discount scan failed for {}: {}", collection_id, e);
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }

    async fn scan_collection(
        &self,
        collection_id: &str,
        collections: &CollectionList,
    ) -> Result<ScanAction> {
        let operator_id = self.settings.operator_id;
        let snapshot = self.feed.fetch_offers(collection_id).await?;

        let (Some(max_offer), Some(floor)) = (
            snapshot.max_competitor_amount(operator_id),
            snapshot.floor_price(),
        ) else {
            tracing::debug!("No competing offers in {}", collection_id);
            return Ok(ScanAction::Skipped(SkipReason::NoCompetitors));
        };

        let Some(gap) = assess_gap(floor, max_offer, &self.settings.policy, self.settings.price_step)
        else {
            tracing::debug!("Floor {} in {} leaves the gap undefined", floor, collection_id);
            return Ok(ScanAction::Skipped(SkipReason::UndefinedFloor));
        };

        let own = snapshot.own_offer(operator_id);

        if gap.qualifies {
            if self.tracker.is_tracked(collection_id).await {
                return Ok(ScanAction::Tracked);
            }

            let name = collections.name_of(collection_id).unwrap_or(collection_id);
            tracing::info!(
                "💰 Gap of {}% in {} (floor {}, best offer {})",
                gap.diff_percent,
                name,
                gap.floor,
                gap.max_offer_price
            );

            if let Some(own) = own {
                let price = gap.undercut_price(self.settings.price_step);
                self.feed.submit_price(&own.id, price).await?;

                return Ok(ScanAction::Undercut {
                    offer_id: own.id.clone(),
                    price,
                });
            }

            if self.gate.notify_if_new(&gap_alert(name, &gap)).await {
                Ok(ScanAction::Notified {
                    diff_percent: gap.diff_percent,
                })
            } else {
                Ok(ScanAction::Suppressed)
            }
        } else {
            tracing::debug!(
                "No gap in {}: {}% (need {}%), floor {}",
                collection_id,
                gap.diff_percent,
                self.settings.policy.need_diff_percent,
                gap.floor
            );

            let Some(own) = own else {
                return Ok(ScanAction::Unchanged);
            };

            if round_price(own.amount) == gap.comfort_price {
                return Ok(ScanAction::Unchanged);
            }

            if self.tracker.is_tracked(collection_id).await {
                match self.settings.on_tracked_retreat {
                    TrackedRetreat::Leave => {
                        tracing::debug!("Leaving tracked offer {} in {}", own.id, collection_id);
                        return Ok(ScanAction::Unchanged);
                    }
                    TrackedRetreat::Retreat => tracing::warn!(
                        "Offer {} in {} is tracked, the next tracking cycle will reprice it",
                        own.id,
                        collection_id
                    ),
                }
            }

            tracing::info!(
                "↩️  Moving offer {} in {} to comfort price {}",
                own.id,
                collection_id,
                gap.comfort_price
            );
            self.feed.submit_price(&own.id, gap.comfort_price).await?;

            Ok(ScanAction::Retreated {
                offer_id: own.id.clone(),
                price: gap.comfort_price,
            })
        }
    }

    /// Scans immediately, then once per interval.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.settings.interval);

            loop {
                interval.tick().await;

                match self.scan_once().await {
                    Ok(report) => tracing::info!(
                        "✅ Discount scan done: {} scanned, {} failed{}",
                        report.scanned(),
                        report.failures,
                        if report.aborted { ", aborted" } else { "" }
                    ),
                    Err(e) => tracing::error!("❌ Discount scan failed: {}", e),
                }
            }
        })
    }
}
