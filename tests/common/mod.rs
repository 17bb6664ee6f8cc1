#![allow(dead_code)]

use async_trait::async_trait;
use offer_sync_bot::api::{Collection, CollectionList, MarketplaceTransport, Offer};
use offer_sync_bot::core::{BotError, Result};
use offer_sync_bot::notify::Notifier;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const OPERATOR: i64 = 7;

pub fn offer(id: &str, sender_id: i64, amount: Decimal, floor: Decimal) -> Offer {
    Offer {
        id: id.to_string(),
        sender_id,
        amount,
        collection: Collection {
            id: String::new(),
            name: String::new(),
            floor_price: floor,
        },
        extra: serde_json::Map::new(),
    }
}

/// In-memory marketplace. Price updates are applied to the stored offers.
#[derive(Default)]
pub struct FakeMarket {
    offers: Mutex<HashMap<String, Vec<Offer>>>,
    collections: Mutex<CollectionList>,
    collection_failures: AtomicUsize,
    pub collection_fetches: AtomicUsize,
    pub offer_fetches: AtomicUsize,
    pub updates: Mutex<Vec<(String, Decimal)>>,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offers(&self, collection_id: &str, offers: Vec<Offer>) {
        self.offers
            .lock()
            .unwrap()
            .insert(collection_id.to_string(), offers);
    }

    pub fn remove_offer(&self, collection_id: &str, offer_id: &str) {
        if let Some(offers) = self.offers.lock().unwrap().get_mut(collection_id) {
            offers.retain(|o| o.id != offer_id);
        }
    }

    pub fn set_collections(&self, ids: &[&str]) {
        *self.collections.lock().unwrap() = CollectionList {
            collections: ids
                .iter()
                .map(|id| Collection {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    floor_price: Decimal::ZERO,
                })
                .collect(),
        };
    }

    /// The next `count` collection fetches fail.
    pub fn fail_collection_fetches(&self, count: usize) {
        self.collection_failures.store(count, Ordering::SeqCst);
    }

    pub fn updates(&self) -> Vec<(String, Decimal)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketplaceTransport for FakeMarket {
    async fn list_offers(&self, _token: &str, collection_id: &str) -> Result<Vec<Offer>> {
        self.offer_fetches.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .offers
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_offer_price(
        &self,
        _token: &str,
        offer_id: &str,
        price: Decimal,
    ) -> Result<Option<serde_json::Value>> {
        self.updates
            .lock()
            .unwrap()
            .push((offer_id.to_string(), price));

        for offers in self.offers.lock().unwrap().values_mut() {
            for offer in offers.iter_mut().filter(|o| o.id == offer_id) {
                offer.amount = price;
            }
        }

        Ok(None)
    }

    async fn list_collections(&self, _token: &str, _limit: u32) -> Result<CollectionList> {
        self.collection_fetches.fetch_add(1, Ordering::SeqCst);

        let remaining = self.collection_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.collection_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BotError::Transport("503 Service Unavailable".to_string()));
        }

        Ok(self.collections.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub struct FixedRegistry(pub Vec<String>);

#[async_trait]
impl offer_sync_bot::storage::CollectionRegistry for FixedRegistry {
    async fn list_collection_ids(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}
